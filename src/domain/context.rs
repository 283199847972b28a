use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::{RepositoryError, RepositoryResult};

/// Cancellation scope handed to every store operation.
///
/// A context is cancelled either explicitly through its token (or a parent's) or
/// implicitly once its deadline passes. Store calls made under a cancelled context
/// are aborted and report [`RepositoryError::Cancelled`].
#[derive(Debug, Clone)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled on its own.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a context that is cancelled together with `self`, optionally with a
    /// tighter deadline.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let deadline = match (self.deadline, timeout) {
            (Some(parent), Some(t)) => Some(parent.min(Instant::now() + t)),
            (None, Some(t)) => Some(Instant::now() + t),
            (parent, None) => parent,
        };

        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drive `operation` to completion unless the context is cancelled first, in
    /// which case the operation future is dropped mid-flight.
    pub async fn run<T, F>(&self, operation: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(RepositoryError::Cancelled("context cancelled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(RepositoryError::Cancelled("deadline exceeded"));
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(RepositoryError::Cancelled("context cancelled")),
            _ = deadline => Err(RepositoryError::Cancelled("deadline exceeded")),
            result = operation => result,
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes_under_live_context() {
        let ctx = OpContext::background();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let ctx = OpContext::background();
        ctx.cancel();

        let result: RepositoryResult<()> = ctx.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(RepositoryError::Cancelled(_))));
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_child() {
        let parent = OpContext::background();
        let child = parent.child(None);
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_slow_operation() {
        let ctx = OpContext::with_timeout(Duration::from_millis(50));

        let result: RepositoryResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(RepositoryError::Cancelled("deadline exceeded"))
        ));
    }
}
