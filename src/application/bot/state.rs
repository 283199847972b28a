use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Telegram user id of the person talking to the bot.
pub type ChatKey = i64;

const REAP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    None,
    AwaitingName,
    AwaitingBirthdate,
}

/// Answers collected so far in a registration dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct DialogueEntry {
    state: DialogueState,
    draft: RegistrationDraft,
    touched: Instant,
}

impl DialogueEntry {
    fn fresh() -> Self {
        Self {
            state: DialogueState::None,
            draft: RegistrationDraft::default(),
            touched: Instant::now(),
        }
    }

    fn is_reclaimable(&self, ttl: Duration) -> bool {
        self.state == DialogueState::None || self.touched.elapsed() >= ttl
    }
}

/// Exclusive hold on one user's dialogue. Everything read through the lock stays
/// current until it is dropped, so a read-decide-write cannot lose an update.
pub struct DialogueLock {
    key: ChatKey,
    entry: OwnedMutexGuard<DialogueEntry>,
}

impl DialogueLock {
    pub fn key(&self) -> ChatKey {
        self.key
    }

    pub fn state(&self) -> DialogueState {
        self.entry.state
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.entry.draft
    }

    pub fn transition(&mut self, state: DialogueState, draft: RegistrationDraft) {
        debug!("Dialogue {}: {:?} -> {:?}", self.key, self.entry.state, state);
        self.entry.state = state;
        self.entry.draft = draft;
        self.entry.touched = Instant::now();
    }

    /// Back to `None` with the draft discarded.
    pub fn reset(&mut self) {
        self.transition(DialogueState::None, RegistrationDraft::default());
    }
}

/// Per-user dialogue registry.
///
/// The outer map lock is only held to find or insert an entry; each user's entry has
/// its own mutex, so transitions for different users never wait on each other.
#[derive(Default)]
pub struct ConversationStore {
    entries: RwLock<HashMap<ChatKey, Arc<Mutex<DialogueEntry>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, key: ChatKey) -> Arc<Mutex<DialogueEntry>> {
        if let Some(entry) = self.entries.read().await.get(&key) {
            return entry.clone();
        }

        self.entries
            .write()
            .await
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(DialogueEntry::fresh())))
            .clone()
    }

    /// Current state, `None` for users with no entry.
    pub async fn state(&self, key: ChatKey) -> DialogueState {
        let entry = self.entries.read().await.get(&key).cloned();
        match entry {
            Some(entry) => entry.lock().await.state,
            None => DialogueState::None,
        }
    }

    /// Take the user's entry for a read-decide-write sequence. Taking the lock counts
    /// as activity, so a dialogue that keeps re-prompting never goes idle.
    pub async fn lock(&self, key: ChatKey) -> DialogueLock {
        let mut entry = self.entry(key).await.lock_owned().await;
        entry.touched = Instant::now();
        DialogueLock { key, entry }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop finished dialogues and those idle for at least `ttl`. Entries that are
    /// locked or about to be locked are left alone.
    pub async fn reap_expired(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            if Arc::strong_count(entry) > 1 {
                return true;
            }
            match entry.try_lock() {
                Ok(dialogue) => !dialogue.is_reclaimable(ttl),
                Err(_) => true,
            }
        });
        before - entries.len()
    }

    pub fn spawn_reaper(self: Arc<Self>, ttl: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Starting dialogue reaper (ttl {:?})", ttl);
            let mut ticker = tokio::time::interval(REAP_INTERVAL.min(ttl));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Dialogue reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let reaped = self.reap_expired(ttl).await;
                        if reaped > 0 {
                            info!("Reclaimed {} abandoned dialogue(s)", reaped);
                        }
                    }
                }
            }
        })
    }
}
