//! Endpoint-level gates, checked before a request body is validated.

use super::auth::AuthenticatedUser;
use super::error::{ApiError, ApiResult};
use crate::domain::entities::{Record, ResourceId, Team};

fn deny(caller: &AuthenticatedUser, action: &str) -> ApiError {
    tracing::warn!("{} ({}) may not {}", caller.username, caller.role, action);
    ApiError::Forbidden(format!("Not allowed to {}", action))
}

fn is_team_owner(caller: &AuthenticatedUser, team: &Record<Team>) -> bool {
    caller.is_member_of(team.id) || team.leader == caller.id
}

pub fn require_admin(caller: &AuthenticatedUser, action: &str) -> ApiResult<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(deny(caller, action))
    }
}

/// Only someone without a team may found one.
pub fn require_unaffiliated(caller: &AuthenticatedUser) -> ApiResult<()> {
    if caller.team.is_none() {
        Ok(())
    } else {
        Err(deny(caller, "create a team while already in one"))
    }
}

pub fn require_team_editor(caller: &AuthenticatedUser, team: &Record<Team>) -> ApiResult<()> {
    if caller.is_admin() || caller.is_judge() || is_team_owner(caller, team) {
        Ok(())
    } else {
        Err(deny(caller, "update this team"))
    }
}

pub fn require_team_owner(caller: &AuthenticatedUser, team: &Record<Team>) -> ApiResult<()> {
    if caller.is_admin() || is_team_owner(caller, team) {
        Ok(())
    } else {
        Err(deny(caller, "delete this team"))
    }
}

pub fn require_admin_or_self(caller: &AuthenticatedUser, user_id: ResourceId) -> ApiResult<()> {
    if caller.is_admin() || caller.id == user_id {
        Ok(())
    } else {
        Err(deny(caller, "delete this user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Identity, Role};

    fn caller(role: Role, team: Option<ResourceId>) -> AuthenticatedUser {
        AuthenticatedUser {
            identity: Identity {
                id: ResourceId::new(),
                username: "u".into(),
                role,
                team,
            },
        }
    }

    #[test]
    fn test_judge_may_edit_but_not_delete_team() {
        let judge = caller(Role::Judge, None);
        let team = Record::new(ResourceId::new(), Team::new("T".into(), ResourceId::new()));
        assert!(require_team_editor(&judge, &team).is_ok());
        assert!(matches!(
            require_team_owner(&judge, &team),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_member_of_a_team_cannot_found_another() {
        assert!(require_unaffiliated(&caller(Role::Participant, None)).is_ok());
        assert!(require_unaffiliated(&caller(Role::Participant, Some(ResourceId::new()))).is_err());
    }

    #[test]
    fn test_user_delete_gate() {
        let user = caller(Role::Participant, None);
        assert!(require_admin_or_self(&user, user.id).is_ok());
        assert!(require_admin_or_self(&user, ResourceId::new()).is_err());
        assert!(require_admin_or_self(&caller(Role::Admin, None), ResourceId::new()).is_ok());
    }
}
