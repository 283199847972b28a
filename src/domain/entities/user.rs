use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::resource::{timestamp, Record, Resource, ResourceId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Participant,
    Judge,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Participant => write!(f, "participant"),
            Role::Judge => write!(f, "judge"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "participant" => Ok(Role::Participant),
            "judge" => Ok(Role::Judge),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub birthdate: NaiveDate,
    pub role: Role,
    /// `None` is the unaffiliated sentinel.
    #[serde(default)]
    pub team: Option<ResourceId>,
    pub username: String,
    pub chat_id: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A freshly registered participant with no team.
    pub fn participant(name: String, birthdate: NaiveDate, username: String, chat_id: i64) -> Self {
        Self {
            name,
            birthdate,
            role: Role::Participant,
            team: None,
            username,
            chat_id,
            created_at: Utc::now(),
        }
    }
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const CREATED_AT_FIELD: Option<&'static str> = Some("created_at");
    type Patch = UserPatch;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<ResourceId>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub id: ResourceId,
    pub username: String,
    pub role: Role,
    pub team: Option<ResourceId>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_judge(&self) -> bool {
        self.role == Role::Judge
    }

    pub fn is_member_of(&self, team_id: ResourceId) -> bool {
        self.team == Some(team_id)
    }
}

impl From<&Record<User>> for Identity {
    fn from(user: &Record<User>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            team: user.team,
        }
    }
}
