use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::resource::{timestamp, Resource, ResourceId};

/// judge id -> team member id -> score
pub type Grades = BTreeMap<ResourceId, BTreeMap<ResourceId, i32>>;

pub const MIN_GRADE: i32 = 0;
pub const MAX_GRADE: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub leader: ResourceId,
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub presentation_uri: String,
    #[serde(default)]
    pub grades: Grades,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: String, leader: ResourceId) -> Self {
        Self {
            name,
            leader,
            repos: Vec::new(),
            presentation_uri: String::new(),
            grades: Grades::new(),
            created_at: Utc::now(),
        }
    }
}

impl Resource for Team {
    const COLLECTION: &'static str = "teams";
    const CREATED_AT_FIELD: Option<&'static str> = Some("created_at");
    type Patch = TeamPatch;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repos: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grades: Option<Grades>,
}
