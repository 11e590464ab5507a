use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incoming payload for group creation.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<String>,
}

/// Incoming payload for group attribute updates.
#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Query string for group listings.
#[derive(Debug, Default, Deserialize)]
pub struct GroupListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// Query string for hierarchy retrieval; `level` 0 or absent means the full chain.
#[derive(Debug, Default, Deserialize)]
pub struct HierarchyParams {
    pub level: Option<u32>,
    pub direction: Option<String>,
}

/// Incoming payload for attaching a group under a parent.
#[derive(Debug, Deserialize)]
pub struct AddParentRequest {
    pub parent_id: String,
}

/// Incoming payload listing child groups.
#[derive(Debug, Deserialize)]
pub struct ChildrenRequest {
    pub children: Vec<String>,
}

/// API representation of a group.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub domain_id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub description: String,
    pub status: &'static str,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Group returned by a hierarchy query.
#[derive(Debug, Serialize)]
pub struct HierarchyEntryResponse {
    #[serde(flatten)]
    pub group: GroupResponse,
    pub level: u32,
}
