use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_application::RoleInput;
use strata_domain::{EntityMember, Role};

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl From<CreateRoleRequest> for RoleInput {
    fn from(value: CreateRoleRequest) -> Self {
        Self {
            name: value.name,
            actions: value.actions,
            members: value.members,
        }
    }
}

/// Incoming payload for role rename.
#[derive(Debug, Deserialize)]
pub struct RenameRoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionsRequest {
    pub actions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MembersRequest {
    pub members: Vec<String>,
}

/// Answer of an existence check.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub exists: bool,
}

/// API representation of a role.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub entity_id: String,
    pub entity_type: &'static str,
    pub name: String,
    pub built_in: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(value: Role) -> Self {
        Self {
            id: value.id().to_owned(),
            entity_id: value.entity_id().to_owned(),
            entity_type: value.entity_kind().as_str(),
            name: value.name().to_owned(),
            built_in: value.built_in().is_some(),
            created_by: value.created_by().to_owned(),
            created_at: value.created_at(),
            updated_by: value.updated_by().to_owned(),
            updated_at: value.updated_at(),
        }
    }
}

/// Role held by a member with the actions it grants.
#[derive(Debug, Serialize)]
pub struct MemberRoleResponse {
    pub role_id: String,
    pub role_name: String,
    pub actions: Vec<String>,
}

/// Member of an entity with every role held on it.
#[derive(Debug, Serialize)]
pub struct EntityMemberResponse {
    pub member_id: String,
    pub roles: Vec<MemberRoleResponse>,
}

impl From<EntityMember> for EntityMemberResponse {
    fn from(value: EntityMember) -> Self {
        Self {
            member_id: value.member_id,
            roles: value
                .roles
                .into_iter()
                .map(|role| MemberRoleResponse {
                    role_id: role.role_id,
                    role_name: role.role_name,
                    actions: role.actions.into_iter().collect(),
                })
                .collect(),
        }
    }
}
