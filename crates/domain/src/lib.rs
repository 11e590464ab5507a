//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod channel;
mod entity;
mod group;
pub mod hierarchy;
mod role;

pub use channel::{Channel, Connection, ConnectionType, EntitySummary};
pub use entity::{BUILT_IN_ADMIN_ROLE, BuiltInRole, EntityKind, actions};
pub use group::{EntityStatus, Group, StatusCascade};
pub use hierarchy::{HierarchyDirection, HierarchyEntry, HierarchyQuery, MAX_HIERARCHY_LEVEL};
pub use role::{
    EntityActionRole, EntityMember, EntityMemberRole, MemberRoleActions, ProvisionedRole,
    ROLE_NAME_MAX_LENGTH, Role,
};
