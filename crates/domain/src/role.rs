use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::{AppError, AppResult, NonEmptyString};

use crate::{BuiltInRole, EntityKind};

/// Longest role name accepted.
pub const ROLE_NAME_MAX_LENGTH: usize = 254;

/// Role owned by exactly one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: String,
    entity_id: String,
    entity_kind: EntityKind,
    name: NonEmptyString,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role definition.
    pub fn new(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        entity_kind: EntityKind,
        name: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let created_by = created_by.into();
        Ok(Self {
            id: NonEmptyString::new(id)?.into(),
            entity_id: NonEmptyString::new(entity_id)?.into(),
            entity_kind,
            name: validate_role_name(name)?,
            updated_by: created_by.clone(),
            created_by,
            created_at,
            updated_at: created_at,
        })
    }

    /// Rebuilds a role from persisted values.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: impl Into<String>,
        entity_id: impl Into<String>,
        entity_kind: EntityKind,
        name: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_by: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: id.into(),
            entity_id: entity_id.into(),
            entity_kind,
            name: NonEmptyString::new(name)?,
            created_by: created_by.into(),
            created_at,
            updated_by: updated_by.into(),
            updated_at,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the owning entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }

    /// Returns the owning entity kind.
    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    /// Returns the role name, unique within the owning entity.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the subject that created the role.
    #[must_use]
    pub fn created_by(&self) -> &str {
        self.created_by.as_str()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the subject that last updated the role.
    #[must_use]
    pub fn updated_by(&self) -> &str {
        self.updated_by.as_str()
    }

    /// Returns the last update timestamp used for optimistic checks.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the built-in role this role instantiates, if any.
    #[must_use]
    pub fn built_in(&self) -> Option<BuiltInRole> {
        BuiltInRole::find(self.entity_kind, self.name())
    }

    /// Returns a renamed copy stamped with the updating subject.
    pub fn renamed(
        &self,
        name: impl Into<String>,
        updated_by: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            name: validate_role_name(name)?,
            updated_by: updated_by.into(),
            updated_at,
            ..self.clone()
        })
    }
}

fn validate_role_name(name: impl Into<String>) -> AppResult<NonEmptyString> {
    let name = name.into();
    let trimmed = name.trim();
    if trimmed.len() > ROLE_NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "role name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
        )));
    }

    NonEmptyString::new(trimmed)
}

/// Role together with its action and member sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRole {
    /// Role definition.
    pub role: Role,
    /// Actions granted by the role.
    pub actions: BTreeSet<String>,
    /// Members holding the role.
    pub members: BTreeSet<String>,
}

/// Row of the bulk export: one action granted by one role of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityActionRole {
    /// Entity identifier.
    pub entity_id: String,
    /// Granted action.
    pub action: String,
    /// Role granting the action.
    pub role_id: String,
}

/// Row of the bulk export: one member holding one role of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityMemberRole {
    /// Entity identifier.
    pub entity_id: String,
    /// Member identifier.
    pub member_id: String,
    /// Role held by the member.
    pub role_id: String,
}

/// Role held by a member, with the actions it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRoleActions {
    /// Role identifier.
    pub role_id: String,
    /// Role name.
    pub role_name: String,
    /// Actions granted by the role.
    pub actions: BTreeSet<String>,
}

/// Aggregated view of one member's roles on one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMember {
    /// Member identifier.
    pub member_id: String,
    /// Roles held by the member on the entity.
    pub roles: Vec<MemberRoleActions>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use proptest::prelude::*;

    use crate::EntityKind;

    use super::{ROLE_NAME_MAX_LENGTH, Role};

    #[test]
    fn built_in_role_is_detected_by_name() {
        let role = Role::new("r1", "group-1", EntityKind::Group, "admin", "u1", Utc::now());
        assert!(role.is_ok());
        assert!(role.unwrap_or_else(|_| unreachable!()).built_in().is_some());

        let custom = Role::new("r2", "group-1", EntityKind::Group, "editor", "u1", Utc::now())
            .unwrap_or_else(|_| unreachable!());
        assert!(custom.built_in().is_none());
    }

    #[test]
    fn rename_keeps_identity_and_creation_stamp() {
        let created_at = Utc::now();
        let role = Role::new("r1", "group-1", EntityKind::Group, "editor", "u1", created_at)
            .unwrap_or_else(|_| unreachable!());
        let renamed = role
            .renamed("writer", "u2", Utc::now())
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(renamed.id(), "r1");
        assert_eq!(renamed.name(), "writer");
        assert_eq!(renamed.created_at(), created_at);
        assert_eq!(renamed.updated_by(), "u2");
    }

    proptest! {
        #[test]
        fn overlong_role_names_are_rejected(extra in 1usize..64) {
            let name = "r".repeat(ROLE_NAME_MAX_LENGTH + extra);
            let role = Role::new("r1", "group-1", EntityKind::Group, name, "u1", Utc::now());
            prop_assert!(role.is_err());
        }
    }
}
