use std::collections::{BTreeSet, HashSet};

use strata_core::AppResult;
use strata_domain::{EntityActionRole, EntityKind, EntityMemberRole, Role};

/// Role requested for provisioning on one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    /// Owning entity identifier.
    pub entity_id: String,
    /// Owning entity kind, selects the action catalog.
    pub entity_kind: EntityKind,
    /// Role name, unique within the entity.
    pub name: String,
    /// Initial actions.
    pub actions: BTreeSet<String>,
    /// Initial members.
    pub members: BTreeSet<String>,
}

/// Outcome of provisioning one role of a batch.
#[derive(Debug)]
pub struct RoleProvisionOutcome {
    /// Owning entity identifier.
    pub entity_id: String,
    /// Requested role name.
    pub name: String,
    /// Stored role, or the reason this item was rejected.
    pub result: AppResult<Role>,
}

impl RoleProvisionOutcome {
    /// Returns whether this item was stored.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.result.is_ok()
    }
}

/// Roles, action grants and member links of a set of entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRolesSnapshot {
    /// Role definitions owned by the entities.
    pub roles: Vec<Role>,
    /// Action grants of those roles.
    pub action_roles: Vec<EntityActionRole>,
    /// Member links of those roles.
    pub member_roles: Vec<EntityMemberRole>,
}

impl EntityRolesSnapshot {
    /// Returns every action `member_id` holds on `entity_id`.
    ///
    /// Roles carrying a built-in name contribute at least the built-in action set.
    #[must_use]
    pub fn member_actions(&self, entity_id: &str, member_id: &str) -> BTreeSet<String> {
        let held: HashSet<&str> = self
            .member_roles
            .iter()
            .filter(|link| link.entity_id == entity_id && link.member_id == member_id)
            .map(|link| link.role_id.as_str())
            .collect();

        let mut actions: BTreeSet<String> = self
            .action_roles
            .iter()
            .filter(|grant| grant.entity_id == entity_id && held.contains(grant.role_id.as_str()))
            .map(|grant| grant.action.clone())
            .collect();

        for built_in in self
            .roles
            .iter()
            .filter(|role| role.entity_id() == entity_id && held.contains(role.id()))
            .filter_map(Role::built_in)
        {
            actions.extend(built_in.actions().iter().map(|action| (*action).to_owned()));
        }

        actions
    }
}
