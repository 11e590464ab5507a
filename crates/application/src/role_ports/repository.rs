use async_trait::async_trait;
use chrono::{DateTime, Utc};

use strata_core::{AppResult, Page, PageQuery};
use strata_domain::{EntityMember, ProvisionedRole, Role};

use super::records::{EntityRolesSnapshot, RoleProvisionOutcome};

/// Entity-scoped persistence port for roles, their actions and members.
///
/// Set operations are idempotent: adding an element that is already present
/// and removing one that is absent are no-ops.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Stores each role with its actions and members in its own transaction.
    ///
    /// A name collision inside the owning entity fails only that item.
    async fn add_roles(&self, roles: Vec<ProvisionedRole>) -> AppResult<Vec<RoleProvisionOutcome>>;

    /// Returns a role by identifier.
    async fn retrieve_role(&self, role_id: &str) -> AppResult<Role>;

    /// Returns a role only when it is owned by `entity_id`.
    async fn retrieve_entity_role(&self, entity_id: &str, role_id: &str) -> AppResult<Role>;

    /// Replaces the role definition if it was not changed since `expected_updated_at`.
    async fn update_role(&self, role: Role, expected_updated_at: DateTime<Utc>) -> AppResult<Role>;

    /// Removes roles with their actions and member links.
    async fn remove_roles(&self, role_ids: &[String]) -> AppResult<()>;

    /// Adds actions to a role.
    async fn role_add_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()>;

    /// Removes the listed actions from a role.
    async fn role_remove_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()>;

    /// Removes every action from a role.
    async fn role_remove_all_actions(&self, role_id: &str) -> AppResult<()>;

    /// Lists the actions of a role in name order.
    async fn role_list_actions(&self, role_id: &str) -> AppResult<Vec<String>>;

    /// Returns whether the role holds every listed action.
    async fn role_check_actions_exist(&self, role_id: &str, actions: &[String]) -> AppResult<bool>;

    /// Adds members to a role.
    async fn role_add_members(&self, role_id: &str, members: &[String]) -> AppResult<()>;

    /// Removes the listed members from a role.
    async fn role_remove_members(&self, role_id: &str, members: &[String]) -> AppResult<()>;

    /// Removes every member from a role.
    async fn role_remove_all_members(&self, role_id: &str) -> AppResult<()>;

    /// Lists the members of a role in identifier order.
    async fn role_list_members(&self, role_id: &str, page: PageQuery) -> AppResult<Page<String>>;

    /// Returns whether every listed member holds the role.
    async fn role_check_members_exist(&self, role_id: &str, members: &[String]) -> AppResult<bool>;

    /// Lists the roles of an entity in name order.
    async fn retrieve_all_roles(&self, entity_id: &str, page: PageQuery) -> AppResult<Page<Role>>;

    /// Lists members of an entity with the roles and actions they hold.
    async fn list_entity_members(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>>;

    /// Removes the listed members from every role of one entity.
    async fn remove_entity_members(&self, entity_id: &str, members: &[String]) -> AppResult<()>;

    /// Removes a member from every role of every entity.
    async fn remove_member_from_all_roles(&self, member_id: &str) -> AppResult<()>;

    /// Removes every role owned by the listed entities.
    async fn remove_entity_roles(&self, entity_ids: &[String]) -> AppResult<()>;

    /// Loads roles, action grants and member links of the listed entities.
    async fn retrieve_entities_roles_actions_members(
        &self,
        entity_ids: &[String],
    ) -> AppResult<EntityRolesSnapshot>;
}
