//! Service contracts shared by the concrete services and their layers.

use async_trait::async_trait;

use strata_core::{AppResult, CallerIdentity, Page, PageQuery};
use strata_domain::{
    Channel, ConnectionType, EntityKind, EntityMember, EntitySummary, Group, HierarchyEntry,
    HierarchyQuery, Role,
};

use crate::group_ports::{CreateGroupInput, GroupListQuery, UpdateGroupInput};

/// Group and hierarchy operations.
#[async_trait]
pub trait GroupOperations: Send + Sync {
    /// Creates a group in the caller's domain.
    async fn create_group(
        &self,
        caller: &CallerIdentity,
        input: CreateGroupInput,
    ) -> AppResult<Group>;

    /// Returns one group.
    async fn view_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group>;

    /// Updates group attributes.
    async fn update_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<Group>;

    /// Lists groups of the caller's domain.
    async fn list_groups(
        &self,
        caller: &CallerIdentity,
        query: GroupListQuery,
    ) -> AppResult<Page<Group>>;

    /// Enables a group.
    async fn enable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group>;

    /// Disables a group.
    async fn disable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group>;

    /// Deletes a group.
    async fn delete_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()>;

    /// Returns ancestors or descendants of a group.
    async fn retrieve_group_hierarchy(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        query: HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>>;

    /// Attaches a group under a parent.
    async fn add_parent_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        parent_id: &str,
    ) -> AppResult<()>;

    /// Makes a group a root.
    async fn remove_parent_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()>;

    /// Attaches children under a group, all or nothing.
    async fn add_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()>;

    /// Detaches listed children of a group.
    async fn remove_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()>;

    /// Detaches every child of a group.
    async fn remove_all_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
    ) -> AppResult<()>;

    /// Lists direct children of a group.
    async fn list_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Group>>;
}

/// Input payload for creating a role through role management.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleInput {
    /// Role name.
    pub name: String,
    /// Initial actions.
    pub actions: Vec<String>,
    /// Initial members.
    pub members: Vec<String>,
}

/// Role management operations on the roles of one entity kind.
#[async_trait]
pub trait EntityRoleOperations: Send + Sync {
    /// Returns the kind of entity whose roles are managed.
    fn entity_kind(&self) -> EntityKind;

    /// Creates a role on the entity.
    async fn add_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        input: RoleInput,
    ) -> AppResult<Role>;

    /// Returns one role of the entity.
    async fn retrieve_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Role>;

    /// Lists roles of the entity.
    async fn retrieve_all_roles(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>>;

    /// Renames a role.
    async fn update_role_name(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        name: &str,
    ) -> AppResult<Role>;

    /// Removes a role.
    async fn remove_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()>;

    /// Lists actions a role on this kind of entity may hold.
    async fn list_available_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
    ) -> AppResult<Vec<String>>;

    /// Adds actions and returns the resulting set.
    async fn role_add_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<Vec<String>>;

    /// Lists role actions.
    async fn role_list_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Vec<String>>;

    /// Returns whether the role holds every listed action.
    async fn role_check_actions_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<bool>;

    /// Removes listed actions.
    async fn role_remove_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<()>;

    /// Removes every action.
    async fn role_remove_all_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()>;

    /// Adds members to a role.
    async fn role_add_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()>;

    /// Lists role members.
    async fn role_list_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>>;

    /// Returns whether every listed member holds the role.
    async fn role_check_members_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<bool>;

    /// Removes listed members.
    async fn role_remove_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()>;

    /// Removes every member.
    async fn role_remove_all_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()>;

    /// Lists members of the entity with their roles and actions.
    async fn list_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>>;

    /// Removes members from every role of the entity.
    async fn remove_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        members: Vec<String>,
    ) -> AppResult<()>;
}

/// Input payload for channel creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChannelInput {
    /// Channel name.
    pub name: String,
    /// Optional parent group.
    pub parent_group_id: Option<String>,
}

/// Channel operations.
#[async_trait]
pub trait ChannelOperations: Send + Sync {
    /// Creates a channel in the caller's domain.
    async fn create_channel(
        &self,
        caller: &CallerIdentity,
        input: CreateChannelInput,
    ) -> AppResult<Channel>;

    /// Returns one channel.
    async fn view_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<Channel>;

    /// Deletes a channel with its connections and roles.
    async fn delete_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<()>;

    /// Connects clients for the listed traffic directions.
    async fn connect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()>;

    /// Disconnects clients for the listed traffic directions.
    async fn disconnect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()>;

    /// Attaches the channel to a group of the same domain.
    async fn set_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        group_id: &str,
    ) -> AppResult<()>;

    /// Detaches the channel from its parent group.
    async fn remove_parent_group(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<()>;
}

/// Lookup of minimal entity data for scoping and peer services.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Returns an entity that is not deleted.
    async fn retrieve_entity(&self, entity_id: &str) -> AppResult<EntitySummary>;
}
