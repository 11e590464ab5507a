use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use strata_core::{AppError, AppResult, CallerIdentity, Page, PageQuery, SubjectKind};
use strata_domain::{
    Channel, ConnectionType, EntityKind, EntityMember, Group, HierarchyEntry, HierarchyQuery, Role,
};

use crate::group_ports::{CreateGroupInput, GroupListQuery, UpdateGroupInput};
use crate::operations::{
    ChannelOperations, CreateChannelInput, EntityRoleOperations, GroupOperations, RoleInput,
};
use crate::permission_maps::{
    ChannelOperation, GroupOperation, Operation, PermissionMaps, RoleOperation,
};
use crate::permission_resolver::{AccessCheck, PermissionResolver};
use crate::pipeline::Layer;

/// Layer that guards every call with a permission check.
#[derive(Clone)]
pub struct AuthorizationLayer {
    resolver: PermissionResolver,
    maps: Arc<PermissionMaps>,
}

impl AuthorizationLayer {
    /// Creates the layer.
    #[must_use]
    pub fn new(resolver: PermissionResolver, maps: PermissionMaps) -> Self {
        Self {
            resolver,
            maps: Arc::new(maps),
        }
    }

    fn middleware<S: ?Sized>(&self, inner: Arc<S>) -> AuthorizationMiddleware<S> {
        AuthorizationMiddleware {
            inner,
            resolver: self.resolver.clone(),
            maps: self.maps.clone(),
        }
    }
}

impl Layer<dyn GroupOperations> for AuthorizationLayer {
    fn wrap(&self, inner: Arc<dyn GroupOperations>) -> Arc<dyn GroupOperations> {
        Arc::new(self.middleware(inner))
    }
}

impl Layer<dyn ChannelOperations> for AuthorizationLayer {
    fn wrap(&self, inner: Arc<dyn ChannelOperations>) -> Arc<dyn ChannelOperations> {
        Arc::new(self.middleware(inner))
    }
}

impl Layer<dyn EntityRoleOperations> for AuthorizationLayer {
    fn wrap(&self, inner: Arc<dyn EntityRoleOperations>) -> Arc<dyn EntityRoleOperations> {
        Arc::new(self.middleware(inner))
    }
}

/// Service decorator that delegates only after the caller is authorized.
///
/// Operations touching two entities check both. An operation missing from the
/// permission maps is refused.
pub struct AuthorizationMiddleware<S: ?Sized> {
    inner: Arc<S>,
    resolver: PermissionResolver,
    maps: Arc<PermissionMaps>,
}

impl<S: ?Sized> AuthorizationMiddleware<S> {
    async fn authorize(
        &self,
        caller: &CallerIdentity,
        operation: Operation,
        entity_id: &str,
        entity_kind: EntityKind,
    ) -> AppResult<()> {
        if caller.kind() == SubjectKind::User {
            caller.require_domain()?;
        }

        let Some(action) = self.maps.required_action(operation) else {
            return Err(AppError::Internal(format!(
                "operation '{}' has no permission mapping",
                operation.name()
            )));
        };

        let source = self
            .resolver
            .require(
                caller,
                AccessCheck {
                    entity_id,
                    entity_kind,
                    action,
                    external_permission: self.maps.external_permission(operation),
                },
            )
            .await?;

        debug!(
            subject = caller.subject(),
            operation = %operation.name(),
            entity_id,
            ?source,
            "operation authorized"
        );
        Ok(())
    }

    async fn authorize_in_domain(
        &self,
        caller: &CallerIdentity,
        operation: Operation,
    ) -> AppResult<()> {
        let domain_id = caller.require_domain()?;
        self.authorize(caller, operation, domain_id.as_str(), EntityKind::Domain)
            .await
    }

    async fn authorize_group(
        &self,
        caller: &CallerIdentity,
        operation: GroupOperation,
        group_id: &str,
    ) -> AppResult<()> {
        self.authorize(caller, Operation::Group(operation), group_id, EntityKind::Group)
            .await
    }

    async fn authorize_channel(
        &self,
        caller: &CallerIdentity,
        operation: ChannelOperation,
        channel_id: &str,
    ) -> AppResult<()> {
        self.authorize(
            caller,
            Operation::Channel(operation),
            channel_id,
            EntityKind::Channel,
        )
        .await
    }
}

#[async_trait]
impl GroupOperations for AuthorizationMiddleware<dyn GroupOperations> {
    async fn create_group(
        &self,
        caller: &CallerIdentity,
        input: CreateGroupInput,
    ) -> AppResult<Group> {
        self.authorize_in_domain(caller, Operation::Group(GroupOperation::Create))
            .await?;
        if let Some(parent_id) = input.parent_id.as_deref() {
            self.authorize_group(caller, GroupOperation::AddChildren, parent_id)
                .await?;
        }
        self.inner.create_group(caller, input).await
    }

    async fn view_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.authorize_group(caller, GroupOperation::View, group_id)
            .await?;
        self.inner.view_group(caller, group_id).await
    }

    async fn update_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<Group> {
        self.authorize_group(caller, GroupOperation::Update, group_id)
            .await?;
        self.inner.update_group(caller, group_id, input).await
    }

    async fn list_groups(
        &self,
        caller: &CallerIdentity,
        query: GroupListQuery,
    ) -> AppResult<Page<Group>> {
        self.authorize_in_domain(caller, Operation::Group(GroupOperation::List))
            .await?;
        self.inner.list_groups(caller, query).await
    }

    async fn enable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.authorize_group(caller, GroupOperation::Enable, group_id)
            .await?;
        self.inner.enable_group(caller, group_id).await
    }

    async fn disable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.authorize_group(caller, GroupOperation::Disable, group_id)
            .await?;
        self.inner.disable_group(caller, group_id).await
    }

    async fn delete_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::Delete, group_id)
            .await?;
        self.inner.delete_group(caller, group_id).await
    }

    async fn retrieve_group_hierarchy(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        query: HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        self.authorize_group(caller, GroupOperation::RetrieveHierarchy, group_id)
            .await?;
        self.inner
            .retrieve_group_hierarchy(caller, group_id, query)
            .await
    }

    async fn add_parent_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        parent_id: &str,
    ) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::AddParent, group_id)
            .await?;
        self.authorize_group(caller, GroupOperation::AddChildren, parent_id)
            .await?;
        self.inner.add_parent_group(caller, group_id, parent_id).await
    }

    async fn remove_parent_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::RemoveParent, group_id)
            .await?;
        self.inner.remove_parent_group(caller, group_id).await
    }

    async fn add_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::AddChildren, group_id)
            .await?;
        for child_id in children {
            self.authorize_group(caller, GroupOperation::AddParent, child_id)
                .await?;
        }
        self.inner
            .add_children_groups(caller, group_id, children)
            .await
    }

    async fn remove_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::RemoveChildren, group_id)
            .await?;
        self.inner
            .remove_children_groups(caller, group_id, children)
            .await
    }

    async fn remove_all_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
    ) -> AppResult<()> {
        self.authorize_group(caller, GroupOperation::RemoveAllChildren, group_id)
            .await?;
        self.inner.remove_all_children_groups(caller, group_id).await
    }

    async fn list_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Group>> {
        self.authorize_group(caller, GroupOperation::ListChildren, group_id)
            .await?;
        self.inner
            .list_children_groups(caller, group_id, page)
            .await
    }
}

#[async_trait]
impl ChannelOperations for AuthorizationMiddleware<dyn ChannelOperations> {
    async fn create_channel(
        &self,
        caller: &CallerIdentity,
        input: CreateChannelInput,
    ) -> AppResult<Channel> {
        self.authorize_in_domain(caller, Operation::Channel(ChannelOperation::Create))
            .await?;
        if let Some(group_id) = input.parent_group_id.as_deref() {
            self.authorize_group(caller, GroupOperation::AddChildren, group_id)
                .await?;
        }
        self.inner.create_channel(caller, input).await
    }

    async fn view_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<Channel> {
        self.authorize_channel(caller, ChannelOperation::View, channel_id)
            .await?;
        self.inner.view_channel(caller, channel_id).await
    }

    async fn delete_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<()> {
        self.authorize_channel(caller, ChannelOperation::Delete, channel_id)
            .await?;
        self.inner.delete_channel(caller, channel_id).await
    }

    async fn connect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        self.authorize_channel(caller, ChannelOperation::Connect, channel_id)
            .await?;
        self.inner
            .connect(caller, channel_id, client_ids, connection_types)
            .await
    }

    async fn disconnect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        self.authorize_channel(caller, ChannelOperation::Disconnect, channel_id)
            .await?;
        self.inner
            .disconnect(caller, channel_id, client_ids, connection_types)
            .await
    }

    async fn set_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        group_id: &str,
    ) -> AppResult<()> {
        self.authorize_channel(caller, ChannelOperation::SetParentGroup, channel_id)
            .await?;
        self.authorize_group(caller, GroupOperation::AddChildren, group_id)
            .await?;
        self.inner
            .set_parent_group(caller, channel_id, group_id)
            .await
    }

    async fn remove_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
    ) -> AppResult<()> {
        self.authorize_channel(caller, ChannelOperation::RemoveParentGroup, channel_id)
            .await?;
        self.inner.remove_parent_group(caller, channel_id).await
    }
}

impl AuthorizationMiddleware<dyn EntityRoleOperations> {
    async fn authorize_role(
        &self,
        caller: &CallerIdentity,
        operation: RoleOperation,
        entity_id: &str,
    ) -> AppResult<()> {
        self.authorize(
            caller,
            Operation::Role(operation),
            entity_id,
            self.inner.entity_kind(),
        )
        .await
    }
}

#[async_trait]
impl EntityRoleOperations for AuthorizationMiddleware<dyn EntityRoleOperations> {
    fn entity_kind(&self) -> EntityKind {
        self.inner.entity_kind()
    }

    async fn add_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        input: RoleInput,
    ) -> AppResult<Role> {
        self.authorize_role(caller, RoleOperation::Add, entity_id)
            .await?;
        self.inner.add_role(caller, entity_id, input).await
    }

    async fn retrieve_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Role> {
        self.authorize_role(caller, RoleOperation::View, entity_id)
            .await?;
        self.inner.retrieve_role(caller, entity_id, role_id).await
    }

    async fn retrieve_all_roles(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>> {
        self.authorize_role(caller, RoleOperation::List, entity_id)
            .await?;
        self.inner.retrieve_all_roles(caller, entity_id, page).await
    }

    async fn update_role_name(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        name: &str,
    ) -> AppResult<Role> {
        self.authorize_role(caller, RoleOperation::Update, entity_id)
            .await?;
        self.inner
            .update_role_name(caller, entity_id, role_id, name)
            .await
    }

    async fn remove_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::Remove, entity_id)
            .await?;
        self.inner.remove_role(caller, entity_id, role_id).await
    }

    async fn list_available_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
    ) -> AppResult<Vec<String>> {
        self.authorize_role(caller, RoleOperation::ListAvailableActions, entity_id)
            .await?;
        self.inner.list_available_actions(caller, entity_id).await
    }

    async fn role_add_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<Vec<String>> {
        self.authorize_role(caller, RoleOperation::AddActions, entity_id)
            .await?;
        self.inner
            .role_add_actions(caller, entity_id, role_id, actions)
            .await
    }

    async fn role_list_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Vec<String>> {
        self.authorize_role(caller, RoleOperation::ListActions, entity_id)
            .await?;
        self.inner
            .role_list_actions(caller, entity_id, role_id)
            .await
    }

    async fn role_check_actions_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<bool> {
        self.authorize_role(caller, RoleOperation::CheckActions, entity_id)
            .await?;
        self.inner
            .role_check_actions_exist(caller, entity_id, role_id, actions)
            .await
    }

    async fn role_remove_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::RemoveActions, entity_id)
            .await?;
        self.inner
            .role_remove_actions(caller, entity_id, role_id, actions)
            .await
    }

    async fn role_remove_all_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::RemoveAllActions, entity_id)
            .await?;
        self.inner
            .role_remove_all_actions(caller, entity_id, role_id)
            .await
    }

    async fn role_add_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::AddMembers, entity_id)
            .await?;
        self.inner
            .role_add_members(caller, entity_id, role_id, members)
            .await
    }

    async fn role_list_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>> {
        self.authorize_role(caller, RoleOperation::ListMembers, entity_id)
            .await?;
        self.inner
            .role_list_members(caller, entity_id, role_id, page)
            .await
    }

    async fn role_check_members_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<bool> {
        self.authorize_role(caller, RoleOperation::CheckMembers, entity_id)
            .await?;
        self.inner
            .role_check_members_exist(caller, entity_id, role_id, members)
            .await
    }

    async fn role_remove_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::RemoveMembers, entity_id)
            .await?;
        self.inner
            .role_remove_members(caller, entity_id, role_id, members)
            .await
    }

    async fn role_remove_all_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::RemoveAllMembers, entity_id)
            .await?;
        self.inner
            .role_remove_all_members(caller, entity_id, role_id)
            .await
    }

    async fn list_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        self.authorize_role(caller, RoleOperation::ListEntityMembers, entity_id)
            .await?;
        self.inner
            .list_entity_members(caller, entity_id, page)
            .await
    }

    async fn remove_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.authorize_role(caller, RoleOperation::RemoveEntityMembers, entity_id)
            .await?;
        self.inner
            .remove_entity_members(caller, entity_id, members)
            .await
    }
}
