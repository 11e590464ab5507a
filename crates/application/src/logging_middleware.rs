use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use strata_core::{AppResult, CallerIdentity, Page, PageQuery};
use strata_domain::{
    Channel, ConnectionType, EntityKind, EntityMember, Group, HierarchyEntry, HierarchyQuery, Role,
};

use crate::group_ports::{CreateGroupInput, GroupListQuery, UpdateGroupInput};
use crate::operations::{
    ChannelOperations, CreateChannelInput, EntityRoleOperations, GroupOperations, RoleInput,
};
use crate::pipeline::Layer;

/// Layer that records one structured event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer;

impl Layer<dyn GroupOperations> for LoggingLayer {
    fn wrap(&self, inner: Arc<dyn GroupOperations>) -> Arc<dyn GroupOperations> {
        Arc::new(LoggingMiddleware { inner })
    }
}

impl Layer<dyn ChannelOperations> for LoggingLayer {
    fn wrap(&self, inner: Arc<dyn ChannelOperations>) -> Arc<dyn ChannelOperations> {
        Arc::new(LoggingMiddleware { inner })
    }
}

impl Layer<dyn EntityRoleOperations> for LoggingLayer {
    fn wrap(&self, inner: Arc<dyn EntityRoleOperations>) -> Arc<dyn EntityRoleOperations> {
        Arc::new(LoggingMiddleware { inner })
    }
}

/// Service decorator logging operation outcome and latency.
pub struct LoggingMiddleware<S: ?Sized> {
    inner: Arc<S>,
}

async fn observe<T, F>(
    operation: &'static str,
    caller: &CallerIdentity,
    target: &str,
    call: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let started = Instant::now();
    let result = call.await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(_) => info!(
            operation,
            subject = caller.subject(),
            target,
            elapsed_ms,
            "operation completed"
        ),
        Err(error) => warn!(
            operation,
            subject = caller.subject(),
            target,
            elapsed_ms,
            kind = error.kind().as_str(),
            error = %error,
            "operation failed"
        ),
    }

    result
}

#[async_trait]
impl GroupOperations for LoggingMiddleware<dyn GroupOperations> {
    async fn create_group(
        &self,
        caller: &CallerIdentity,
        input: CreateGroupInput,
    ) -> AppResult<Group> {
        let target = caller.domain_id().map(|domain| domain.to_string()).unwrap_or_default();
        observe("create_group", caller, &target, self.inner.create_group(caller, input)).await
    }

    async fn view_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        observe("view_group", caller, group_id, self.inner.view_group(caller, group_id)).await
    }

    async fn update_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<Group> {
        observe(
            "update_group",
            caller,
            group_id,
            self.inner.update_group(caller, group_id, input),
        )
        .await
    }

    async fn list_groups(
        &self,
        caller: &CallerIdentity,
        query: GroupListQuery,
    ) -> AppResult<Page<Group>> {
        let target = caller.domain_id().map(|domain| domain.to_string()).unwrap_or_default();
        observe("list_groups", caller, &target, self.inner.list_groups(caller, query)).await
    }

    async fn enable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        observe("enable_group", caller, group_id, self.inner.enable_group(caller, group_id)).await
    }

    async fn disable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        observe("disable_group", caller, group_id, self.inner.disable_group(caller, group_id)).await
    }

    async fn delete_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        observe("delete_group", caller, group_id, self.inner.delete_group(caller, group_id)).await
    }

    async fn retrieve_group_hierarchy(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        query: HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        observe(
            "retrieve_group_hierarchy",
            caller,
            group_id,
            self.inner.retrieve_group_hierarchy(caller, group_id, query),
        )
        .await
    }

    async fn add_parent_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        parent_id: &str,
    ) -> AppResult<()> {
        observe(
            "add_parent_group",
            caller,
            group_id,
            self.inner.add_parent_group(caller, group_id, parent_id),
        )
        .await
    }

    async fn remove_parent_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        observe(
            "remove_parent_group",
            caller,
            group_id,
            self.inner.remove_parent_group(caller, group_id),
        )
        .await
    }

    async fn add_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        observe(
            "add_children_groups",
            caller,
            group_id,
            self.inner.add_children_groups(caller, group_id, children),
        )
        .await
    }

    async fn remove_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        observe(
            "remove_children_groups",
            caller,
            group_id,
            self.inner.remove_children_groups(caller, group_id, children),
        )
        .await
    }

    async fn remove_all_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
    ) -> AppResult<()> {
        observe(
            "remove_all_children_groups",
            caller,
            group_id,
            self.inner.remove_all_children_groups(caller, group_id),
        )
        .await
    }

    async fn list_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Group>> {
        observe(
            "list_children_groups",
            caller,
            group_id,
            self.inner.list_children_groups(caller, group_id, page),
        )
        .await
    }
}

#[async_trait]
impl ChannelOperations for LoggingMiddleware<dyn ChannelOperations> {
    async fn create_channel(
        &self,
        caller: &CallerIdentity,
        input: CreateChannelInput,
    ) -> AppResult<Channel> {
        let target = caller.domain_id().map(|domain| domain.to_string()).unwrap_or_default();
        observe("create_channel", caller, &target, self.inner.create_channel(caller, input)).await
    }

    async fn view_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<Channel> {
        observe(
            "view_channel",
            caller,
            channel_id,
            self.inner.view_channel(caller, channel_id),
        )
        .await
    }

    async fn delete_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<()> {
        observe(
            "delete_channel",
            caller,
            channel_id,
            self.inner.delete_channel(caller, channel_id),
        )
        .await
    }

    async fn connect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        observe(
            "connect",
            caller,
            channel_id,
            self.inner
                .connect(caller, channel_id, client_ids, connection_types),
        )
        .await
    }

    async fn disconnect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        observe(
            "disconnect",
            caller,
            channel_id,
            self.inner
                .disconnect(caller, channel_id, client_ids, connection_types),
        )
        .await
    }

    async fn set_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        group_id: &str,
    ) -> AppResult<()> {
        observe(
            "set_channel_parent_group",
            caller,
            channel_id,
            self.inner.set_parent_group(caller, channel_id, group_id),
        )
        .await
    }

    async fn remove_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
    ) -> AppResult<()> {
        observe(
            "remove_channel_parent_group",
            caller,
            channel_id,
            self.inner.remove_parent_group(caller, channel_id),
        )
        .await
    }
}

#[async_trait]
impl EntityRoleOperations for LoggingMiddleware<dyn EntityRoleOperations> {
    fn entity_kind(&self) -> EntityKind {
        self.inner.entity_kind()
    }

    async fn add_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        input: RoleInput,
    ) -> AppResult<Role> {
        observe("add_role", caller, entity_id, self.inner.add_role(caller, entity_id, input)).await
    }

    async fn retrieve_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Role> {
        observe(
            "retrieve_role",
            caller,
            entity_id,
            self.inner.retrieve_role(caller, entity_id, role_id),
        )
        .await
    }

    async fn retrieve_all_roles(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>> {
        observe(
            "retrieve_all_roles",
            caller,
            entity_id,
            self.inner.retrieve_all_roles(caller, entity_id, page),
        )
        .await
    }

    async fn update_role_name(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        name: &str,
    ) -> AppResult<Role> {
        observe(
            "update_role_name",
            caller,
            entity_id,
            self.inner.update_role_name(caller, entity_id, role_id, name),
        )
        .await
    }

    async fn remove_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        observe(
            "remove_role",
            caller,
            entity_id,
            self.inner.remove_role(caller, entity_id, role_id),
        )
        .await
    }

    async fn list_available_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
    ) -> AppResult<Vec<String>> {
        observe(
            "list_available_actions",
            caller,
            entity_id,
            self.inner.list_available_actions(caller, entity_id),
        )
        .await
    }

    async fn role_add_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<Vec<String>> {
        observe(
            "role_add_actions",
            caller,
            entity_id,
            self.inner.role_add_actions(caller, entity_id, role_id, actions),
        )
        .await
    }

    async fn role_list_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Vec<String>> {
        observe(
            "role_list_actions",
            caller,
            entity_id,
            self.inner.role_list_actions(caller, entity_id, role_id),
        )
        .await
    }

    async fn role_check_actions_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<bool> {
        observe(
            "role_check_actions_exist",
            caller,
            entity_id,
            self.inner
                .role_check_actions_exist(caller, entity_id, role_id, actions),
        )
        .await
    }

    async fn role_remove_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<()> {
        observe(
            "role_remove_actions",
            caller,
            entity_id,
            self.inner
                .role_remove_actions(caller, entity_id, role_id, actions),
        )
        .await
    }

    async fn role_remove_all_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        observe(
            "role_remove_all_actions",
            caller,
            entity_id,
            self.inner.role_remove_all_actions(caller, entity_id, role_id),
        )
        .await
    }

    async fn role_add_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        observe(
            "role_add_members",
            caller,
            entity_id,
            self.inner.role_add_members(caller, entity_id, role_id, members),
        )
        .await
    }

    async fn role_list_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>> {
        observe(
            "role_list_members",
            caller,
            entity_id,
            self.inner.role_list_members(caller, entity_id, role_id, page),
        )
        .await
    }

    async fn role_check_members_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<bool> {
        observe(
            "role_check_members_exist",
            caller,
            entity_id,
            self.inner
                .role_check_members_exist(caller, entity_id, role_id, members),
        )
        .await
    }

    async fn role_remove_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        observe(
            "role_remove_members",
            caller,
            entity_id,
            self.inner
                .role_remove_members(caller, entity_id, role_id, members),
        )
        .await
    }

    async fn role_remove_all_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        observe(
            "role_remove_all_members",
            caller,
            entity_id,
            self.inner.role_remove_all_members(caller, entity_id, role_id),
        )
        .await
    }

    async fn list_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        observe(
            "list_entity_members",
            caller,
            entity_id,
            self.inner.list_entity_members(caller, entity_id, page),
        )
        .await
    }

    async fn remove_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        observe(
            "remove_entity_members",
            caller,
            entity_id,
            self.inner.remove_entity_members(caller, entity_id, members),
        )
        .await
    }
}
