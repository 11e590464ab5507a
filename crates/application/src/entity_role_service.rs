use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use strata_core::{AppError, AppResult, CallerIdentity, Page, PageQuery};
use strata_domain::{EntityKind, EntityMember, Role};

use crate::operations::{EntityDirectory, EntityRoleOperations, RoleInput};
use crate::role_ports::NewRole;
use crate::role_registry::RoleRegistry;

/// Role management for the entities of one kind, scoped to the caller's domain.
#[derive(Clone)]
pub struct EntityRoleService {
    entity_kind: EntityKind,
    registry: RoleRegistry,
    directory: Arc<dyn EntityDirectory>,
}

impl EntityRoleService {
    /// Creates a role management service for one entity kind.
    #[must_use]
    pub fn new(
        entity_kind: EntityKind,
        registry: RoleRegistry,
        directory: Arc<dyn EntityDirectory>,
    ) -> Self {
        Self {
            entity_kind,
            registry,
            directory,
        }
    }

    async fn ensure_entity(&self, caller: &CallerIdentity, entity_id: &str) -> AppResult<()> {
        let domain_id = caller.require_domain()?;
        let entity = self.directory.retrieve_entity(entity_id).await?;
        if &entity.domain_id != domain_id {
            return Err(AppError::NotFound(format!(
                "{} '{entity_id}' was not found in domain '{domain_id}'",
                self.entity_kind.as_str()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl EntityRoleOperations for EntityRoleService {
    fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    async fn add_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        input: RoleInput,
    ) -> AppResult<Role> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .add_role(
                caller.subject(),
                NewRole {
                    entity_id: entity_id.to_owned(),
                    entity_kind: self.entity_kind,
                    name: input.name,
                    actions: input.actions.into_iter().collect::<BTreeSet<_>>(),
                    members: input.members.into_iter().collect::<BTreeSet<_>>(),
                },
            )
            .await
    }

    async fn retrieve_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Role> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry.retrieve_entity_role(entity_id, role_id).await
    }

    async fn retrieve_all_roles(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry.retrieve_all_roles(entity_id, page).await
    }

    async fn update_role_name(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        name: &str,
    ) -> AppResult<Role> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .update_role(entity_id, role_id, name, caller.subject(), None)
            .await
    }

    async fn remove_role(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry.remove_entity_role(entity_id, role_id).await
    }

    async fn list_available_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
    ) -> AppResult<Vec<String>> {
        self.ensure_entity(caller, entity_id).await?;
        Ok(self.registry.list_available_actions(self.entity_kind))
    }

    async fn role_add_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<Vec<String>> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_add_actions(entity_id, role_id, &actions)
            .await
    }

    async fn role_list_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Vec<String>> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry.role_list_actions(entity_id, role_id).await
    }

    async fn role_check_actions_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<bool> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_check_actions_exist(entity_id, role_id, &actions)
            .await
    }

    async fn role_remove_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        actions: Vec<String>,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_remove_actions(entity_id, role_id, &actions)
            .await
    }

    async fn role_remove_all_actions(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_remove_all_actions(entity_id, role_id)
            .await
    }

    async fn role_add_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_add_members(entity_id, role_id, &members)
            .await
    }

    async fn role_list_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_list_members(entity_id, role_id, page)
            .await
    }

    async fn role_check_members_exist(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<bool> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_check_members_exist(entity_id, role_id, &members)
            .await
    }

    async fn role_remove_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_remove_members(entity_id, role_id, &members)
            .await
    }

    async fn role_remove_all_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .role_remove_all_members(entity_id, role_id)
            .await
    }

    async fn list_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry.list_entity_members(entity_id, page).await
    }

    async fn remove_entity_members(
        &self,
        caller: &CallerIdentity,
        entity_id: &str,
        members: Vec<String>,
    ) -> AppResult<()> {
        self.ensure_entity(caller, entity_id).await?;
        self.registry
            .remove_entity_members(entity_id, &members)
            .await
    }
}
