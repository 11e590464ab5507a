use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use strata_core::{AppError, AppResult, CallerIdentity, DomainId, Page, PageQuery, ResultExt};
use strata_domain::{
    EntityKind, EntityStatus, EntitySummary, Group, HierarchyEntry, HierarchyQuery, StatusCascade,
};

use crate::group_ports::{
    CreateGroupInput, GroupDependents, GroupListQuery, GroupRepository, StatusChange,
    UpdateGroupInput,
};
use crate::operations::{EntityDirectory, GroupOperations};
use crate::role_registry::RoleRegistry;

/// Group lifecycle and hierarchy service.
///
/// Authorization is applied by the layers wrapped around this service.
#[derive(Clone)]
pub struct GroupService {
    repository: Arc<dyn GroupRepository>,
    roles: RoleRegistry,
    dependents: Arc<dyn GroupDependents>,
    cascade: StatusCascade,
}

impl GroupService {
    /// Creates a group service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn GroupRepository>,
        roles: RoleRegistry,
        dependents: Arc<dyn GroupDependents>,
        cascade: StatusCascade,
    ) -> Self {
        Self {
            repository,
            roles,
            dependents,
            cascade,
        }
    }

    /// Returns the configured status cascade policy.
    #[must_use]
    pub fn cascade(&self) -> StatusCascade {
        self.cascade
    }

    async fn load_group(&self, domain_id: &DomainId, group_id: &str) -> AppResult<Group> {
        match self.repository.find_group(group_id).await? {
            Some(group) if !group.is_deleted() && group.domain_id() == domain_id => Ok(group),
            _ => Err(AppError::NotFound(format!(
                "group '{group_id}' was not found in domain '{domain_id}'"
            ))),
        }
    }

    async fn transition(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        status: EntityStatus,
    ) -> AppResult<Vec<String>> {
        let domain_id = caller.require_domain()?;
        let group = self.load_group(domain_id, group_id).await?;
        if group.status() == status {
            return Ok(Vec::new());
        }

        let changed = self
            .repository
            .change_status(StatusChange {
                group_id: group.id().to_owned(),
                status,
                cascade: self.cascade,
                updated_by: caller.subject().to_owned(),
                updated_at: Utc::now(),
            })
            .await
            .with_context(|| format!("failed to change status of group '{group_id}'"))?;

        info!(
            group_id,
            status = status.as_str(),
            changed = changed.len(),
            "group status changed"
        );
        Ok(changed)
    }

    async fn discard_unprovisioned(&self, group_id: &str, created_by: &str) {
        let result = self
            .repository
            .change_status(StatusChange {
                group_id: group_id.to_owned(),
                status: EntityStatus::Deleted,
                cascade: StatusCascade::TargetOnly,
                updated_by: created_by.to_owned(),
                updated_at: Utc::now(),
            })
            .await;

        if let Err(error) = result {
            warn!(group_id, error = %error, "failed to discard group after provisioning error");
        }
    }
}

#[async_trait]
impl GroupOperations for GroupService {
    async fn create_group(
        &self,
        caller: &CallerIdentity,
        input: CreateGroupInput,
    ) -> AppResult<Group> {
        let domain_id = caller.require_domain()?;
        if let Some(parent_id) = input.parent_id.as_deref() {
            self.load_group(domain_id, parent_id).await?;
        }

        let group = Group::new(
            Uuid::new_v4().to_string(),
            domain_id.clone(),
            input.name,
            input.description,
            caller.subject(),
            Utc::now(),
        )?;
        let group = self
            .repository
            .create_group(group)
            .await
            .context("failed to store group")?;

        if let Some(parent_id) = input.parent_id.as_deref()
            && let Err(error) = self
                .repository
                .assign_parent(parent_id, &[group.id().to_owned()])
                .await
        {
            self.discard_unprovisioned(group.id(), caller.subject()).await;
            return Err(error);
        }

        if let Err(error) = self
            .roles
            .provision_built_in_roles(group.id(), EntityKind::Group, caller.subject())
            .await
        {
            self.discard_unprovisioned(group.id(), caller.subject()).await;
            return Err(error);
        }

        info!(group_id = group.id(), domain_id = %domain_id, "group created");
        self.load_group(domain_id, group.id()).await
    }

    async fn view_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.load_group(caller.require_domain()?, group_id).await
    }

    async fn update_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        input: UpdateGroupInput,
    ) -> AppResult<Group> {
        let mut group = self.load_group(caller.require_domain()?, group_id).await?;
        group.apply_update(input.name, input.description, caller.subject(), Utc::now())?;
        self.repository.update_group(group).await
    }

    async fn list_groups(
        &self,
        caller: &CallerIdentity,
        query: GroupListQuery,
    ) -> AppResult<Page<Group>> {
        let domain_id = caller.require_domain()?;
        self.repository.list_groups(domain_id, &query).await
    }

    async fn enable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.transition(caller, group_id, EntityStatus::Enabled).await?;
        self.load_group(caller.require_domain()?, group_id).await
    }

    async fn disable_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<Group> {
        self.transition(caller, group_id, EntityStatus::Disabled).await?;
        self.load_group(caller.require_domain()?, group_id).await
    }

    async fn delete_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        let deleted = self
            .transition(caller, group_id, EntityStatus::Deleted)
            .await?;
        if deleted.is_empty() {
            return Ok(());
        }

        self.roles
            .remove_entity_roles(&deleted)
            .await
            .context("failed to remove roles of deleted groups")?;
        self.dependents
            .groups_deleted(&deleted)
            .await
            .context("failed to detach dependents of deleted groups")
    }

    async fn retrieve_group_hierarchy(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        query: HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        let group = self.load_group(caller.require_domain()?, group_id).await?;
        self.repository.retrieve_hierarchy(group.id(), &query).await
    }

    async fn add_parent_group(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        parent_id: &str,
    ) -> AppResult<()> {
        let domain_id = caller.require_domain()?;
        let group = self.load_group(domain_id, group_id).await?;
        let parent = self.load_group(domain_id, parent_id).await?;

        self.repository
            .assign_parent(parent.id(), &[group.id().to_owned()])
            .await
            .with_context(|| format!("failed to attach group '{group_id}' to '{parent_id}'"))?;
        info!(group_id, parent_id, "group attached to parent");
        Ok(())
    }

    async fn remove_parent_group(&self, caller: &CallerIdentity, group_id: &str) -> AppResult<()> {
        let group = self.load_group(caller.require_domain()?, group_id).await?;
        if group.parent_id().is_none() {
            return Ok(());
        }

        self.repository.detach_from_parent(group.id()).await
    }

    async fn add_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        if children.is_empty() {
            return Err(AppError::Validation(
                "at least one child group is required".to_owned(),
            ));
        }

        let parent = self.load_group(caller.require_domain()?, group_id).await?;
        let attached = self
            .repository
            .assign_parent(parent.id(), children)
            .await
            .with_context(|| format!("failed to attach children to group '{group_id}'"))?;
        info!(group_id, attached = attached.len(), "children attached");
        Ok(())
    }

    async fn remove_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        children: &[String],
    ) -> AppResult<()> {
        let parent = self.load_group(caller.require_domain()?, group_id).await?;
        self.repository
            .unassign_children(parent.id(), Some(children))
            .await?;
        Ok(())
    }

    async fn remove_all_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
    ) -> AppResult<()> {
        let parent = self.load_group(caller.require_domain()?, group_id).await?;
        self.repository.unassign_children(parent.id(), None).await?;
        Ok(())
    }

    async fn list_children_groups(
        &self,
        caller: &CallerIdentity,
        group_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Group>> {
        let parent = self.load_group(caller.require_domain()?, group_id).await?;
        self.repository.list_children(parent.id(), page).await
    }
}

#[async_trait]
impl EntityDirectory for GroupService {
    async fn retrieve_entity(&self, entity_id: &str) -> AppResult<EntitySummary> {
        match self.repository.find_group(entity_id).await? {
            Some(group) if !group.is_deleted() => Ok(EntitySummary::from(&group)),
            _ => Err(AppError::NotFound(format!("group '{entity_id}' was not found"))),
        }
    }
}
