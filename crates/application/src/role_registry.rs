use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use strata_core::{AppError, AppResult, ErrorKind, Page, PageQuery, ResultExt};
use strata_domain::{BuiltInRole, EntityKind, EntityMember, ProvisionedRole, Role};

use crate::role_ports::{EntityRolesSnapshot, NewRole, RoleProvisionOutcome, RoleRepository};

/// Role lifecycle service enforcing per-entity role invariants.
#[derive(Clone)]
pub struct RoleRegistry {
    repository: Arc<dyn RoleRepository>,
}

impl RoleRegistry {
    /// Creates a registry over a role repository.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self { repository }
    }

    /// Provisions a batch of roles and reports the outcome of each item.
    ///
    /// Items failing validation are reported without reaching storage; the rest
    /// are stored one transaction per item.
    pub async fn add_roles(
        &self,
        created_by: &str,
        requests: Vec<NewRole>,
    ) -> AppResult<Vec<RoleProvisionOutcome>> {
        let now = Utc::now();
        let mut outcomes: Vec<Option<RoleProvisionOutcome>> = Vec::with_capacity(requests.len());
        let mut pending = Vec::new();
        let mut pending_slots = Vec::new();

        for request in requests {
            match provisioned_role(created_by, now, &request) {
                Ok(role) => {
                    pending_slots.push(outcomes.len());
                    outcomes.push(None);
                    pending.push(role);
                }
                Err(error) => outcomes.push(Some(RoleProvisionOutcome {
                    entity_id: request.entity_id,
                    name: request.name,
                    result: Err(error),
                })),
            }
        }

        if !pending.is_empty() {
            let stored = self
                .repository
                .add_roles(pending)
                .await
                .context("failed to store roles")?;
            for (slot, outcome) in pending_slots.into_iter().zip(stored) {
                if let Err(error) = &outcome.result {
                    warn!(
                        entity_id = %outcome.entity_id,
                        role = %outcome.name,
                        error = %error,
                        "role provisioning item rejected"
                    );
                }
                outcomes[slot] = Some(outcome);
            }
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Provisions one role and fails when it is rejected.
    pub async fn add_role(&self, created_by: &str, request: NewRole) -> AppResult<Role> {
        let mut outcomes = self.add_roles(created_by, vec![request]).await?;
        match outcomes.pop() {
            Some(outcome) => outcome.result,
            None => Err(AppError::Internal(
                "role provisioning returned no outcome".to_owned(),
            )),
        }
    }

    /// Provisions the built-in roles of a new entity with its creator as member.
    pub async fn provision_built_in_roles(
        &self,
        entity_id: &str,
        entity_kind: EntityKind,
        creator: &str,
    ) -> AppResult<Vec<Role>> {
        let requests = entity_kind
            .built_in_roles()
            .into_iter()
            .map(|built_in| NewRole {
                entity_id: entity_id.to_owned(),
                entity_kind,
                name: built_in.name().to_owned(),
                actions: built_in
                    .actions()
                    .iter()
                    .map(|action| (*action).to_owned())
                    .collect(),
                members: BTreeSet::from([creator.to_owned()]),
            })
            .collect();

        let mut roles = Vec::new();
        for outcome in self.add_roles(creator, requests).await? {
            roles.push(outcome.result?);
        }

        info!(entity_id, kind = entity_kind.as_str(), "provisioned built-in roles");
        Ok(roles)
    }

    /// Returns a role by identifier.
    pub async fn retrieve_role(&self, role_id: &str) -> AppResult<Role> {
        self.repository.retrieve_role(role_id).await
    }

    /// Returns a role owned by `entity_id`.
    pub async fn retrieve_entity_role(&self, entity_id: &str, role_id: &str) -> AppResult<Role> {
        self.repository
            .retrieve_entity_role(entity_id, role_id)
            .await
    }

    /// Renames a role.
    ///
    /// `expected_updated_at` is the last update stamp the caller observed; when
    /// omitted the stamp read here is used.
    pub async fn update_role(
        &self,
        entity_id: &str,
        role_id: &str,
        name: &str,
        updated_by: &str,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> AppResult<Role> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        ensure_not_built_in(&role, "renamed")?;
        if BuiltInRole::is_reserved(role.entity_kind(), name.trim()) {
            return Err(AppError::Conflict(format!(
                "role name '{}' is reserved",
                name.trim()
            )));
        }

        let expected = expected_updated_at.unwrap_or_else(|| role.updated_at());
        let renamed = role.renamed(name, updated_by, Utc::now())?;
        self.repository
            .update_role(renamed, expected)
            .await
            .with_context(|| format!("failed to rename role '{role_id}'"))
    }

    /// Removes roles with their actions and members; unknown ids are ignored.
    pub async fn remove_roles(&self, role_ids: &[String]) -> AppResult<()> {
        for role_id in role_ids {
            match self.repository.retrieve_role(role_id).await {
                Ok(role) => ensure_not_built_in(&role, "removed")?,
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => return Err(error),
            }
        }

        self.repository
            .remove_roles(role_ids)
            .await
            .context("failed to remove roles")
    }

    /// Removes one role owned by `entity_id`.
    pub async fn remove_entity_role(&self, entity_id: &str, role_id: &str) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        ensure_not_built_in(&role, "removed")?;
        self.repository.remove_roles(&[role.id().to_owned()]).await
    }

    /// Adds actions from the owning kind's catalog and returns the resulting set.
    pub async fn role_add_actions(
        &self,
        entity_id: &str,
        role_id: &str,
        actions: &[String],
    ) -> AppResult<Vec<String>> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        require_non_empty(actions, "actions")?;
        role.entity_kind().validate_actions(actions)?;

        self.repository.role_add_actions(role.id(), actions).await?;
        self.repository.role_list_actions(role.id()).await
    }

    /// Lists the actions of a role.
    pub async fn role_list_actions(
        &self,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Vec<String>> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_list_actions(role.id()).await
    }

    /// Returns whether the role holds every listed action.
    pub async fn role_check_actions_exist(
        &self,
        entity_id: &str,
        role_id: &str,
        actions: &[String],
    ) -> AppResult<bool> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository
            .role_check_actions_exist(role.id(), actions)
            .await
    }

    /// Removes the listed actions from a role.
    pub async fn role_remove_actions(
        &self,
        entity_id: &str,
        role_id: &str,
        actions: &[String],
    ) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_remove_actions(role.id(), actions).await
    }

    /// Removes every action from a role.
    pub async fn role_remove_all_actions(&self, entity_id: &str, role_id: &str) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_remove_all_actions(role.id()).await
    }

    /// Adds members to a role.
    pub async fn role_add_members(
        &self,
        entity_id: &str,
        role_id: &str,
        members: &[String],
    ) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        require_non_empty(members, "members")?;
        self.repository.role_add_members(role.id(), members).await
    }

    /// Lists the members of a role.
    pub async fn role_list_members(
        &self,
        entity_id: &str,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_list_members(role.id(), page).await
    }

    /// Returns whether every listed member holds the role.
    pub async fn role_check_members_exist(
        &self,
        entity_id: &str,
        role_id: &str,
        members: &[String],
    ) -> AppResult<bool> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository
            .role_check_members_exist(role.id(), members)
            .await
    }

    /// Removes the listed members from a role.
    pub async fn role_remove_members(
        &self,
        entity_id: &str,
        role_id: &str,
        members: &[String],
    ) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_remove_members(role.id(), members).await
    }

    /// Removes every member from a role.
    pub async fn role_remove_all_members(&self, entity_id: &str, role_id: &str) -> AppResult<()> {
        let role = self.retrieve_entity_role(entity_id, role_id).await?;
        self.repository.role_remove_all_members(role.id()).await
    }

    /// Lists the roles of an entity.
    pub async fn retrieve_all_roles(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>> {
        self.repository.retrieve_all_roles(entity_id, page).await
    }

    /// Lists members of an entity with their roles and actions.
    pub async fn list_entity_members(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        self.repository.list_entity_members(entity_id, page).await
    }

    /// Removes members from every role of one entity.
    pub async fn remove_entity_members(
        &self,
        entity_id: &str,
        members: &[String],
    ) -> AppResult<()> {
        self.repository
            .remove_entity_members(entity_id, members)
            .await
    }

    /// Removes a member from every role of every entity.
    pub async fn remove_member_from_all_roles(&self, member_id: &str) -> AppResult<()> {
        if member_id.trim().is_empty() {
            return Err(AppError::Validation("member id is required".to_owned()));
        }

        self.repository.remove_member_from_all_roles(member_id).await?;
        info!(member_id, "removed member from all roles");
        Ok(())
    }

    /// Removes every role of the listed entities, built-in roles included.
    pub async fn remove_entity_roles(&self, entity_ids: &[String]) -> AppResult<()> {
        if entity_ids.is_empty() {
            return Ok(());
        }

        self.repository.remove_entity_roles(entity_ids).await
    }

    /// Loads roles, action grants and member links of the listed entities.
    pub async fn retrieve_entities_roles_actions_members(
        &self,
        entity_ids: &[String],
    ) -> AppResult<EntityRolesSnapshot> {
        self.repository
            .retrieve_entities_roles_actions_members(entity_ids)
            .await
    }

    /// Returns the action catalog of an entity kind.
    #[must_use]
    pub fn list_available_actions(&self, entity_kind: EntityKind) -> Vec<String> {
        entity_kind
            .available_actions()
            .iter()
            .map(|action| (*action).to_owned())
            .collect()
    }
}

fn provisioned_role(
    created_by: &str,
    now: DateTime<Utc>,
    request: &NewRole,
) -> AppResult<ProvisionedRole> {
    let actions: Vec<&String> = request.actions.iter().collect();
    request.entity_kind.validate_actions(&actions)?;

    let role = Role::new(
        Uuid::new_v4().to_string(),
        request.entity_id.as_str(),
        request.entity_kind,
        request.name.as_str(),
        created_by,
        now,
    )?;

    Ok(ProvisionedRole {
        role,
        actions: request.actions.clone(),
        members: request.members.clone(),
    })
}

fn ensure_not_built_in(role: &Role, verb: &str) -> AppResult<()> {
    if let Some(built_in) = role.built_in() {
        return Err(AppError::Conflict(format!(
            "built-in role '{}' cannot be {verb}",
            built_in.name()
        )));
    }

    Ok(())
}

fn require_non_empty(values: &[String], field: &str) -> AppResult<()> {
    if values.is_empty() || values.iter().any(|value| value.trim().is_empty()) {
        return Err(AppError::Validation(format!(
            "{field} must be a non-empty list of non-empty values"
        )));
    }

    Ok(())
}
