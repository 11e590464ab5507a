use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use strata_application::{EntityRolesSnapshot, RoleProvisionOutcome, RoleRepository};
use strata_core::{AppError, AppResult, Page, PageQuery};
use strata_domain::{
    EntityActionRole, EntityMember, EntityMemberRole, MemberRoleActions, ProvisionedRole, Role,
};

#[derive(Debug, Default)]
struct RoleState {
    roles: HashMap<String, Role>,
    actions: HashMap<String, BTreeSet<String>>,
    members: HashMap<String, BTreeSet<String>>,
}

impl RoleState {
    fn role(&self, role_id: &str) -> AppResult<&Role> {
        self.roles
            .get(role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }

    fn name_taken(&self, entity_id: &str, name: &str, except_role_id: Option<&str>) -> bool {
        self.roles.values().any(|role| {
            role.entity_id() == entity_id
                && role.name() == name
                && except_role_id.is_none_or(|except| role.id() != except)
        })
    }

    fn entity_roles(&self, entity_id: &str) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self
            .roles
            .values()
            .filter(|role| role.entity_id() == entity_id)
            .collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        roles
    }

    fn remove_role(&mut self, role_id: &str) {
        self.roles.remove(role_id);
        self.actions.remove(role_id);
        self.members.remove(role_id);
    }
}

/// In-memory role repository; every call is serialized by one lock.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    state: RwLock<RoleState>,
}

impl InMemoryRoleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn add_roles(&self, roles: Vec<ProvisionedRole>) -> AppResult<Vec<RoleProvisionOutcome>> {
        let mut state = self.state.write().await;
        let mut outcomes = Vec::with_capacity(roles.len());

        for provisioned in roles {
            let role = provisioned.role;
            let result = if state.roles.contains_key(role.id()) {
                Err(AppError::Conflict(format!(
                    "role '{}' already exists",
                    role.id()
                )))
            } else if state.name_taken(role.entity_id(), role.name(), None) {
                Err(AppError::Conflict(format!(
                    "role '{}' already exists for entity '{}'",
                    role.name(),
                    role.entity_id()
                )))
            } else {
                state
                    .actions
                    .insert(role.id().to_owned(), provisioned.actions);
                state
                    .members
                    .insert(role.id().to_owned(), provisioned.members);
                state.roles.insert(role.id().to_owned(), role.clone());
                Ok(role.clone())
            };

            outcomes.push(RoleProvisionOutcome {
                entity_id: role.entity_id().to_owned(),
                name: role.name().to_owned(),
                result,
            });
        }

        Ok(outcomes)
    }

    async fn retrieve_role(&self, role_id: &str) -> AppResult<Role> {
        self.state.read().await.role(role_id).cloned()
    }

    async fn retrieve_entity_role(&self, entity_id: &str, role_id: &str) -> AppResult<Role> {
        let state = self.state.read().await;
        match state.roles.get(role_id) {
            Some(role) if role.entity_id() == entity_id => Ok(role.clone()),
            _ => Err(AppError::NotFound(format!(
                "role '{role_id}' was not found for entity '{entity_id}'"
            ))),
        }
    }

    async fn update_role(&self, role: Role, expected_updated_at: DateTime<Utc>) -> AppResult<Role> {
        let mut state = self.state.write().await;
        let stored = state.role(role.id())?;
        if stored.updated_at() != expected_updated_at {
            return Err(AppError::Conflict(format!(
                "role '{}' was modified concurrently",
                role.id()
            )));
        }
        if state.name_taken(role.entity_id(), role.name(), Some(role.id())) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists for entity '{}'",
                role.name(),
                role.entity_id()
            )));
        }

        state.roles.insert(role.id().to_owned(), role.clone());
        Ok(role)
    }

    async fn remove_roles(&self, role_ids: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        for role_id in role_ids {
            state.remove_role(role_id);
        }
        Ok(())
    }

    async fn role_add_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        state
            .actions
            .entry(role_id.to_owned())
            .or_default()
            .extend(actions.iter().cloned());
        Ok(())
    }

    async fn role_remove_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        if let Some(stored) = state.actions.get_mut(role_id) {
            stored.retain(|action| !actions.contains(action));
        }
        Ok(())
    }

    async fn role_remove_all_actions(&self, role_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        state.actions.remove(role_id);
        Ok(())
    }

    async fn role_list_actions(&self, role_id: &str) -> AppResult<Vec<String>> {
        let state = self.state.read().await;
        state.role(role_id)?;
        Ok(state
            .actions
            .get(role_id)
            .map(|actions| actions.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn role_check_actions_exist(&self, role_id: &str, actions: &[String]) -> AppResult<bool> {
        let state = self.state.read().await;
        state.role(role_id)?;
        let stored = state.actions.get(role_id);
        Ok(actions
            .iter()
            .all(|action| stored.is_some_and(|stored| stored.contains(action))))
    }

    async fn role_add_members(&self, role_id: &str, members: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        state
            .members
            .entry(role_id.to_owned())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn role_remove_members(&self, role_id: &str, members: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        if let Some(stored) = state.members.get_mut(role_id) {
            stored.retain(|member| !members.contains(member));
        }
        Ok(())
    }

    async fn role_remove_all_members(&self, role_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        state.members.remove(role_id);
        Ok(())
    }

    async fn role_list_members(&self, role_id: &str, page: PageQuery) -> AppResult<Page<String>> {
        let state = self.state.read().await;
        state.role(role_id)?;
        let members: Vec<String> = state
            .members
            .get(role_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        Ok(page.paginate(members))
    }

    async fn role_check_members_exist(&self, role_id: &str, members: &[String]) -> AppResult<bool> {
        let state = self.state.read().await;
        state.role(role_id)?;
        let stored = state.members.get(role_id);
        Ok(members
            .iter()
            .all(|member| stored.is_some_and(|stored| stored.contains(member))))
    }

    async fn retrieve_all_roles(&self, entity_id: &str, page: PageQuery) -> AppResult<Page<Role>> {
        let state = self.state.read().await;
        let roles = state.entity_roles(entity_id).into_iter().cloned().collect();
        Ok(page.paginate(roles))
    }

    async fn list_entity_members(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        let state = self.state.read().await;
        let mut members: BTreeMap<String, Vec<MemberRoleActions>> = BTreeMap::new();

        for role in state.entity_roles(entity_id) {
            let actions = state.actions.get(role.id()).cloned().unwrap_or_default();
            for member_id in state.members.get(role.id()).into_iter().flatten() {
                members
                    .entry(member_id.clone())
                    .or_default()
                    .push(MemberRoleActions {
                        role_id: role.id().to_owned(),
                        role_name: role.name().to_owned(),
                        actions: actions.clone(),
                    });
            }
        }

        let members = members
            .into_iter()
            .map(|(member_id, roles)| EntityMember { member_id, roles })
            .collect();
        Ok(page.paginate(members))
    }

    async fn remove_entity_members(&self, entity_id: &str, members: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        let role_ids: Vec<String> = state
            .entity_roles(entity_id)
            .into_iter()
            .map(|role| role.id().to_owned())
            .collect();

        for role_id in role_ids {
            if let Some(stored) = state.members.get_mut(&role_id) {
                stored.retain(|member| !members.contains(member));
            }
        }
        Ok(())
    }

    async fn remove_member_from_all_roles(&self, member_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        for members in state.members.values_mut() {
            members.remove(member_id);
        }
        Ok(())
    }

    async fn remove_entity_roles(&self, entity_ids: &[String]) -> AppResult<()> {
        let mut state = self.state.write().await;
        let role_ids: Vec<String> = state
            .roles
            .values()
            .filter(|role| entity_ids.iter().any(|entity_id| entity_id == role.entity_id()))
            .map(|role| role.id().to_owned())
            .collect();

        for role_id in role_ids {
            state.remove_role(&role_id);
        }
        Ok(())
    }

    async fn retrieve_entities_roles_actions_members(
        &self,
        entity_ids: &[String],
    ) -> AppResult<EntityRolesSnapshot> {
        let state = self.state.read().await;
        let mut snapshot = EntityRolesSnapshot::default();

        for entity_id in entity_ids {
            for role in state.entity_roles(entity_id) {
                for action in state.actions.get(role.id()).into_iter().flatten() {
                    snapshot.action_roles.push(EntityActionRole {
                        entity_id: entity_id.clone(),
                        action: action.clone(),
                        role_id: role.id().to_owned(),
                    });
                }
                for member_id in state.members.get(role.id()).into_iter().flatten() {
                    snapshot.member_roles.push(EntityMemberRole {
                        entity_id: entity_id.clone(),
                        member_id: member_id.clone(),
                        role_id: role.id().to_owned(),
                    });
                }
                snapshot.roles.push(role.clone());
            }
        }

        Ok(snapshot)
    }
}
