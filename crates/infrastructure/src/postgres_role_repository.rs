//! PostgreSQL-backed role repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use strata_application::{EntityRolesSnapshot, RoleProvisionOutcome, RoleRepository};
use strata_core::{AppError, AppResult, Page, PageQuery};
use strata_domain::{EntityKind, EntityMember, ProvisionedRole, Role};

use crate::postgres_support::{
    DatabaseRetryPolicy, StoreError, StoreResult, page_bounds, page_of, with_retry,
};

/// PostgreSQL implementation of the role repository port.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
    retry: DatabaseRetryPolicy,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: DatabaseRetryPolicy::default(),
        }
    }

    /// Replaces the retry policy for transient failures.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: DatabaseRetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: String,
    entity_id: String,
    entity_kind: String,
    name: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        Role::restore(
            self.id,
            self.entity_id,
            EntityKind::from_str(self.entity_kind.as_str())?,
            self.name,
            self.created_by,
            self.created_at,
            self.updated_by,
            self.updated_at,
        )
    }
}

async fn ensure_role(connection: &mut PgConnection, role_id: &str) -> StoreResult<()> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(&mut *connection)
            .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("role '{role_id}' was not found")).into())
    }
}

async fn insert_actions(
    connection: &mut PgConnection,
    role_id: &str,
    actions: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO role_actions (role_id, action)
        SELECT $1, UNNEST($2::text[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(actions)
    .execute(&mut *connection)
    .await?;
    Ok(())
}

async fn insert_members(
    connection: &mut PgConnection,
    role_id: &str,
    members: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO role_members (role_id, member_id)
        SELECT $1, UNNEST($2::text[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(members)
    .execute(&mut *connection)
    .await?;
    Ok(())
}

mod assignments;
mod definitions;
mod entities;

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn add_roles(&self, roles: Vec<ProvisionedRole>) -> AppResult<Vec<RoleProvisionOutcome>> {
        self.add_roles_impl(roles).await
    }

    async fn retrieve_role(&self, role_id: &str) -> AppResult<Role> {
        self.retrieve_role_impl(role_id).await
    }

    async fn retrieve_entity_role(&self, entity_id: &str, role_id: &str) -> AppResult<Role> {
        self.retrieve_entity_role_impl(entity_id, role_id).await
    }

    async fn update_role(&self, role: Role, expected_updated_at: DateTime<Utc>) -> AppResult<Role> {
        self.update_role_impl(role, expected_updated_at).await
    }

    async fn remove_roles(&self, role_ids: &[String]) -> AppResult<()> {
        self.remove_roles_impl(role_ids).await
    }

    async fn role_add_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()> {
        self.role_add_actions_impl(role_id, actions).await
    }

    async fn role_remove_actions(&self, role_id: &str, actions: &[String]) -> AppResult<()> {
        self.role_remove_actions_impl(role_id, Some(actions)).await
    }

    async fn role_remove_all_actions(&self, role_id: &str) -> AppResult<()> {
        self.role_remove_actions_impl(role_id, None).await
    }

    async fn role_list_actions(&self, role_id: &str) -> AppResult<Vec<String>> {
        self.role_list_actions_impl(role_id).await
    }

    async fn role_check_actions_exist(&self, role_id: &str, actions: &[String]) -> AppResult<bool> {
        self.role_check_actions_exist_impl(role_id, actions).await
    }

    async fn role_add_members(&self, role_id: &str, members: &[String]) -> AppResult<()> {
        self.role_add_members_impl(role_id, members).await
    }

    async fn role_remove_members(&self, role_id: &str, members: &[String]) -> AppResult<()> {
        self.role_remove_members_impl(role_id, Some(members)).await
    }

    async fn role_remove_all_members(&self, role_id: &str) -> AppResult<()> {
        self.role_remove_members_impl(role_id, None).await
    }

    async fn role_list_members(&self, role_id: &str, page: PageQuery) -> AppResult<Page<String>> {
        self.role_list_members_impl(role_id, page).await
    }

    async fn role_check_members_exist(&self, role_id: &str, members: &[String]) -> AppResult<bool> {
        self.role_check_members_exist_impl(role_id, members).await
    }

    async fn retrieve_all_roles(&self, entity_id: &str, page: PageQuery) -> AppResult<Page<Role>> {
        self.retrieve_all_roles_impl(entity_id, page).await
    }

    async fn list_entity_members(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        self.list_entity_members_impl(entity_id, page).await
    }

    async fn remove_entity_members(&self, entity_id: &str, members: &[String]) -> AppResult<()> {
        self.remove_entity_members_impl(entity_id, members).await
    }

    async fn remove_member_from_all_roles(&self, member_id: &str) -> AppResult<()> {
        self.remove_member_from_all_roles_impl(member_id).await
    }

    async fn remove_entity_roles(&self, entity_ids: &[String]) -> AppResult<()> {
        self.remove_entity_roles_impl(entity_ids).await
    }

    async fn retrieve_entities_roles_actions_members(
        &self,
        entity_ids: &[String],
    ) -> AppResult<EntityRolesSnapshot> {
        self.retrieve_entities_roles_actions_members_impl(entity_ids)
            .await
    }
}

#[cfg(test)]
mod tests;
