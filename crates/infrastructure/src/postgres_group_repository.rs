//! PostgreSQL-backed group repository.
//!
//! Tree mutations take a transaction-scoped advisory lock on the owning domain,
//! so concurrent attaches in one domain cannot combine into a cycle.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use strata_application::{GroupListQuery, GroupRepository, StatusChange};
use strata_core::{AppError, AppResult, DomainId, Page, PageQuery};
use strata_domain::{EntityStatus, Group, HierarchyEntry, HierarchyQuery};

use crate::postgres_support::{
    DatabaseRetryPolicy, StoreError, StoreResult, page_bounds, page_of, with_retry,
};

/// PostgreSQL implementation of the group repository port.
#[derive(Clone)]
pub struct PostgresGroupRepository {
    pool: PgPool,
    retry: DatabaseRetryPolicy,
}

impl PostgresGroupRepository {
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
struct GroupRow {
    id: String,
    domain_id: String,
    parent_id: Option<String>,
    name: String,
    description: String,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self) -> AppResult<Group> {
        Group::restore(
            self.id,
            DomainId::new(self.domain_id)?,
            self.parent_id,
            self.name,
            self.description,
            EntityStatus::from_str(self.status.as_str())?,
            self.created_by,
            self.created_at,
            self.updated_by,
            self.updated_at,
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HierarchyRow {
    #[sqlx(flatten)]
    group: GroupRow,
    level: i32,
}

impl HierarchyRow {
    fn into_entry(self) -> AppResult<HierarchyEntry> {
        Ok(HierarchyEntry {
            group: self.group.into_group()?,
            level: u32::try_from(self.level).map_err(|error| {
                AppError::Internal(format!("invalid hierarchy level {}: {error}", self.level))
            })?,
        })
    }
}

fn into_groups(rows: Vec<GroupRow>) -> AppResult<Vec<Group>> {
    rows.into_iter().map(GroupRow::into_group).collect()
}

async fn fetch_group(connection: &mut PgConnection, group_id: &str) -> StoreResult<Group> {
    let row = sqlx::query_as::<_, GroupRow>(
        r#"
        SELECT id, domain_id, parent_id, name, description, status,
               created_by, created_at, updated_by, updated_at
        FROM groups
        WHERE id = $1
        "#,
    )
    .bind(group_id)
    .fetch_optional(&mut *connection)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' was not found")))?;

    Ok(row.into_group()?)
}

async fn lock_domain(connection: &mut PgConnection, domain_id: &DomainId) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(domain_id.as_str())
        .execute(&mut *connection)
        .await?;
    Ok(())
}

async fn ancestor_rows(
    connection: &mut PgConnection,
    group_id: &str,
    max_level: Option<i32>,
) -> Result<Vec<HierarchyRow>, sqlx::Error> {
    sqlx::query_as::<_, HierarchyRow>(
        r#"
        WITH RECURSIVE ancestors AS (
            SELECT parent.id, parent.domain_id, parent.parent_id, parent.name,
                   parent.description, parent.status, parent.created_by, parent.created_at,
                   parent.updated_by, parent.updated_at,
                   1 AS level, ARRAY[child.id, parent.id] AS path
            FROM groups child
            JOIN groups parent ON parent.id = child.parent_id
            WHERE child.id = $1
            UNION ALL
            SELECT parent.id, parent.domain_id, parent.parent_id, parent.name,
                   parent.description, parent.status, parent.created_by, parent.created_at,
                   parent.updated_by, parent.updated_at,
                   ancestors.level + 1, ancestors.path || parent.id
            FROM ancestors
            JOIN groups parent ON parent.id = ancestors.parent_id
            WHERE parent.id <> ALL(ancestors.path)
              AND ($2::int IS NULL OR ancestors.level < $2)
        )
        SELECT id, domain_id, parent_id, name, description, status,
               created_by, created_at, updated_by, updated_at, level
        FROM ancestors
        ORDER BY level
        "#,
    )
    .bind(group_id)
    .bind(max_level)
    .fetch_all(&mut *connection)
    .await
}

async fn descendant_rows(
    connection: &mut PgConnection,
    group_id: &str,
    max_level: Option<i32>,
) -> Result<Vec<HierarchyRow>, sqlx::Error> {
    sqlx::query_as::<_, HierarchyRow>(
        r#"
        WITH RECURSIVE descendants AS (
            SELECT child.id, child.domain_id, child.parent_id, child.name,
                   child.description, child.status, child.created_by, child.created_at,
                   child.updated_by, child.updated_at,
                   1 AS level, ARRAY[$1::text, child.id] AS path
            FROM groups child
            WHERE child.parent_id = $1 AND child.status <> 'deleted'
            UNION ALL
            SELECT child.id, child.domain_id, child.parent_id, child.name,
                   child.description, child.status, child.created_by, child.created_at,
                   child.updated_by, child.updated_at,
                   descendants.level + 1, descendants.path || child.id
            FROM descendants
            JOIN groups child ON child.parent_id = descendants.id
            WHERE child.status <> 'deleted'
              AND child.id <> ALL(descendants.path)
              AND ($2::int IS NULL OR descendants.level < $2)
        )
        SELECT id, domain_id, parent_id, name, description, status,
               created_by, created_at, updated_by, updated_at, level
        FROM descendants
        ORDER BY level, name, id
        "#,
    )
    .bind(group_id)
    .bind(max_level)
    .fetch_all(&mut *connection)
    .await
}

fn max_level(query: &HierarchyQuery) -> Option<i32> {
    query
        .max_level()
        .map(|level| i32::try_from(level).unwrap_or(i32::MAX))
}

mod lookup;
mod tree;

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn create_group(&self, group: Group) -> AppResult<Group> {
        self.create_group_impl(group).await
    }

    async fn find_group(&self, group_id: &str) -> AppResult<Option<Group>> {
        self.find_group_impl(group_id).await
    }

    async fn update_group(&self, group: Group) -> AppResult<Group> {
        self.update_group_impl(group).await
    }

    async fn list_groups(
        &self,
        domain_id: &DomainId,
        query: &GroupListQuery,
    ) -> AppResult<Page<Group>> {
        self.list_groups_impl(domain_id, query).await
    }

    async fn list_children(&self, parent_id: &str, page: PageQuery) -> AppResult<Page<Group>> {
        self.list_children_impl(parent_id, page).await
    }

    async fn retrieve_hierarchy(
        &self,
        group_id: &str,
        query: &HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        self.retrieve_hierarchy_impl(group_id, query).await
    }

    async fn assign_parent(&self, parent_id: &str, child_ids: &[String]) -> AppResult<Vec<String>> {
        self.assign_parent_impl(parent_id, child_ids).await
    }

    async fn unassign_children(
        &self,
        parent_id: &str,
        child_ids: Option<&[String]>,
    ) -> AppResult<Vec<String>> {
        self.unassign_children_impl(parent_id, child_ids).await
    }

    async fn detach_from_parent(&self, group_id: &str) -> AppResult<()> {
        self.detach_from_parent_impl(group_id).await
    }

    async fn change_status(&self, change: StatusChange) -> AppResult<Vec<String>> {
        self.change_status_impl(change).await
    }
}

#[cfg(test)]
mod tests;
