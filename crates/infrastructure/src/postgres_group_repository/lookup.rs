use strata_domain::HierarchyDirection;

use super::*;

impl PostgresGroupRepository {
    pub(super) async fn create_group_impl(&self, group: Group) -> AppResult<Group> {
        with_retry(self.retry, "create group", || async {
            sqlx::query(
                r#"
                INSERT INTO groups (
                    id, domain_id, parent_id, name, description, status,
                    created_by, created_at, updated_by, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(group.id())
            .bind(group.domain_id().as_str())
            .bind(group.parent_id())
            .bind(group.name())
            .bind(group.description())
            .bind(group.status().as_str())
            .bind(group.created_by())
            .bind(group.created_at())
            .bind(group.updated_by())
            .bind(group.updated_at())
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        Ok(group)
    }

    pub(super) async fn find_group_impl(&self, group_id: &str) -> AppResult<Option<Group>> {
        let row = with_retry(self.retry, "find group", || async {
            let row = sqlx::query_as::<_, GroupRow>(
                r#"
                SELECT id, domain_id, parent_id, name, description, status,
                       created_by, created_at, updated_by, updated_at
                FROM groups
                WHERE id = $1
                "#,
            )
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await?;

        row.map(GroupRow::into_group).transpose()
    }

    pub(super) async fn update_group_impl(&self, group: Group) -> AppResult<Group> {
        with_retry(self.retry, "update group", || async {
            let updated = sqlx::query(
                r#"
                UPDATE groups
                SET name = $2, description = $3, updated_by = $4, updated_at = $5
                WHERE id = $1
                "#,
            )
            .bind(group.id())
            .bind(group.name())
            .bind(group.description())
            .bind(group.updated_by())
            .bind(group.updated_at())
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::from(AppError::NotFound(format!(
                    "group '{}' was not found",
                    group.id()
                ))));
            }
            Ok::<_, StoreError>(())
        })
        .await?;

        Ok(group)
    }

    pub(super) async fn list_groups_impl(
        &self,
        domain_id: &DomainId,
        query: &GroupListQuery,
    ) -> AppResult<Page<Group>> {
        let (limit, offset) = page_bounds(query.page);
        let name = query.name.as_deref();
        let status = query.status.map(|status| status.as_str());

        let (rows, total) = with_retry(self.retry, "list groups", || async {
            let total = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*)
                FROM groups
                WHERE domain_id = $1
                  AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
                  AND CASE WHEN $3::text IS NULL THEN status <> 'deleted' ELSE status = $3 END
                "#,
            )
            .bind(domain_id.as_str())
            .bind(name)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
            let rows = sqlx::query_as::<_, GroupRow>(
                r#"
                SELECT id, domain_id, parent_id, name, description, status,
                       created_by, created_at, updated_by, updated_at
                FROM groups
                WHERE domain_id = $1
                  AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
                  AND CASE WHEN $3::text IS NULL THEN status <> 'deleted' ELSE status = $3 END
                ORDER BY name, id
                LIMIT $4 OFFSET $5
                "#,
            )
            .bind(domain_id.as_str())
            .bind(name)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, StoreError>((rows, total))
        })
        .await?;

        Ok(page_of(into_groups(rows)?, total, query.page))
    }

    pub(super) async fn list_children_impl(
        &self,
        parent_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Group>> {
        let (limit, offset) = page_bounds(page);

        let (rows, total) = with_retry(self.retry, "list child groups", || async {
            let mut connection = self.pool.acquire().await?;
            fetch_group(&mut connection, parent_id).await?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM groups WHERE parent_id = $1 AND status <> 'deleted'",
            )
            .bind(parent_id)
            .fetch_one(&mut *connection)
            .await?;
            let rows = sqlx::query_as::<_, GroupRow>(
                r#"
                SELECT id, domain_id, parent_id, name, description, status,
                       created_by, created_at, updated_by, updated_at
                FROM groups
                WHERE parent_id = $1 AND status <> 'deleted'
                ORDER BY name, id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(parent_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *connection)
            .await?;
            Ok::<_, StoreError>((rows, total))
        })
        .await?;

        Ok(page_of(into_groups(rows)?, total, page))
    }

    pub(super) async fn retrieve_hierarchy_impl(
        &self,
        group_id: &str,
        query: &HierarchyQuery,
    ) -> AppResult<Vec<HierarchyEntry>> {
        let rows = with_retry(self.retry, "retrieve group hierarchy", || async {
            let mut connection = self.pool.acquire().await?;
            fetch_group(&mut connection, group_id).await?;
            let rows = match query.direction() {
                HierarchyDirection::Up => {
                    ancestor_rows(&mut connection, group_id, max_level(query)).await?
                }
                HierarchyDirection::Down => {
                    descendant_rows(&mut connection, group_id, max_level(query)).await?
                }
            };
            Ok::<_, StoreError>(rows)
        })
        .await?;

        rows.into_iter().map(HierarchyRow::into_entry).collect()
    }
}
