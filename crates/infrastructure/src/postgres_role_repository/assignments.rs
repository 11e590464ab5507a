use super::*;

impl PostgresRoleRepository {
    pub(super) async fn role_add_actions_impl(
        &self,
        role_id: &str,
        actions: &[String],
    ) -> AppResult<()> {
        with_retry(self.retry, "add role actions", || async {
            let mut transaction = self.pool.begin().await?;
            ensure_role(&mut transaction, role_id).await?;
            insert_actions(&mut transaction, role_id, actions).await?;
            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn role_remove_actions_impl(
        &self,
        role_id: &str,
        actions: Option<&[String]>,
    ) -> AppResult<()> {
        with_retry(self.retry, "remove role actions", || async {
            let mut transaction = self.pool.begin().await?;
            ensure_role(&mut transaction, role_id).await?;
            sqlx::query(
                r#"
                DELETE FROM role_actions
                WHERE role_id = $1 AND ($2::text[] IS NULL OR action = ANY($2))
                "#,
            )
            .bind(role_id)
            .bind(actions)
            .execute(&mut *transaction)
            .await?;
            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn role_list_actions_impl(&self, role_id: &str) -> AppResult<Vec<String>> {
        with_retry(self.retry, "list role actions", || async {
            let mut connection = self.pool.acquire().await?;
            ensure_role(&mut connection, role_id).await?;
            let actions = sqlx::query_scalar::<_, String>(
                r#"
                SELECT action
                FROM role_actions
                WHERE role_id = $1
                ORDER BY action
                "#,
            )
            .bind(role_id)
            .fetch_all(&mut *connection)
            .await?;
            Ok::<_, StoreError>(actions)
        })
        .await
    }

    pub(super) async fn role_check_actions_exist_impl(
        &self,
        role_id: &str,
        actions: &[String],
    ) -> AppResult<bool> {
        with_retry(self.retry, "check role actions", || async {
            let mut connection = self.pool.acquire().await?;
            ensure_role(&mut connection, role_id).await?;
            let missing = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*)
                FROM UNNEST($2::text[]) AS requested(action)
                WHERE NOT EXISTS (
                    SELECT 1 FROM role_actions
                    WHERE role_id = $1 AND action = requested.action
                )
                "#,
            )
            .bind(role_id)
            .bind(actions)
            .fetch_one(&mut *connection)
            .await?;
            Ok::<_, StoreError>(missing == 0)
        })
        .await
    }

    pub(super) async fn role_add_members_impl(
        &self,
        role_id: &str,
        members: &[String],
    ) -> AppResult<()> {
        with_retry(self.retry, "add role members", || async {
            let mut transaction = self.pool.begin().await?;
            ensure_role(&mut transaction, role_id).await?;
            insert_members(&mut transaction, role_id, members).await?;
            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn role_remove_members_impl(
        &self,
        role_id: &str,
        members: Option<&[String]>,
    ) -> AppResult<()> {
        with_retry(self.retry, "remove role members", || async {
            let mut transaction = self.pool.begin().await?;
            ensure_role(&mut transaction, role_id).await?;
            sqlx::query(
                r#"
                DELETE FROM role_members
                WHERE role_id = $1 AND ($2::text[] IS NULL OR member_id = ANY($2))
                "#,
            )
            .bind(role_id)
            .bind(members)
            .execute(&mut *transaction)
            .await?;
            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn role_list_members_impl(
        &self,
        role_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<String>> {
        let (limit, offset) = page_bounds(page);

        with_retry(self.retry, "list role members", || async {
            let mut connection = self.pool.acquire().await?;
            ensure_role(&mut connection, role_id).await?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM role_members WHERE role_id = $1",
            )
            .bind(role_id)
            .fetch_one(&mut *connection)
            .await?;
            let members = sqlx::query_scalar::<_, String>(
                r#"
                SELECT member_id
                FROM role_members
                WHERE role_id = $1
                ORDER BY member_id
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(role_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *connection)
            .await?;
            Ok::<_, StoreError>(page_of(members, total, page))
        })
        .await
    }

    pub(super) async fn role_check_members_exist_impl(
        &self,
        role_id: &str,
        members: &[String],
    ) -> AppResult<bool> {
        with_retry(self.retry, "check role members", || async {
            let mut connection = self.pool.acquire().await?;
            ensure_role(&mut connection, role_id).await?;
            let missing = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*)
                FROM UNNEST($2::text[]) AS requested(member_id)
                WHERE NOT EXISTS (
                    SELECT 1 FROM role_members
                    WHERE role_id = $1 AND member_id = requested.member_id
                )
                "#,
            )
            .bind(role_id)
            .bind(members)
            .fetch_one(&mut *connection)
            .await?;
            Ok::<_, StoreError>(missing == 0)
        })
        .await
    }
}
