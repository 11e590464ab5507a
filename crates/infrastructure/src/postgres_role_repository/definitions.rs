use super::*;

impl PostgresRoleRepository {
    pub(super) async fn add_roles_impl(
        &self,
        roles: Vec<ProvisionedRole>,
    ) -> AppResult<Vec<RoleProvisionOutcome>> {
        let mut outcomes = Vec::with_capacity(roles.len());

        for provisioned in roles {
            let result = with_retry(self.retry, "add role", || {
                self.insert_role_once(&provisioned)
            })
            .await
            .map(|()| provisioned.role.clone());

            outcomes.push(RoleProvisionOutcome {
                entity_id: provisioned.role.entity_id().to_owned(),
                name: provisioned.role.name().to_owned(),
                result,
            });
        }

        Ok(outcomes)
    }

    async fn insert_role_once(&self, provisioned: &ProvisionedRole) -> StoreResult<()> {
        let role = &provisioned.role;
        let mut transaction = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO roles (
                id, entity_id, entity_kind, name, created_by, created_at, updated_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(role.id())
        .bind(role.entity_id())
        .bind(role.entity_kind().as_str())
        .bind(role.name())
        .bind(role.created_by())
        .bind(role.created_at())
        .bind(role.updated_by())
        .bind(role.updated_at())
        .execute(&mut *transaction)
        .await?;

        let actions: Vec<String> = provisioned.actions.iter().cloned().collect();
        let members: Vec<String> = provisioned.members.iter().cloned().collect();
        insert_actions(&mut transaction, role.id(), &actions).await?;
        insert_members(&mut transaction, role.id(), &members).await?;

        transaction.commit().await?;
        Ok(())
    }

    pub(super) async fn retrieve_role_impl(&self, role_id: &str) -> AppResult<Role> {
        let row = with_retry(self.retry, "retrieve role", || async {
            let row = sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, entity_id, entity_kind, name,
                       created_by, created_at, updated_by, updated_at
                FROM roles
                WHERE id = $1
                "#,
            )
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        row.into_role()
    }

    pub(super) async fn retrieve_entity_role_impl(
        &self,
        entity_id: &str,
        role_id: &str,
    ) -> AppResult<Role> {
        let row = with_retry(self.retry, "retrieve entity role", || async {
            let row = sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, entity_id, entity_kind, name,
                       created_by, created_at, updated_by, updated_at
                FROM roles
                WHERE id = $1 AND entity_id = $2
                "#,
            )
            .bind(role_id)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "role '{role_id}' was not found for entity '{entity_id}'"
            ))
        })?;

        row.into_role()
    }

    pub(super) async fn update_role_impl(
        &self,
        role: Role,
        expected_updated_at: DateTime<Utc>,
    ) -> AppResult<Role> {
        with_retry(self.retry, "update role", || {
            self.update_role_once(&role, expected_updated_at)
        })
        .await?;

        Ok(role)
    }

    async fn update_role_once(
        &self,
        role: &Role,
        expected_updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut transaction = self.pool.begin().await?;
        ensure_role(&mut transaction, role.id()).await?;

        let updated = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, updated_by = $3, updated_at = $4
            WHERE id = $1 AND updated_at = $5
            "#,
        )
        .bind(role.id())
        .bind(role.name())
        .bind(role.updated_by())
        .bind(role.updated_at())
        .bind(expected_updated_at)
        .execute(&mut *transaction)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "role '{}' was modified concurrently",
                role.id()
            ))
            .into());
        }

        transaction.commit().await?;
        Ok(())
    }

    pub(super) async fn remove_roles_impl(&self, role_ids: &[String]) -> AppResult<()> {
        with_retry(self.retry, "remove roles", || async {
            sqlx::query("DELETE FROM roles WHERE id = ANY($1)")
                .bind(role_ids)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }
}
