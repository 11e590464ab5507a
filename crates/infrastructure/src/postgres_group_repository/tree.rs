use strata_domain::StatusCascade;
use strata_domain::hierarchy::plan_parent_assignment;

use super::*;

impl PostgresGroupRepository {
    pub(super) async fn assign_parent_impl(
        &self,
        parent_id: &str,
        child_ids: &[String],
    ) -> AppResult<Vec<String>> {
        with_retry(self.retry, "assign parent group", || {
            self.assign_parent_once(parent_id, child_ids)
        })
        .await
    }

    async fn assign_parent_once(
        &self,
        parent_id: &str,
        child_ids: &[String],
    ) -> StoreResult<Vec<String>> {
        let mut transaction = self.pool.begin().await?;
        let parent = fetch_group(&mut transaction, parent_id).await?;
        lock_domain(&mut transaction, parent.domain_id()).await?;

        let ancestors: Vec<String> = ancestor_rows(&mut transaction, parent_id, None)
            .await?
            .into_iter()
            .map(|row| row.group.id)
            .collect();

        let mut children = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            children.push(fetch_group(&mut transaction, child_id).await?);
        }

        let pending = plan_parent_assignment(&parent, &ancestors, &children)?;
        if !pending.is_empty() {
            sqlx::query("UPDATE groups SET parent_id = $1 WHERE id = ANY($2)")
                .bind(parent_id)
                .bind(&pending)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;
        Ok(pending)
    }

    pub(super) async fn unassign_children_impl(
        &self,
        parent_id: &str,
        child_ids: Option<&[String]>,
    ) -> AppResult<Vec<String>> {
        with_retry(self.retry, "unassign child groups", || async {
            let mut transaction = self.pool.begin().await?;
            let parent = fetch_group(&mut transaction, parent_id).await?;
            lock_domain(&mut transaction, parent.domain_id()).await?;

            let mut detached = sqlx::query_scalar::<_, String>(
                r#"
                UPDATE groups
                SET parent_id = NULL
                WHERE parent_id = $1 AND ($2::text[] IS NULL OR id = ANY($2))
                RETURNING id
                "#,
            )
            .bind(parent_id)
            .bind(child_ids)
            .fetch_all(&mut *transaction)
            .await?;

            transaction.commit().await?;
            detached.sort();
            Ok::<_, StoreError>(detached)
        })
        .await
    }

    pub(super) async fn detach_from_parent_impl(&self, group_id: &str) -> AppResult<()> {
        with_retry(self.retry, "detach group from parent", || async {
            let mut transaction = self.pool.begin().await?;
            let group = fetch_group(&mut transaction, group_id).await?;
            lock_domain(&mut transaction, group.domain_id()).await?;

            sqlx::query("UPDATE groups SET parent_id = NULL WHERE id = $1")
                .bind(group_id)
                .execute(&mut *transaction)
                .await?;

            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn change_status_impl(&self, change: StatusChange) -> AppResult<Vec<String>> {
        with_retry(self.retry, "change group status", || {
            self.change_status_once(&change)
        })
        .await
    }

    async fn change_status_once(&self, change: &StatusChange) -> StoreResult<Vec<String>> {
        let mut transaction = self.pool.begin().await?;
        let target = fetch_group(&mut transaction, change.group_id.as_str()).await?;
        lock_domain(&mut transaction, target.domain_id()).await?;

        let mut changed = vec![target.id().to_owned()];
        if change.cascade == StatusCascade::Descendants {
            changed.extend(
                descendant_rows(&mut transaction, target.id(), None)
                    .await?
                    .into_iter()
                    .map(|row| row.group.id),
            );
        }

        sqlx::query(
            r#"
            UPDATE groups
            SET status = $2, updated_by = $3, updated_at = $4
            WHERE id = ANY($1)
            "#,
        )
        .bind(&changed)
        .bind(change.status.as_str())
        .bind(change.updated_by.as_str())
        .bind(change.updated_at)
        .execute(&mut *transaction)
        .await?;

        if change.status == EntityStatus::Deleted {
            sqlx::query("UPDATE groups SET parent_id = NULL WHERE id = $1")
                .bind(target.id())
                .execute(&mut *transaction)
                .await?;
            if change.cascade == StatusCascade::TargetOnly {
                sqlx::query("UPDATE groups SET parent_id = NULL WHERE parent_id = $1")
                    .bind(target.id())
                    .execute(&mut *transaction)
                    .await?;
            }
        }

        transaction.commit().await?;
        Ok(changed)
    }
}
