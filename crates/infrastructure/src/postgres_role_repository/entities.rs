use std::collections::BTreeMap;
use std::collections::BTreeSet;

use strata_domain::{EntityActionRole, EntityMemberRole, MemberRoleActions};

use super::*;

#[derive(Debug, sqlx::FromRow)]
struct MemberRoleRow {
    member_id: String,
    role_id: String,
    role_name: String,
    actions: Vec<String>,
}

impl PostgresRoleRepository {
    pub(super) async fn retrieve_all_roles_impl(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<Role>> {
        let (limit, offset) = page_bounds(page);

        let (rows, total) = with_retry(self.retry, "list entity roles", || async {
            let total =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles WHERE entity_id = $1")
                    .bind(entity_id)
                    .fetch_one(&self.pool)
                    .await?;
            let rows = sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, entity_id, entity_kind, name,
                       created_by, created_at, updated_by, updated_at
                FROM roles
                WHERE entity_id = $1
                ORDER BY name
                LIMIT $2 OFFSET $3
                "#,
            )
            .bind(entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            Ok::<_, StoreError>((rows, total))
        })
        .await?;

        let roles = rows
            .into_iter()
            .map(RoleRow::into_role)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(page_of(roles, total, page))
    }

    pub(super) async fn list_entity_members_impl(
        &self,
        entity_id: &str,
        page: PageQuery,
    ) -> AppResult<Page<EntityMember>> {
        let (limit, offset) = page_bounds(page);

        let (rows, total) = with_retry(self.retry, "list entity members", || async {
            let mut transaction = self.pool.begin().await?;
            let total = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(DISTINCT role_members.member_id)
                FROM role_members
                JOIN roles ON roles.id = role_members.role_id
                WHERE roles.entity_id = $1
                "#,
            )
            .bind(entity_id)
            .fetch_one(&mut *transaction)
            .await?;
            let rows = sqlx::query_as::<_, MemberRoleRow>(
                r#"
                WITH page_members AS (
                    SELECT DISTINCT role_members.member_id
                    FROM role_members
                    JOIN roles ON roles.id = role_members.role_id
                    WHERE roles.entity_id = $1
                    ORDER BY role_members.member_id
                    LIMIT $2 OFFSET $3
                )
                SELECT
                    role_members.member_id,
                    roles.id AS role_id,
                    roles.name AS role_name,
                    COALESCE(
                        ARRAY_AGG(role_actions.action ORDER BY role_actions.action)
                            FILTER (WHERE role_actions.action IS NOT NULL),
                        '{}'
                    ) AS actions
                FROM role_members
                JOIN page_members ON page_members.member_id = role_members.member_id
                JOIN roles ON roles.id = role_members.role_id
                LEFT JOIN role_actions ON role_actions.role_id = roles.id
                WHERE roles.entity_id = $1
                GROUP BY role_members.member_id, roles.id, roles.name
                ORDER BY role_members.member_id, roles.name
                "#,
            )
            .bind(entity_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *transaction)
            .await?;
            transaction.commit().await?;
            Ok::<_, StoreError>((rows, total))
        })
        .await?;

        let mut members: BTreeMap<String, Vec<MemberRoleActions>> = BTreeMap::new();
        for row in rows {
            members
                .entry(row.member_id)
                .or_default()
                .push(MemberRoleActions {
                    role_id: row.role_id,
                    role_name: row.role_name,
                    actions: row.actions.into_iter().collect::<BTreeSet<_>>(),
                });
        }

        let members = members
            .into_iter()
            .map(|(member_id, roles)| EntityMember { member_id, roles })
            .collect();
        Ok(page_of(members, total, page))
    }

    pub(super) async fn remove_entity_members_impl(
        &self,
        entity_id: &str,
        members: &[String],
    ) -> AppResult<()> {
        with_retry(self.retry, "remove entity members", || async {
            sqlx::query(
                r#"
                DELETE FROM role_members
                USING roles
                WHERE roles.id = role_members.role_id
                  AND roles.entity_id = $1
                  AND role_members.member_id = ANY($2)
                "#,
            )
            .bind(entity_id)
            .bind(members)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn remove_member_from_all_roles_impl(&self, member_id: &str) -> AppResult<()> {
        with_retry(self.retry, "remove member from all roles", || async {
            sqlx::query("DELETE FROM role_members WHERE member_id = $1")
                .bind(member_id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn remove_entity_roles_impl(&self, entity_ids: &[String]) -> AppResult<()> {
        with_retry(self.retry, "remove entity roles", || async {
            sqlx::query("DELETE FROM roles WHERE entity_id = ANY($1)")
                .bind(entity_ids)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    pub(super) async fn retrieve_entities_roles_actions_members_impl(
        &self,
        entity_ids: &[String],
    ) -> AppResult<EntityRolesSnapshot> {
        let (role_rows, action_rows, member_rows) =
            with_retry(self.retry, "export entity roles", || async {
                let mut transaction = self.pool.begin().await?;
                let roles = sqlx::query_as::<_, RoleRow>(
                    r#"
                    SELECT id, entity_id, entity_kind, name,
                           created_by, created_at, updated_by, updated_at
                    FROM roles
                    WHERE entity_id = ANY($1)
                    ORDER BY array_position($1, entity_id), name
                    "#,
                )
                .bind(entity_ids)
                .fetch_all(&mut *transaction)
                .await?;
                let actions = sqlx::query_as::<_, (String, String, String)>(
                    r#"
                    SELECT roles.entity_id, role_actions.action, role_actions.role_id
                    FROM role_actions
                    JOIN roles ON roles.id = role_actions.role_id
                    WHERE roles.entity_id = ANY($1)
                    ORDER BY roles.entity_id, role_actions.role_id, role_actions.action
                    "#,
                )
                .bind(entity_ids)
                .fetch_all(&mut *transaction)
                .await?;
                let members = sqlx::query_as::<_, (String, String, String)>(
                    r#"
                    SELECT roles.entity_id, role_members.member_id, role_members.role_id
                    FROM role_members
                    JOIN roles ON roles.id = role_members.role_id
                    WHERE roles.entity_id = ANY($1)
                    ORDER BY roles.entity_id, role_members.role_id, role_members.member_id
                    "#,
                )
                .bind(entity_ids)
                .fetch_all(&mut *transaction)
                .await?;
                transaction.commit().await?;
                Ok::<_, StoreError>((roles, actions, members))
            })
            .await?;

        Ok(EntityRolesSnapshot {
            roles: role_rows
                .into_iter()
                .map(RoleRow::into_role)
                .collect::<AppResult<Vec<_>>>()?,
            action_roles: action_rows
                .into_iter()
                .map(|(entity_id, action, role_id)| EntityActionRole {
                    entity_id,
                    action,
                    role_id,
                })
                .collect(),
            member_roles: member_rows
                .into_iter()
                .map(|(entity_id, member_id, role_id)| EntityMemberRole {
                    entity_id,
                    member_id,
                    role_id,
                })
                .collect(),
        })
    }
}
