use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use strata_application::RoleRepository;
use strata_core::{AppError, PageQuery};
use strata_domain::{EntityKind, ProvisionedRole, Role};
use uuid::Uuid;

use super::PostgresRoleRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres role repository tests: {error}");
    }

    Some(pool)
}

fn provisioned(entity_id: &str, name: &str, actions: &[&str], members: &[&str]) -> ProvisionedRole {
    ProvisionedRole {
        role: Role::new(
            Uuid::new_v4().to_string(),
            entity_id,
            EntityKind::Group,
            name,
            "owner",
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!()),
        actions: actions.iter().map(|action| (*action).to_owned()).collect(),
        members: members.iter().map(|member| (*member).to_owned()).collect(),
    }
}

#[tokio::test]
async fn provisioned_role_keeps_actions_and_members() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);
    let entity_id = Uuid::new_v4().to_string();

    let role = provisioned(&entity_id, "editor", &["read", "write"], &["user-42"]);
    let role_id = role.role.id().to_owned();
    let outcomes = repository.add_roles(vec![role]).await.unwrap_or_default();
    assert!(outcomes.iter().all(|outcome| outcome.is_created()));

    let has_write = repository
        .role_check_actions_exist(&role_id, &["write".to_owned()])
        .await;
    assert!(matches!(has_write, Ok(true)));

    let members = repository
        .role_list_members(&role_id, PageQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(members.items, vec!["user-42".to_owned()]);
    assert_eq!(members.total, 1);
}

#[tokio::test]
async fn duplicate_role_name_is_a_per_item_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);
    let entity_id = Uuid::new_v4().to_string();

    let outcomes = repository
        .add_roles(vec![
            provisioned(&entity_id, "viewer", &["read"], &[]),
            provisioned(&entity_id, "viewer", &["read"], &[]),
        ])
        .await
        .unwrap_or_default();

    assert!(outcomes[0].is_created());
    assert!(matches!(outcomes[1].result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn removed_roles_are_gone_with_their_links() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);
    let entity_id = Uuid::new_v4().to_string();

    let role = provisioned(&entity_id, "viewer", &["read"], &["user-1"]);
    let role_id = role.role.id().to_owned();
    let _ = repository.add_roles(vec![role]).await;

    assert!(repository.remove_entity_roles(&[entity_id.clone()]).await.is_ok());
    let result = repository.retrieve_role(&role_id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let snapshot = repository
        .retrieve_entities_roles_actions_members(&[entity_id])
        .await
        .unwrap_or_default();
    assert!(snapshot.member_roles.is_empty());
}

#[tokio::test]
async fn entity_members_are_paged_by_member() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRoleRepository::new(pool);
    let entity_id = Uuid::new_v4().to_string();

    let _ = repository
        .add_roles(vec![
            provisioned(&entity_id, "viewer", &["read"], &["u1", "u2", "u3"]),
            provisioned(&entity_id, "editor", &["update"], &["u1"]),
        ])
        .await;

    let page = repository
        .list_entity_members(&entity_id, PageQuery::new(2, 0).unwrap_or_default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].member_id, "u1");
    assert_eq!(page.items[0].roles.len(), 2);
}
