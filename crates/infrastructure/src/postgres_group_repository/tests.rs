use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use strata_application::{GroupRepository, StatusChange};
use strata_core::{AppError, DomainId};
use strata_domain::{EntityStatus, Group, HierarchyDirection, HierarchyQuery, StatusCascade};
use uuid::Uuid;

use super::PostgresGroupRepository;

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
        panic!("failed to run migrations for postgres group repository tests: {error}");
    }

    Some(pool)
}

/// Creates a fresh domain holding a chain of `length` groups and returns their ids, root first.
async fn chain(repository: &PostgresGroupRepository, length: usize) -> Vec<String> {
    let domain_id =
        DomainId::new(Uuid::new_v4().to_string()).unwrap_or_else(|_| unreachable!());
    let mut ids: Vec<String> = Vec::with_capacity(length);

    for index in 0..length {
        let id = Uuid::new_v4().to_string();
        let group = Group::new(
            id.as_str(),
            domain_id.clone(),
            format!("group-{index}"),
            "",
            "user-1",
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());
        assert!(repository.create_group(group).await.is_ok());

        if let Some(parent_id) = ids.last() {
            let attached = repository.assign_parent(parent_id, &[id.clone()]).await;
            assert!(attached.is_ok());
        }
        ids.push(id);
    }

    ids
}

#[tokio::test]
async fn ancestors_are_bounded_by_level() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresGroupRepository::new(pool);
    let ids = chain(&repository, 5).await;

    let query = HierarchyQuery::new(HierarchyDirection::Up, 2).unwrap_or_else(|_| unreachable!());
    let entries = repository
        .retrieve_hierarchy(&ids[4], &query)
        .await
        .unwrap_or_default();
    let found: Vec<(&str, u32)> = entries
        .iter()
        .map(|entry| (entry.group.id(), entry.level))
        .collect();
    assert_eq!(found, vec![(ids[3].as_str(), 1), (ids[2].as_str(), 2)]);
}

#[tokio::test]
async fn cycle_is_rejected_and_nothing_changes() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresGroupRepository::new(pool);
    let ids = chain(&repository, 3).await;

    let result = repository.assign_parent(&ids[2], &[ids[0].clone()]).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let root = repository.find_group(&ids[0]).await.unwrap_or_default();
    assert!(root.is_some_and(|root| root.parent_id().is_none()));
}

#[tokio::test]
async fn descendants_cascade_deletes_the_subtree() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresGroupRepository::new(pool);
    let ids = chain(&repository, 3).await;

    let changed = repository
        .change_status(StatusChange {
            group_id: ids[1].clone(),
            status: EntityStatus::Deleted,
            cascade: StatusCascade::Descendants,
            updated_by: "user-1".to_owned(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap_or_default();
    assert_eq!(changed, vec![ids[1].clone(), ids[2].clone()]);

    let leaf = repository
        .find_group(&ids[2])
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!());
    assert!(leaf.is_deleted());
}
