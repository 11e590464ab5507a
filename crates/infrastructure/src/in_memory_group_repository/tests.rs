use chrono::Utc;
use strata_application::{GroupListQuery, GroupRepository, StatusChange};
use strata_core::{AppError, DomainId, PageQuery};
use strata_domain::{EntityStatus, Group, HierarchyDirection, HierarchyQuery, StatusCascade};

use super::InMemoryGroupRepository;

fn domain(id: &str) -> DomainId {
    DomainId::new(id).unwrap_or_else(|_| unreachable!())
}

fn group(id: &str, domain_id: &str) -> Group {
    Group::new(id, domain(domain_id), id, "", "user-1", Utc::now())
        .unwrap_or_else(|_| unreachable!())
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Builds g0 <- g1 <- ... <- g{length-1} in domain d1.
async fn chain(length: usize) -> InMemoryGroupRepository {
    let repository = InMemoryGroupRepository::new();
    for index in 0..length {
        let created = repository.create_group(group(&format!("g{index}"), "d1")).await;
        assert!(created.is_ok());
        if index > 0 {
            let attached = repository
                .assign_parent(&format!("g{}", index - 1), &[format!("g{index}")])
                .await;
            assert!(attached.is_ok());
        }
    }
    repository
}

fn delete(group_id: &str, cascade: StatusCascade) -> StatusChange {
    StatusChange {
        group_id: group_id.to_owned(),
        status: EntityStatus::Deleted,
        cascade,
        updated_by: "user-1".to_owned(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn hierarchy_up_respects_level() {
    let repository = chain(5).await;
    let query = HierarchyQuery::new(HierarchyDirection::Up, 2).unwrap_or_else(|_| unreachable!());

    let entries = repository
        .retrieve_hierarchy("g4", &query)
        .await
        .unwrap_or_default();
    let found: Vec<(&str, u32)> = entries
        .iter()
        .map(|entry| (entry.group.id(), entry.level))
        .collect();
    assert_eq!(found, vec![("g3", 1), ("g2", 2)]);

    let unbounded =
        HierarchyQuery::new(HierarchyDirection::Up, 0).unwrap_or_else(|_| unreachable!());
    let entries = repository
        .retrieve_hierarchy("g4", &unbounded)
        .await
        .unwrap_or_default();
    assert_eq!(entries.len(), 4);
}

#[tokio::test]
async fn attaching_an_ancestor_leaves_the_tree_unchanged() {
    let repository = chain(3).await;

    let result = repository.assign_parent("g2", &ids(&["g0"])).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let root = repository.find_group("g0").await.unwrap_or_default();
    assert!(root.is_some_and(|root| root.parent_id().is_none()));
}

#[tokio::test]
async fn batch_attach_is_all_or_nothing() {
    let repository = InMemoryGroupRepository::new();
    for id in ["p", "other", "c1", "c2"] {
        let _ = repository.create_group(group(id, "d1")).await;
    }
    let _ = repository.assign_parent("other", &ids(&["c2"])).await;

    let result = repository.assign_parent("p", &ids(&["c1", "c2"])).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let c1 = repository.find_group("c1").await.unwrap_or_default();
    assert!(c1.is_some_and(|c1| c1.parent_id().is_none()));
}

#[tokio::test]
async fn cross_domain_attach_is_rejected() {
    let repository = InMemoryGroupRepository::new();
    let _ = repository.create_group(group("p", "d1")).await;
    let _ = repository.create_group(group("c", "d2")).await;

    let result = repository.assign_parent("p", &ids(&["c"])).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn reattaching_under_same_parent_is_a_no_op() {
    let repository = chain(2).await;

    let attached = repository.assign_parent("g0", &ids(&["g1"])).await;
    assert!(attached.is_ok_and(|attached| attached.is_empty()));
}

#[tokio::test]
async fn unassign_ignores_groups_under_other_parents() {
    let repository = chain(3).await;

    let detached = repository
        .unassign_children("g0", Some(&ids(&["g1", "g2"])))
        .await
        .unwrap_or_default();
    assert_eq!(detached, ids(&["g1"]));

    let g2 = repository.find_group("g2").await.unwrap_or_default();
    assert!(g2.is_some_and(|g2| g2.parent_id() == Some("g1")));
}

#[tokio::test]
async fn target_only_delete_turns_children_into_roots() {
    let repository = chain(3).await;

    let changed = repository
        .change_status(delete("g1", StatusCascade::TargetOnly))
        .await
        .unwrap_or_default();
    assert_eq!(changed, ids(&["g1"]));

    let g2 = repository
        .find_group("g2")
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!());
    assert_eq!(g2.status(), EntityStatus::Enabled);
    assert!(g2.parent_id().is_none());

    let g1 = repository
        .find_group("g1")
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!());
    assert!(g1.is_deleted());
    assert!(g1.parent_id().is_none());
}

#[tokio::test]
async fn descendant_cascade_changes_the_subtree() {
    let repository = chain(4).await;

    let changed = repository
        .change_status(StatusChange {
            group_id: "g1".to_owned(),
            status: EntityStatus::Disabled,
            cascade: StatusCascade::Descendants,
            updated_by: "user-1".to_owned(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap_or_default();
    assert_eq!(changed, ids(&["g1", "g2", "g3"]));

    let root = repository
        .find_group("g0")
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| unreachable!());
    assert_eq!(root.status(), EntityStatus::Enabled);
}

#[tokio::test]
async fn deleted_groups_are_hidden_from_listings() {
    let repository = chain(3).await;
    let _ = repository
        .change_status(delete("g2", StatusCascade::TargetOnly))
        .await;

    let page = repository
        .list_groups(&domain("d1"), &GroupListQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(page.total, 2);

    let children = repository
        .list_children("g1", PageQuery::default())
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(children.total, 0);

    let deleted = repository
        .list_groups(
            &domain("d1"),
            &GroupListQuery {
                status: Some(EntityStatus::Deleted),
                ..GroupListQuery::default()
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(deleted.total, 1);
}
