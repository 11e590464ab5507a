//! End-to-end checks of the service pipelines over the in-memory adapters.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use strata_application::{
    AuthorizationLayer, ChannelOperations, ChannelService, ConnectionAuthorization,
    CreateChannelInput, CreateGroupInput, DEFAULT_POLICY_TIMEOUT, EntityDirectory,
    EntityRoleOperations, EntityRoleService, GroupOperations, GroupService, LoggingLayer,
    PermissionResolver, Pipeline, PolicyClient, PolicyRequest, RoleInput, RoleRegistry,
    UpdateGroupInput, default_permission_maps,
};
use strata_core::{AppError, AppResult, CallerIdentity, DomainId, ErrorKind, PageQuery};
use strata_domain::{
    ConnectionType, EntityKind, Group, HierarchyDirection, HierarchyQuery, StatusCascade,
    actions,
};
use strata_infrastructure::{
    InMemoryChannelRepository, InMemoryGroupRepository, InMemoryRoleRepository,
};
use tokio::sync::Mutex;

const DOMAIN: &str = "domain-1";

/// Policy service double granting explicit `(subject, permission, object)` triples.
#[derive(Default)]
struct GrantingPolicy {
    grants: Mutex<HashSet<(String, String, String)>>,
}

impl GrantingPolicy {
    async fn grant(&self, subject: &str, permission: &str, object: &str) {
        self.grants.lock().await.insert((
            subject.to_owned(),
            permission.to_owned(),
            object.to_owned(),
        ));
    }
}

#[async_trait]
impl PolicyClient for GrantingPolicy {
    async fn authorize(&self, request: &PolicyRequest) -> AppResult<bool> {
        Ok(self.grants.lock().await.contains(&(
            request.subject.clone(),
            request.permission.clone(),
            request.object.clone(),
        )))
    }
}

struct Harness {
    policy: Arc<GrantingPolicy>,
    groups: Arc<dyn GroupOperations>,
    group_roles: Arc<dyn EntityRoleOperations>,
    channels: Arc<dyn ChannelOperations>,
    channel_service: ChannelService,
    group_service: Arc<GroupService>,
}

impl Harness {
    async fn new(cascade: StatusCascade) -> Self {
        let role_repository = Arc::new(InMemoryRoleRepository::new());
        let group_repository = Arc::new(InMemoryGroupRepository::new());
        let channel_repository = Arc::new(InMemoryChannelRepository::new());
        let policy = Arc::new(GrantingPolicy::default());

        let registry = RoleRegistry::new(role_repository.clone());
        let resolver = PermissionResolver::new(
            role_repository,
            policy.clone(),
            DEFAULT_POLICY_TIMEOUT,
        );
        let channel_service = ChannelService::new(
            channel_repository,
            group_repository.clone(),
            registry.clone(),
            resolver.clone(),
        );
        let group_service = Arc::new(GroupService::new(
            group_repository,
            registry.clone(),
            Arc::new(channel_service.clone()),
            cascade,
        ));
        let group_directory: Arc<dyn EntityDirectory> = group_service.clone();

        let authorization = Arc::new(AuthorizationLayer::new(resolver, default_permission_maps()));
        let logging = Arc::new(LoggingLayer);

        let groups = Pipeline::<dyn GroupOperations>::new()
            .layer(logging.clone())
            .layer(authorization.clone())
            .build(group_service.clone());
        let group_roles = Pipeline::<dyn EntityRoleOperations>::new()
            .layer(logging.clone())
            .layer(authorization.clone())
            .build(Arc::new(EntityRoleService::new(
                EntityKind::Group,
                registry,
                group_directory,
            )));
        let channels = Pipeline::<dyn ChannelOperations>::new()
            .layer(logging)
            .layer(authorization)
            .build(Arc::new(channel_service.clone()));

        let harness = Self {
            policy,
            groups,
            group_roles,
            channels,
            channel_service,
            group_service,
        };
        harness
            .policy
            .grant("alice", actions::GROUP_CREATE, DOMAIN)
            .await;
        harness
            .policy
            .grant("alice", actions::CHANNEL_CREATE, DOMAIN)
            .await;
        harness
    }

    async fn create_group(&self, name: &str, parent_id: Option<&str>) -> Group {
        self.groups
            .create_group(
                &user("alice"),
                CreateGroupInput {
                    name: name.to_owned(),
                    description: String::new(),
                    parent_id: parent_id.map(str::to_owned),
                },
            )
            .await
            .unwrap_or_else(|error| panic!("failed to create group '{name}': {error}"))
    }
}

fn user(subject: &str) -> CallerIdentity {
    CallerIdentity::user(
        subject,
        DomainId::new(DOMAIN).unwrap_or_else(|_| unreachable!()),
    )
}

fn ids(groups: &[&Group]) -> Vec<String> {
    groups.iter().map(|group| group.id().to_owned()).collect()
}

fn kind_of<T>(result: &AppResult<T>) -> Option<ErrorKind> {
    result.as_ref().err().map(AppError::kind)
}

#[tokio::test]
async fn creator_holds_the_built_in_admin_role() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor-1", None).await;

    let viewed = harness.groups.view_group(&user("alice"), group.id()).await;
    assert!(viewed.is_ok());

    let roles = harness
        .group_roles
        .retrieve_all_roles(&user("alice"), group.id(), PageQuery::default())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(roles.total, 1);
    assert_eq!(roles.items[0].name(), "admin");
}

#[tokio::test]
async fn denied_update_never_reaches_the_service() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor-1", None).await;

    let result = harness
        .groups
        .update_group(
            &user("bob"),
            group.id(),
            UpdateGroupInput {
                name: Some("renamed".to_owned()),
                description: None,
            },
        )
        .await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Forbidden));

    let stored = harness
        .group_service
        .view_group(&user("alice"), group.id())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(stored.name(), "floor-1");
}

#[tokio::test]
async fn policy_grants_delegable_operations_only() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor-1", None).await;

    harness
        .policy
        .grant("bob", actions::READ, group.id())
        .await;
    harness
        .policy
        .grant("bob", actions::MANAGE_ROLE, group.id())
        .await;

    let viewed = harness.groups.view_group(&user("bob"), group.id()).await;
    assert!(viewed.is_ok());

    let added = harness
        .group_roles
        .add_role(
            &user("bob"),
            group.id(),
            RoleInput {
                name: "editor".to_owned(),
                actions: vec![actions::UPDATE.to_owned()],
                members: Vec::new(),
            },
        )
        .await;
    assert_eq!(kind_of(&added), Some(ErrorKind::Forbidden));
}

#[tokio::test]
async fn custom_role_grants_its_actions_to_members() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor-1", None).await;

    let role = harness
        .group_roles
        .add_role(
            &user("alice"),
            group.id(),
            RoleInput {
                name: "editor".to_owned(),
                actions: vec![actions::READ.to_owned(), actions::UPDATE.to_owned()],
                members: vec!["carol".to_owned()],
            },
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    let updated = harness
        .groups
        .update_group(
            &user("carol"),
            group.id(),
            UpdateGroupInput {
                name: None,
                description: Some("west wing".to_owned()),
            },
        )
        .await;
    assert!(updated.is_ok());

    let deleted = harness.groups.delete_group(&user("carol"), group.id()).await;
    assert_eq!(kind_of(&deleted), Some(ErrorKind::Forbidden));

    let removed = harness
        .group_roles
        .remove_role(&user("alice"), group.id(), role.id())
        .await;
    assert!(removed.is_ok());
    let viewed = harness.groups.view_group(&user("carol"), group.id()).await;
    assert_eq!(kind_of(&viewed), Some(ErrorKind::Forbidden));
}

#[tokio::test]
async fn built_in_admin_role_cannot_be_renamed_or_removed() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor-1", None).await;
    let roles = harness
        .group_roles
        .retrieve_all_roles(&user("alice"), group.id(), PageQuery::default())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let admin_id = roles.items[0].id().to_owned();

    let renamed = harness
        .group_roles
        .update_role_name(&user("alice"), group.id(), &admin_id, "owner")
        .await;
    assert_eq!(kind_of(&renamed), Some(ErrorKind::Conflict));

    let removed = harness
        .group_roles
        .remove_role(&user("alice"), group.id(), &admin_id)
        .await;
    assert_eq!(kind_of(&removed), Some(ErrorKind::Conflict));
}

#[tokio::test]
async fn hierarchy_is_walked_in_both_directions() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let building = harness.create_group("building", None).await;
    let floor = harness.create_group("floor", Some(building.id())).await;
    let room = harness.create_group("room", Some(floor.id())).await;

    let up = HierarchyQuery::new(HierarchyDirection::Up, 0).unwrap_or_else(|_| unreachable!());
    let ancestors = harness
        .groups
        .retrieve_group_hierarchy(&user("alice"), room.id(), up)
        .await
        .unwrap_or_default();
    let found: Vec<String> = ancestors
        .iter()
        .map(|entry| entry.group.id().to_owned())
        .collect();
    assert_eq!(found, ids(&[&floor, &building]));

    let down = HierarchyQuery::new(HierarchyDirection::Down, 1).unwrap_or_else(|_| unreachable!());
    let descendants = harness
        .groups
        .retrieve_group_hierarchy(&user("alice"), building.id(), down)
        .await
        .unwrap_or_default();
    assert_eq!(descendants.len(), 1);
    assert_eq!(descendants[0].group.id(), floor.id());
}

#[tokio::test]
async fn attaching_an_ancestor_as_child_is_rejected() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let building = harness.create_group("building", None).await;
    let floor = harness.create_group("floor", Some(building.id())).await;

    let result = harness
        .groups
        .add_children_groups(&user("alice"), floor.id(), &ids(&[&building]))
        .await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Conflict));
    match result {
        Err(error @ AppError::Context { .. }) => {
            assert!(error.to_string().starts_with("failed to attach children"));
        }
        other => panic!("expected a wrapped conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn adding_children_is_all_or_nothing() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let site = harness.create_group("site", None).await;
    let other = harness.create_group("other", None).await;
    let free = harness.create_group("free", None).await;
    let taken = harness.create_group("taken", Some(other.id())).await;

    let result = harness
        .groups
        .add_children_groups(&user("alice"), site.id(), &ids(&[&free, &taken]))
        .await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Conflict));

    let children = harness
        .groups
        .list_children_groups(&user("alice"), site.id(), PageQuery::default())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(children.total, 0);
}

#[tokio::test]
async fn target_only_delete_keeps_children_as_roots() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let building = harness.create_group("building", None).await;
    let floor = harness.create_group("floor", Some(building.id())).await;

    assert!(harness.groups.delete_group(&user("alice"), building.id()).await.is_ok());

    let floor = harness
        .groups
        .view_group(&user("alice"), floor.id())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(floor.parent_id().is_none());

    let gone = harness.groups.view_group(&user("alice"), building.id()).await;
    assert!(gone.is_err());
}

#[tokio::test]
async fn descendant_cascade_deletes_the_subtree() {
    let harness = Harness::new(StatusCascade::Descendants).await;
    let building = harness.create_group("building", None).await;
    let floor = harness.create_group("floor", Some(building.id())).await;

    assert!(harness.groups.delete_group(&user("alice"), building.id()).await.is_ok());

    let viewed = harness.group_service.view_group(&user("alice"), floor.id()).await;
    assert_eq!(kind_of(&viewed), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn deleting_a_group_detaches_its_channels() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let group = harness.create_group("floor", None).await;
    let channel = harness
        .channels
        .create_channel(
            &user("alice"),
            CreateChannelInput {
                name: "telemetry".to_owned(),
                parent_group_id: Some(group.id().to_owned()),
            },
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    assert!(harness.groups.delete_group(&user("alice"), group.id()).await.is_ok());

    let entity = harness
        .channel_service
        .retrieve_entity(channel.id())
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(entity.parent_group_id.is_none());
}

#[tokio::test]
async fn clients_are_authorized_by_connection_direction() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let channel = harness
        .channels
        .create_channel(
            &user("alice"),
            CreateChannelInput {
                name: "telemetry".to_owned(),
                parent_group_id: None,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let connected = harness
        .channels
        .connect(
            &user("alice"),
            channel.id(),
            &["sensor-1".to_owned()],
            &[ConnectionType::Publish],
        )
        .await;
    assert!(connected.is_ok());

    let check = |client_type: &str, subject: &str, connection_type: &str| ConnectionAuthorization {
        domain_id: DOMAIN.to_owned(),
        channel_id: channel.id().to_owned(),
        client_id: subject.to_owned(),
        client_type: client_type.to_owned(),
        connection_type: connection_type.to_owned(),
    };

    let publish = harness
        .channel_service
        .authorize(check("client", "sensor-1", "publish"))
        .await;
    assert!(matches!(publish, Ok(true)));
    let subscribe = harness
        .channel_service
        .authorize(check("client", "sensor-1", "subscribe"))
        .await;
    assert!(matches!(subscribe, Ok(false)));

    let owner = harness
        .channel_service
        .authorize(check("user", "alice", "subscribe"))
        .await;
    assert!(matches!(owner, Ok(true)));
    let stranger = harness
        .channel_service
        .authorize(check("user", "mallory", "publish"))
        .await;
    assert!(matches!(stranger, Ok(false)));

    assert!(harness.channel_service.remove_client_connections("sensor-1").await.is_ok());
    let after_cleanup = harness
        .channel_service
        .authorize(check("client", "sensor-1", "publish"))
        .await;
    assert!(matches!(after_cleanup, Ok(false)));
}

#[tokio::test]
async fn user_checks_require_a_domain() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;

    let result = harness
        .channel_service
        .authorize(ConnectionAuthorization {
            domain_id: String::new(),
            channel_id: "any".to_owned(),
            client_id: "alice".to_owned(),
            client_type: "user".to_owned(),
            connection_type: "publish".to_owned(),
        })
        .await;
    assert_eq!(kind_of(&result), Some(ErrorKind::Malformed));
}

#[tokio::test]
async fn user_checks_are_scoped_to_the_channel_domain() {
    let harness = Harness::new(StatusCascade::TargetOnly).await;
    let channel = harness
        .channels
        .create_channel(
            &user("alice"),
            CreateChannelInput {
                name: "telemetry".to_owned(),
                parent_group_id: None,
            },
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let check = |domain_id: &str, channel_id: &str| ConnectionAuthorization {
        domain_id: domain_id.to_owned(),
        channel_id: channel_id.to_owned(),
        client_id: "alice".to_owned(),
        client_type: "user".to_owned(),
        connection_type: "publish".to_owned(),
    };

    let home = harness.channel_service.authorize(check(DOMAIN, channel.id())).await;
    assert_eq!(home.ok(), Some(true));

    let foreign = harness
        .channel_service
        .authorize(check("domain-other", channel.id()))
        .await;
    assert_eq!(foreign.ok(), Some(false));

    harness
        .policy
        .grant("alice", actions::PUBLISH, "missing-channel")
        .await;
    let missing = harness
        .channel_service
        .authorize(check(DOMAIN, "missing-channel"))
        .await;
    assert_eq!(missing.ok(), Some(false));
}
