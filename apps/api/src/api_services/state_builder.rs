use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use strata_application::{
    AuthorizationLayer, ChannelOperations, ChannelRepository, ChannelService, EntityDirectory,
    EntityRoleOperations, EntityRoleService, GroupOperations, GroupRepository, GroupService,
    LoggingLayer, PermissionResolver, Pipeline, PolicyClient, RoleRegistry, RoleRepository,
    default_permission_maps,
};
use strata_core::AppError;
use strata_domain::{EntityKind, StatusCascade};
use strata_infrastructure::{
    DenyAllPolicyClient, HttpPolicyClient, InMemoryChannelRepository, InMemoryGroupRepository,
    InMemoryRoleRepository, PostgresChannelRepository, PostgresGroupRepository,
    PostgresRoleRepository,
};
use tracing::{info, warn};

use crate::api_config::{ApiConfig, PolicyConfig, StorageBackend};
use crate::state::AppState;

use super::database::connect_and_migrate;

/// Storage adapters behind the application ports.
pub struct RepositorySet {
    pub role_repository: Arc<dyn RoleRepository>,
    pub group_repository: Arc<dyn GroupRepository>,
    pub channel_repository: Arc<dyn ChannelRepository>,
}

impl RepositorySet {
    pub fn in_memory() -> Self {
        Self {
            role_repository: Arc::new(InMemoryRoleRepository::new()),
            group_repository: Arc::new(InMemoryGroupRepository::new()),
            channel_repository: Arc::new(InMemoryChannelRepository::new()),
        }
    }

    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            role_repository: Arc::new(PostgresRoleRepository::new(pool.clone())),
            group_repository: Arc::new(PostgresGroupRepository::new(pool.clone())),
            channel_repository: Arc::new(PostgresChannelRepository::new(pool.clone())),
        }
    }
}

pub async fn build_app_state(config: &ApiConfig) -> Result<AppState, AppError> {
    let repositories = match &config.storage {
        StorageBackend::Memory => {
            warn!("using in-memory storage, state is lost on restart");
            RepositorySet::in_memory()
        }
        StorageBackend::Postgres { database_url } => {
            let pool = connect_and_migrate(database_url).await?;
            RepositorySet::postgres(&pool)
        }
    };
    let policy_client = build_policy_client(&config.policy)?;

    Ok(compose_app_state(
        repositories,
        policy_client,
        config.policy.timeout,
        config.status_cascade,
        config.internal_api_token.clone(),
    ))
}

fn build_policy_client(config: &PolicyConfig) -> Result<Arc<dyn PolicyClient>, AppError> {
    let Some(service_url) = config.service_url.as_ref() else {
        warn!("POLICY_SERVICE_URL is not set, external permission checks are denied");
        return Ok(Arc::new(DenyAllPolicyClient));
    };

    let http_client = HttpPolicyClient::build_http_client(config.timeout)?;
    let client = HttpPolicyClient::new(
        http_client,
        service_url,
        config.max_attempts,
        config.retry_backoff_ms,
    )?;
    info!(%service_url, max_attempts = config.max_attempts, "policy service configured");
    Ok(Arc::new(client))
}

/// Wires services and their layer pipelines over the given adapters.
pub fn compose_app_state(
    repositories: RepositorySet,
    policy_client: Arc<dyn PolicyClient>,
    policy_timeout: Duration,
    status_cascade: StatusCascade,
    internal_api_token: Option<String>,
) -> AppState {
    let role_registry = RoleRegistry::new(repositories.role_repository.clone());
    let resolver = PermissionResolver::new(
        repositories.role_repository,
        policy_client,
        policy_timeout,
    );

    let channel_service = ChannelService::new(
        repositories.channel_repository,
        repositories.group_repository.clone(),
        role_registry.clone(),
        resolver.clone(),
    );
    let group_service = Arc::new(GroupService::new(
        repositories.group_repository,
        role_registry.clone(),
        Arc::new(channel_service.clone()),
        status_cascade,
    ));
    let group_directory: Arc<dyn EntityDirectory> = group_service.clone();
    let channel_directory: Arc<dyn EntityDirectory> = Arc::new(channel_service.clone());

    let authorization = Arc::new(AuthorizationLayer::new(resolver, default_permission_maps()));
    let logging = Arc::new(LoggingLayer);

    let group_operations = Pipeline::<dyn GroupOperations>::new()
        .layer(logging.clone())
        .layer(authorization.clone())
        .build(group_service);
    let group_role_operations = Pipeline::<dyn EntityRoleOperations>::new()
        .layer(logging.clone())
        .layer(authorization.clone())
        .build(Arc::new(EntityRoleService::new(
            EntityKind::Group,
            role_registry.clone(),
            group_directory.clone(),
        )));
    let channel_operations = Pipeline::<dyn ChannelOperations>::new()
        .layer(logging)
        .layer(authorization)
        .build(Arc::new(channel_service.clone()));

    AppState {
        group_operations,
        group_role_operations,
        channel_operations,
        channel_service,
        group_directory,
        channel_directory,
        role_registry,
        internal_api_token,
    }
}
