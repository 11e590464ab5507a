use std::sync::Arc;

use strata_application::{
    ChannelOperations, ChannelService, EntityDirectory, EntityRoleOperations, GroupOperations,
    RoleRegistry,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Group operations behind the logging and authorization layers.
    pub group_operations: Arc<dyn GroupOperations>,
    /// Role management of groups behind the same layers.
    pub group_role_operations: Arc<dyn EntityRoleOperations>,
    pub channel_operations: Arc<dyn ChannelOperations>,
    /// Undecorated channel service for peer-service hooks.
    pub channel_service: ChannelService,
    pub group_directory: Arc<dyn EntityDirectory>,
    pub channel_directory: Arc<dyn EntityDirectory>,
    pub role_registry: RoleRegistry,
    pub internal_api_token: Option<String>,
}
