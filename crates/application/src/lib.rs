//! Application services, ports and service layers.

#![forbid(unsafe_code)]

mod authorization_middleware;
mod channel_ports;
mod channel_service;
mod entity_role_service;
mod group_ports;
mod group_service;
mod logging_middleware;
mod operations;
/// Operation to action tables.
pub mod permission_maps;
mod permission_resolver;
mod pipeline;
mod policy_ports;
mod role_ports;
mod role_registry;

pub use authorization_middleware::{AuthorizationLayer, AuthorizationMiddleware};
pub use channel_ports::ChannelRepository;
pub use channel_service::{ChannelService, ConnectionAuthorization};
pub use entity_role_service::EntityRoleService;
pub use group_ports::{
    CreateGroupInput, GroupDependents, GroupListQuery, GroupRepository, StatusChange,
    UpdateGroupInput,
};
pub use group_service::GroupService;
pub use logging_middleware::{LoggingLayer, LoggingMiddleware};
pub use operations::{
    ChannelOperations, CreateChannelInput, EntityDirectory, EntityRoleOperations,
    GroupOperations, RoleInput,
};
pub use permission_maps::{
    ChannelOperation, GroupOperation, Operation, PermissionMaps, RoleOperation,
    default_permission_maps,
};
pub use permission_resolver::{
    AccessCheck, DEFAULT_POLICY_TIMEOUT, Decision, DecisionSource, PermissionResolver,
};
pub use pipeline::{Layer, Pipeline};
pub use policy_ports::{PolicyClient, PolicyRequest};
pub use role_ports::{EntityRolesSnapshot, NewRole, RoleProvisionOutcome, RoleRepository};
pub use role_registry::RoleRegistry;
