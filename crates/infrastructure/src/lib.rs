//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod deny_all_policy_client;
mod http_policy_client;
mod in_memory_channel_repository;
mod in_memory_group_repository;
mod in_memory_role_repository;
mod postgres_channel_repository;
mod postgres_group_repository;
mod postgres_role_repository;
mod postgres_support;

pub use deny_all_policy_client::DenyAllPolicyClient;
pub use http_policy_client::HttpPolicyClient;
pub use in_memory_channel_repository::InMemoryChannelRepository;
pub use in_memory_group_repository::InMemoryGroupRepository;
pub use in_memory_role_repository::InMemoryRoleRepository;
pub use postgres_channel_repository::PostgresChannelRepository;
pub use postgres_group_repository::PostgresGroupRepository;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_support::DatabaseRetryPolicy;
