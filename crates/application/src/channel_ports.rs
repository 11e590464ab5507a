use async_trait::async_trait;

use strata_core::AppResult;
use strata_domain::{Channel, Connection};

/// Persistence port for channels and their client connections.
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Stores a new channel.
    async fn create_channel(&self, channel: Channel) -> AppResult<Channel>;

    /// Finds a channel by identifier.
    async fn find_channel(&self, channel_id: &str) -> AppResult<Option<Channel>>;

    /// Replaces channel attributes.
    async fn update_channel(&self, channel: Channel) -> AppResult<Channel>;

    /// Removes a channel with its connections.
    async fn delete_channel(&self, channel_id: &str) -> AppResult<()>;

    /// Adds connections; existing ones are kept.
    async fn add_connections(&self, connections: &[Connection]) -> AppResult<()>;

    /// Removes connections; missing ones are ignored.
    async fn remove_connections(&self, connections: &[Connection]) -> AppResult<()>;

    /// Returns whether the exact connection exists.
    async fn has_connection(&self, connection: &Connection) -> AppResult<bool>;

    /// Removes every connection of a client and returns how many were removed.
    async fn remove_client_connections(&self, client_id: &str) -> AppResult<u64>;

    /// Clears the parent group of channels under the listed groups.
    async fn unset_parent_groups(&self, group_ids: &[String]) -> AppResult<u64>;
}
