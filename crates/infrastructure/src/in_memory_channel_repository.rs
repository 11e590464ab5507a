use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use strata_application::ChannelRepository;
use strata_core::{AppError, AppResult};
use strata_domain::{Channel, Connection};

#[derive(Debug, Default)]
struct ChannelState {
    channels: HashMap<String, Channel>,
    connections: BTreeSet<Connection>,
}

/// In-memory channel and connection store.
#[derive(Debug, Default)]
pub struct InMemoryChannelRepository {
    state: RwLock<ChannelState>,
}

impl InMemoryChannelRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create_channel(&self, channel: Channel) -> AppResult<Channel> {
        let mut state = self.state.write().await;
        if state.channels.contains_key(channel.id()) {
            return Err(AppError::Conflict(format!(
                "channel '{}' already exists",
                channel.id()
            )));
        }

        state
            .channels
            .insert(channel.id().to_owned(), channel.clone());
        Ok(channel)
    }

    async fn find_channel(&self, channel_id: &str) -> AppResult<Option<Channel>> {
        Ok(self.state.read().await.channels.get(channel_id).cloned())
    }

    async fn update_channel(&self, channel: Channel) -> AppResult<Channel> {
        let mut state = self.state.write().await;
        if !state.channels.contains_key(channel.id()) {
            return Err(AppError::NotFound(format!(
                "channel '{}' was not found",
                channel.id()
            )));
        }

        state
            .channels
            .insert(channel.id().to_owned(), channel.clone());
        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.channels.remove(channel_id).is_none() {
            return Err(AppError::NotFound(format!(
                "channel '{channel_id}' was not found"
            )));
        }

        state
            .connections
            .retain(|connection| connection.channel_id != channel_id);
        Ok(())
    }

    async fn add_connections(&self, connections: &[Connection]) -> AppResult<()> {
        let mut state = self.state.write().await;
        for connection in connections {
            if !state.channels.contains_key(connection.channel_id.as_str()) {
                return Err(AppError::NotFound(format!(
                    "channel '{}' was not found",
                    connection.channel_id
                )));
            }
        }

        state.connections.extend(connections.iter().cloned());
        Ok(())
    }

    async fn remove_connections(&self, connections: &[Connection]) -> AppResult<()> {
        let mut state = self.state.write().await;
        for connection in connections {
            state.connections.remove(connection);
        }
        Ok(())
    }

    async fn has_connection(&self, connection: &Connection) -> AppResult<bool> {
        Ok(self.state.read().await.connections.contains(connection))
    }

    async fn remove_client_connections(&self, client_id: &str) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.connections.len();
        state
            .connections
            .retain(|connection| connection.client_id != client_id);
        Ok((before - state.connections.len()) as u64)
    }

    async fn unset_parent_groups(&self, group_ids: &[String]) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let mut cleared = 0_u64;
        for channel in state.channels.values_mut() {
            let under_deleted = channel
                .parent_group_id()
                .is_some_and(|parent| group_ids.iter().any(|id| id == parent));
            if under_deleted {
                channel.set_parent_group(None);
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests;
