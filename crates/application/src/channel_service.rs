use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use strata_core::{AppError, AppResult, CallerIdentity, DomainId, SubjectKind};
use strata_domain::{Channel, Connection, ConnectionType, EntityKind, EntitySummary, Group};

use crate::channel_ports::ChannelRepository;
use crate::group_ports::{GroupDependents, GroupRepository};
use crate::operations::{ChannelOperations, CreateChannelInput, EntityDirectory};
use crate::permission_resolver::{AccessCheck, PermissionResolver};
use crate::role_registry::RoleRegistry;

/// Connection check requested by a peer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAuthorization {
    /// Domain of the request; mandatory for users.
    pub domain_id: String,
    /// Target channel.
    pub channel_id: String,
    /// Subject identifier.
    pub client_id: String,
    /// Subject kind, `user` or `client`.
    pub client_type: String,
    /// Traffic direction, `publish` or `subscribe`.
    pub connection_type: String,
}

/// Channel service with the peer hooks used by other services.
#[derive(Clone)]
pub struct ChannelService {
    repository: Arc<dyn ChannelRepository>,
    groups: Arc<dyn GroupRepository>,
    roles: RoleRegistry,
    resolver: PermissionResolver,
}

impl ChannelService {
    /// Creates a channel service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ChannelRepository>,
        groups: Arc<dyn GroupRepository>,
        roles: RoleRegistry,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            repository,
            groups,
            roles,
            resolver,
        }
    }

    /// Answers whether a subject may use a connection type on a channel.
    ///
    /// Users resolve through roles and the policy service; clients resolve
    /// through the connection set of the channel.
    pub async fn authorize(&self, request: ConnectionAuthorization) -> AppResult<bool> {
        let subject_kind = SubjectKind::from_str(request.client_type.as_str())?;
        let domain_id = match subject_kind {
            SubjectKind::User => Some(DomainId::new(request.domain_id.as_str())?),
            SubjectKind::Client if request.domain_id.trim().is_empty() => None,
            SubjectKind::Client => Some(DomainId::new(request.domain_id.as_str())?),
        };
        let connection_type = ConnectionType::from_str(request.connection_type.as_str())?;
        if request.client_id.trim().is_empty() || request.channel_id.trim().is_empty() {
            return Err(AppError::Validation(
                "channel id and client id are required".to_owned(),
            ));
        }

        let Some(channel) = self.repository.find_channel(&request.channel_id).await? else {
            return Ok(false);
        };
        if domain_id
            .as_ref()
            .is_some_and(|domain_id| domain_id != channel.domain_id())
        {
            return Ok(false);
        }

        match subject_kind {
            SubjectKind::User => {
                let caller =
                    CallerIdentity::new(request.client_id.as_str(), subject_kind, domain_id);
                let action = connection_type.required_action();
                let decision = self
                    .resolver
                    .decide(
                        &caller,
                        AccessCheck {
                            entity_id: channel.id(),
                            entity_kind: EntityKind::Channel,
                            action,
                            external_permission: Some(action),
                        },
                    )
                    .await?;
                Ok(decision.is_granted())
            }
            SubjectKind::Client => {
                self.repository
                    .has_connection(&Connection {
                        channel_id: channel.id().to_owned(),
                        client_id: request.client_id,
                        domain_id: channel.domain_id().clone(),
                        connection_type,
                    })
                    .await
            }
        }
    }

    /// Removes every connection of a deleted client.
    pub async fn remove_client_connections(&self, client_id: &str) -> AppResult<()> {
        if client_id.trim().is_empty() {
            return Err(AppError::Validation("client id is required".to_owned()));
        }

        let removed = self.repository.remove_client_connections(client_id).await?;
        info!(client_id, removed, "client connections removed");
        Ok(())
    }

    /// Clears the parent group of every channel under a deleted group.
    pub async fn unset_parent_group_from_channels(&self, group_id: &str) -> AppResult<()> {
        if group_id.trim().is_empty() {
            return Err(AppError::Validation("group id is required".to_owned()));
        }

        self.groups_deleted(&[group_id.to_owned()]).await
    }

    async fn load_channel(&self, domain_id: &DomainId, channel_id: &str) -> AppResult<Channel> {
        match self.repository.find_channel(channel_id).await? {
            Some(channel) if channel.domain_id() == domain_id => Ok(channel),
            _ => Err(AppError::NotFound(format!(
                "channel '{channel_id}' was not found in domain '{domain_id}'"
            ))),
        }
    }

    async fn load_group(&self, domain_id: &DomainId, group_id: &str) -> AppResult<Group> {
        match self.groups.find_group(group_id).await? {
            Some(group) if !group.is_deleted() && group.domain_id() == domain_id => Ok(group),
            _ => Err(AppError::NotFound(format!(
                "group '{group_id}' was not found in domain '{domain_id}'"
            ))),
        }
    }
}

fn connections(
    channel: &Channel,
    client_ids: &[String],
    connection_types: &[ConnectionType],
) -> AppResult<Vec<Connection>> {
    if client_ids.is_empty() || connection_types.is_empty() {
        return Err(AppError::Validation(
            "client ids and connection types must not be empty".to_owned(),
        ));
    }
    if client_ids.iter().any(|client_id| client_id.trim().is_empty()) {
        return Err(AppError::Validation("client ids must not be blank".to_owned()));
    }

    Ok(client_ids
        .iter()
        .flat_map(|client_id| {
            connection_types.iter().map(move |connection_type| Connection {
                channel_id: channel.id().to_owned(),
                client_id: client_id.clone(),
                domain_id: channel.domain_id().clone(),
                connection_type: *connection_type,
            })
        })
        .collect())
}

#[async_trait]
impl ChannelOperations for ChannelService {
    async fn create_channel(
        &self,
        caller: &CallerIdentity,
        input: CreateChannelInput,
    ) -> AppResult<Channel> {
        let domain_id = caller.require_domain()?;
        let mut channel = Channel::new(
            Uuid::new_v4().to_string(),
            domain_id.clone(),
            input.name,
            caller.subject(),
            Utc::now(),
        )?;
        if let Some(group_id) = input.parent_group_id.as_deref() {
            let group = self.load_group(domain_id, group_id).await?;
            channel.set_parent_group(Some(group.id().to_owned()));
        }

        let channel = self.repository.create_channel(channel).await?;
        if let Err(error) = self
            .roles
            .provision_built_in_roles(channel.id(), EntityKind::Channel, caller.subject())
            .await
        {
            self.repository.delete_channel(channel.id()).await?;
            return Err(error);
        }

        info!(channel_id = channel.id(), domain_id = %domain_id, "channel created");
        Ok(channel)
    }

    async fn view_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<Channel> {
        self.load_channel(caller.require_domain()?, channel_id).await
    }

    async fn delete_channel(&self, caller: &CallerIdentity, channel_id: &str) -> AppResult<()> {
        let channel = self.load_channel(caller.require_domain()?, channel_id).await?;
        self.repository.delete_channel(channel.id()).await?;
        self.roles
            .remove_entity_roles(&[channel.id().to_owned()])
            .await
    }

    async fn connect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        let channel = self.load_channel(caller.require_domain()?, channel_id).await?;
        let connections = connections(&channel, client_ids, connection_types)?;
        self.repository.add_connections(&connections).await
    }

    async fn disconnect(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        client_ids: &[String],
        connection_types: &[ConnectionType],
    ) -> AppResult<()> {
        let channel = self.load_channel(caller.require_domain()?, channel_id).await?;
        let connections = connections(&channel, client_ids, connection_types)?;
        self.repository.remove_connections(&connections).await
    }

    async fn set_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
        group_id: &str,
    ) -> AppResult<()> {
        let domain_id = caller.require_domain()?;
        let mut channel = self.load_channel(domain_id, channel_id).await?;
        match channel.parent_group_id() {
            Some(current) if current == group_id => return Ok(()),
            Some(current) => {
                return Err(AppError::Conflict(format!(
                    "channel '{channel_id}' already belongs to group '{current}'"
                )));
            }
            None => {}
        }

        let group = self.load_group(domain_id, group_id).await?;
        channel.set_parent_group(Some(group.id().to_owned()));
        self.repository.update_channel(channel).await?;
        Ok(())
    }

    async fn remove_parent_group(
        &self,
        caller: &CallerIdentity,
        channel_id: &str,
    ) -> AppResult<()> {
        let mut channel = self.load_channel(caller.require_domain()?, channel_id).await?;
        if channel.parent_group_id().is_none() {
            return Ok(());
        }

        channel.set_parent_group(None);
        self.repository.update_channel(channel).await?;
        Ok(())
    }
}

#[async_trait]
impl EntityDirectory for ChannelService {
    async fn retrieve_entity(&self, entity_id: &str) -> AppResult<EntitySummary> {
        match self.repository.find_channel(entity_id).await? {
            Some(channel) => Ok(EntitySummary::from(&channel)),
            None => Err(AppError::NotFound(format!(
                "channel '{entity_id}' was not found"
            ))),
        }
    }
}

#[async_trait]
impl GroupDependents for ChannelService {
    async fn groups_deleted(&self, group_ids: &[String]) -> AppResult<()> {
        let detached = self.repository.unset_parent_groups(group_ids).await?;
        info!(groups = group_ids.len(), detached, "channel parent groups cleared");
        Ok(())
    }
}
