use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_application::CreateChannelInput;
use strata_core::{AppError, AppResult};
use strata_domain::{Channel, ConnectionType};

/// Incoming payload for channel creation.
#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub parent_group_id: Option<String>,
}

impl From<CreateChannelRequest> for CreateChannelInput {
    fn from(value: CreateChannelRequest) -> Self {
        Self {
            name: value.name,
            parent_group_id: value
                .parent_group_id
                .filter(|group_id| !group_id.trim().is_empty()),
        }
    }
}

/// Incoming payload for connect and disconnect.
#[derive(Debug, Deserialize)]
pub struct ConnectionsRequest {
    pub client_ids: Vec<String>,
    pub types: Vec<String>,
}

impl ConnectionsRequest {
    pub fn connection_types(&self) -> AppResult<Vec<ConnectionType>> {
        if self.types.is_empty() {
            return Err(AppError::Validation(
                "at least one connection type is required".to_owned(),
            ));
        }

        let mut connection_types = self
            .types
            .iter()
            .map(|value| ConnectionType::from_str(value.as_str()))
            .collect::<AppResult<Vec<_>>>()?;
        connection_types.sort();
        connection_types.dedup();
        Ok(connection_types)
    }
}

/// Incoming payload for attaching a channel to a group.
#[derive(Debug, Deserialize)]
pub struct SetParentGroupRequest {
    pub group_id: String,
}

/// API representation of a channel.
#[derive(Debug, Serialize)]
pub struct ChannelResponse {
    pub id: String,
    pub domain_id: String,
    pub parent_group_id: Option<String>,
    pub name: String,
    pub status: &'static str,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<Channel> for ChannelResponse {
    fn from(value: Channel) -> Self {
        Self {
            id: value.id().to_owned(),
            domain_id: value.domain_id().to_string(),
            parent_group_id: value.parent_group_id().map(str::to_owned),
            name: value.name().to_owned(),
            status: value.status().as_str(),
            created_by: value.created_by().to_owned(),
            created_at: value.created_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_domain::ConnectionType;

    use super::ConnectionsRequest;

    #[test]
    fn connection_types_are_parsed_and_deduplicated() {
        let request = ConnectionsRequest {
            client_ids: vec!["client-1".to_owned()],
            types: vec![
                "subscribe".to_owned(),
                "publish".to_owned(),
                "subscribe".to_owned(),
            ],
        };

        assert_eq!(
            request.connection_types().unwrap_or_default(),
            vec![ConnectionType::Publish, ConnectionType::Subscribe]
        );
    }

    #[test]
    fn unknown_or_missing_connection_types_are_rejected() {
        let unknown = ConnectionsRequest {
            client_ids: vec!["client-1".to_owned()],
            types: vec!["both".to_owned()],
        };
        assert!(unknown.connection_types().is_err());

        let empty = ConnectionsRequest {
            client_ids: vec!["client-1".to_owned()],
            types: Vec::new(),
        };
        assert!(empty.connection_types().is_err());
    }
}
