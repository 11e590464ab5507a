use serde::{Deserialize, Serialize};
use strata_application::ConnectionAuthorization;
use strata_domain::EntitySummary;

/// Connection check sent by a peer service.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub domain_id: String,
    pub channel_id: String,
    pub client_id: String,
    pub client_type: String,
    pub connection_type: String,
}

impl From<AuthorizeRequest> for ConnectionAuthorization {
    fn from(value: AuthorizeRequest) -> Self {
        Self {
            domain_id: value.domain_id,
            channel_id: value.channel_id,
            client_id: value.client_id,
            client_type: value.client_type,
            connection_type: value.connection_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
}

/// Minimal entity data served to peer services.
#[derive(Debug, Serialize)]
pub struct EntitySummaryResponse {
    pub id: String,
    pub domain_id: String,
    pub parent_group_id: Option<String>,
    pub status: &'static str,
}

impl From<EntitySummary> for EntitySummaryResponse {
    fn from(value: EntitySummary) -> Self {
        Self {
            id: value.id,
            domain_id: value.domain_id.to_string(),
            parent_group_id: value.parent_group_id,
            status: value.status.as_str(),
        }
    }
}
