//! Routes called by peer services with the shared internal token.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::dto::{AuthorizeRequest, AuthorizeResponse, EntitySummaryResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn retrieve_group_entity_handler(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<EntitySummaryResponse>> {
    let entity = state.group_directory.retrieve_entity(&group_id).await?;
    Ok(Json(EntitySummaryResponse::from(entity)))
}

pub async fn retrieve_channel_entity_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<EntitySummaryResponse>> {
    let entity = state.channel_directory.retrieve_entity(&channel_id).await?;
    Ok(Json(EntitySummaryResponse::from(entity)))
}

pub async fn authorize_handler(
    State(state): State<AppState>,
    Json(payload): Json<AuthorizeRequest>,
) -> ApiResult<Json<AuthorizeResponse>> {
    let authorized = state.channel_service.authorize(payload.into()).await?;
    Ok(Json(AuthorizeResponse { authorized }))
}

pub async fn remove_client_connections_handler(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .channel_service
        .remove_client_connections(&client_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unset_parent_group_from_channels_handler(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .channel_service
        .unset_parent_group_from_channels(&group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member_from_all_roles_handler(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_registry
        .remove_member_from_all_roles(&member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
