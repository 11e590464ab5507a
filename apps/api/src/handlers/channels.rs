use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;

use strata_core::CallerIdentity;

use crate::dto::{ChannelResponse, ConnectionsRequest, CreateChannelRequest, SetParentGroupRequest};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{Created, created};

pub async fn create_channel_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(payload): Json<CreateChannelRequest>,
) -> ApiResult<Created<ChannelResponse>> {
    let channel = state
        .channel_operations
        .create_channel(&caller, payload.into())
        .await?;

    Ok(created(
        format!("/api/channels/{}", channel.id()),
        ChannelResponse::from(channel),
    ))
}

pub async fn view_channel_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<ChannelResponse>> {
    let channel = state
        .channel_operations
        .view_channel(&caller, &channel_id)
        .await?;
    Ok(Json(ChannelResponse::from(channel)))
}

pub async fn delete_channel_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .channel_operations
        .delete_channel(&caller, &channel_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn connect_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
    Json(payload): Json<ConnectionsRequest>,
) -> ApiResult<StatusCode> {
    let connection_types = payload.connection_types()?;
    state
        .channel_operations
        .connect(&caller, &channel_id, &payload.client_ids, &connection_types)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn disconnect_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
    Json(payload): Json<ConnectionsRequest>,
) -> ApiResult<StatusCode> {
    let connection_types = payload.connection_types()?;
    state
        .channel_operations
        .disconnect(&caller, &channel_id, &payload.client_ids, &connection_types)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_parent_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
    Json(payload): Json<SetParentGroupRequest>,
) -> ApiResult<StatusCode> {
    state
        .channel_operations
        .set_parent_group(&caller, &channel_id, &payload.group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_parent_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(channel_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .channel_operations
        .remove_parent_group(&caller, &channel_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
