use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use strata_core::{CallerIdentity, Page};

use crate::dto::{
    AddParentRequest, ChildrenRequest, CreateGroupRequest, GroupListParams, GroupResponse,
    HierarchyEntryResponse, HierarchyParams, PageParams, UpdateGroupRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{Created, created};

mod hierarchy;

pub use hierarchy::{
    add_children_groups_handler, add_parent_group_handler, list_children_groups_handler,
    remove_all_children_groups_handler, remove_children_groups_handler,
    remove_parent_group_handler, retrieve_group_hierarchy_handler,
};

pub async fn create_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(payload): Json<CreateGroupRequest>,
) -> ApiResult<Created<GroupResponse>> {
    let group = state
        .group_operations
        .create_group(&caller, payload.into())
        .await?;

    Ok(created(
        format!("/api/groups/{}", group.id()),
        GroupResponse::from(group),
    ))
}

pub async fn view_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state.group_operations.view_group(&caller, &group_id).await?;
    Ok(Json(GroupResponse::from(group)))
}

pub async fn update_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<UpdateGroupRequest>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state
        .group_operations
        .update_group(&caller, &group_id, payload.into())
        .await?;
    Ok(Json(GroupResponse::from(group)))
}

pub async fn list_groups_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(params): Query<GroupListParams>,
) -> ApiResult<Json<Page<GroupResponse>>> {
    let page = state
        .group_operations
        .list_groups(&caller, params.into_query()?)
        .await?;
    Ok(Json(page.map(GroupResponse::from)))
}

pub async fn enable_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state
        .group_operations
        .enable_group(&caller, &group_id)
        .await?;
    Ok(Json(GroupResponse::from(group)))
}

pub async fn disable_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupResponse>> {
    let group = state
        .group_operations
        .disable_group(&caller, &group_id)
        .await?;
    Ok(Json(GroupResponse::from(group)))
}

pub async fn delete_group_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .group_operations
        .delete_group(&caller, &group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
