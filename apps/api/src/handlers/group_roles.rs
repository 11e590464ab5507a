use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;

use strata_core::{CallerIdentity, Page};

use crate::dto::{
    ActionsRequest, CheckResponse, CreateRoleRequest, EntityMemberResponse, MembersRequest,
    PageParams, RenameRoleRequest, RoleResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

use super::{Created, created};

mod actions;
mod members;

pub use actions::{
    role_add_actions_handler, role_check_actions_handler, role_list_actions_handler,
    role_remove_actions_handler, role_remove_all_actions_handler,
};
pub use members::{
    list_entity_members_handler, remove_entity_members_handler, role_add_members_handler,
    role_check_members_handler, role_list_members_handler, role_remove_all_members_handler,
    role_remove_members_handler,
};

pub async fn add_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<Created<RoleResponse>> {
    let role = state
        .group_role_operations
        .add_role(&caller, &group_id, payload.into())
        .await?;

    Ok(created(
        format!("/api/groups/{group_id}/roles/{}", role.id()),
        RoleResponse::from(role),
    ))
}

pub async fn retrieve_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .group_role_operations
        .retrieve_role(&caller, &group_id, &role_id)
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

pub async fn retrieve_all_roles_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<RoleResponse>>> {
    let page = state
        .group_role_operations
        .retrieve_all_roles(&caller, &group_id, params.into_page_query()?)
        .await?;
    Ok(Json(page.map(RoleResponse::from)))
}

pub async fn rename_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<RenameRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .group_role_operations
        .update_role_name(&caller, &group_id, &role_id, &payload.name)
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

pub async fn remove_role_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .remove_role(&caller, &group_id, &role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_available_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    let actions = state
        .group_role_operations
        .list_available_actions(&caller, &group_id)
        .await?;
    Ok(Json(actions))
}
