use super::*;

pub async fn role_add_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<ActionsRequest>,
) -> ApiResult<Json<Vec<String>>> {
    let actions = state
        .group_role_operations
        .role_add_actions(&caller, &group_id, &role_id, payload.actions)
        .await?;
    Ok(Json(actions))
}

pub async fn role_list_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<String>>> {
    let actions = state
        .group_role_operations
        .role_list_actions(&caller, &group_id, &role_id)
        .await?;
    Ok(Json(actions))
}

pub async fn role_check_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<ActionsRequest>,
) -> ApiResult<Json<CheckResponse>> {
    let exists = state
        .group_role_operations
        .role_check_actions_exist(&caller, &group_id, &role_id, payload.actions)
        .await?;
    Ok(Json(CheckResponse { exists }))
}

pub async fn role_remove_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<ActionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .role_remove_actions(&caller, &group_id, &role_id, payload.actions)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn role_remove_all_actions_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .role_remove_all_actions(&caller, &group_id, &role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
