use super::*;

pub async fn role_add_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<MembersRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .role_add_members(&caller, &group_id, &role_id, payload.members)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn role_list_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<String>>> {
    let page = state
        .group_role_operations
        .role_list_members(&caller, &group_id, &role_id, params.into_page_query()?)
        .await?;
    Ok(Json(page))
}

pub async fn role_check_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<MembersRequest>,
) -> ApiResult<Json<CheckResponse>> {
    let exists = state
        .group_role_operations
        .role_check_members_exist(&caller, &group_id, &role_id, payload.members)
        .await?;
    Ok(Json(CheckResponse { exists }))
}

pub async fn role_remove_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
    Json(payload): Json<MembersRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .role_remove_members(&caller, &group_id, &role_id, payload.members)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn role_remove_all_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path((group_id, role_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .role_remove_all_members(&caller, &group_id, &role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_entity_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Page<EntityMemberResponse>>> {
    let page = state
        .group_role_operations
        .list_entity_members(&caller, &group_id, params.into_page_query()?)
        .await?;
    Ok(Json(page.map(EntityMemberResponse::from)))
}

pub async fn remove_entity_members_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(group_id): Path<String>,
    Json(payload): Json<MembersRequest>,
) -> ApiResult<StatusCode> {
    state
        .group_role_operations
        .remove_entity_members(&caller, &group_id, payload.members)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
