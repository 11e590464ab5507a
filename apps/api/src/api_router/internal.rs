use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};

use crate::state::AppState;
use crate::{handlers, middleware};

pub(super) fn build_internal_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/internal/groups/{group_id}",
            get(handlers::internal::retrieve_group_entity_handler),
        )
        .route(
            "/api/internal/groups/{group_id}/channels",
            delete(handlers::internal::unset_parent_group_from_channels_handler),
        )
        .route(
            "/api/internal/channels/{channel_id}",
            get(handlers::internal::retrieve_channel_entity_handler),
        )
        .route(
            "/api/internal/channels/authorize",
            post(handlers::internal::authorize_handler),
        )
        .route(
            "/api/internal/clients/{client_id}/connections",
            delete(handlers::internal::remove_client_connections_handler),
        )
        .route(
            "/api/internal/members/{member_id}/roles",
            delete(handlers::internal::remove_member_from_all_roles_handler),
        )
        .route_layer(from_fn_with_state(
            app_state,
            middleware::require_internal_token,
        ))
}
