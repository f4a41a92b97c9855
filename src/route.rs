//! Route definitions for the Ledgerly API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    create_link, delete_link, export_links, health, import_links, list_community_links,
    list_my_links, list_public_links, list_starred_links, list_trending_links, register_click,
    toggle_star, update_link,
};
use crate::middleware::auth_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /health` - Liveness probe (public)
/// - `GET|POST /api/links` - Public listing / create
/// - `GET /api/links/my-links|community|starred|trending` - Viewer-scoped listings
/// - `GET /api/links/export` - Download the caller's links
/// - `POST /api/links/import` - Bulk import
/// - `PUT|DELETE /api/links/{id}` - Owner-only update / delete
/// - `POST /api/links/{id}/click` - Count a visit
/// - `PUT /api/links/{id}/star` - Toggle the caller's star
///
/// Every `/api/links` route requires a bearer token.
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/links", get(list_public_links).post(create_link))
        .route("/api/links/my-links", get(list_my_links))
        .route("/api/links/community", get(list_community_links))
        .route("/api/links/starred", get(list_starred_links))
        .route("/api/links/trending", get(list_trending_links))
        .route("/api/links/export", get(export_links))
        .route("/api/links/import", post(import_links))
        .route("/api/links/{id}", put(update_link).delete(delete_link))
        .route("/api/links/{id}/click", post(register_click))
        .route("/api/links/{id}/star", put(toggle_star))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .with_state(state)
}
