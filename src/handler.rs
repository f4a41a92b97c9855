//! HTTP request handlers for the link API
//!
//! Every handler here runs behind the auth middleware and receives the
//! caller as an `Extension<CurrentUser>`. Handlers validate input, delegate
//! to the store or the query/exchange modules, and shape the JSON response.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::database::AppState;
use crate::error::{AppError, AppResult};
use crate::exchange::{self, ExportFormat, ExportRecord, ImportRequest, ImportSummary};
use crate::extractors::JsonBody;
use crate::middleware::CurrentUser;
use crate::model::{CreateLinkRequest, Link, LinkView, UpdateLinkRequest};
use crate::query::{self, View};

fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn list_view(state: &AppState, view: View, user: &CurrentUser) -> AppResult<Json<Vec<LinkView>>> {
    let links = query::list(&state.store, view, &user.id)?;
    tracing::debug!(?view, viewer = %user.id, count = links.len(), "listed links");
    Ok(Json(links))
}

/// `GET /api/links` - official and community links, curated first
pub async fn list_public_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<LinkView>>> {
    list_view(&state, View::Public, &user)
}

/// `GET /api/links/my-links`
pub async fn list_my_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<LinkView>>> {
    list_view(&state, View::Mine, &user)
}

/// `GET /api/links/community`
pub async fn list_community_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<LinkView>>> {
    list_view(&state, View::Community, &user)
}

/// `GET /api/links/starred`
pub async fn list_starred_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<LinkView>>> {
    list_view(&state, View::Starred, &user)
}

/// `GET /api/links/trending`
pub async fn list_trending_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<Vec<LinkView>>> {
    list_view(&state, View::Trending, &user)
}

/// Creates a new link for the caller
///
/// # Response
///
/// - **201 Created** - the stored link
/// - **400 Bad Request** - missing title/url, or the caller already saved
///   this URL (body carries `existingLink`)
pub async fn create_link(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(payload): JsonBody<CreateLinkRequest>,
) -> AppResult<(StatusCode, Json<Link>)> {
    require_non_empty("title", &payload.title)?;
    require_non_empty("url", &payload.url)?;

    let link = state.store.insert_unique(payload.into_link(&user.id))?;
    tracing::info!(link_id = %link.id, user_id = %user.id, "link created");

    Ok((StatusCode::CREATED, Json(link)))
}

/// Applies a partial update to a link owned by the caller
///
/// The URL is not re-checked for duplicates here.
pub async fn update_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(payload): JsonBody<UpdateLinkRequest>,
) -> AppResult<Json<Link>> {
    if let Some(title) = &payload.title {
        require_non_empty("title", title)?;
    }
    if let Some(url) = &payload.url {
        require_non_empty("url", url)?;
    }

    let link = state.store.update(&id, |link| {
        if link.user != user.id {
            return Err(AppError::NotOwner);
        }
        link.apply(payload);
        Ok(())
    })?;
    tracing::info!(link_id = %id, user_id = %user.id, "link updated");

    Ok(Json(link))
}

/// Permanently deletes a link owned by the caller
pub async fn delete_link(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<serde_json::Value>> {
    state.store.delete(&id, &user.id)?;
    tracing::info!(link_id = %id, user_id = %user.id, "link deleted");

    Ok(Json(json!({
        "message": "Link deleted successfully",
        "deletedId": id,
    })))
}

/// Stars or un-stars a link for the caller and returns it as the caller sees it
pub async fn toggle_star(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<Json<LinkView>> {
    let link = state.store.toggle_star(&id, &user.id)?;
    let view = LinkView::for_viewer(link, &user.id);
    tracing::debug!(link_id = %id, user_id = %user.id, starred = view.is_starred, "star toggled");

    Ok(Json(view))
}

/// Counts one visit to a link
pub async fn register_click(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let clicks = state.store.increment_clicks(&id)?;
    tracing::debug!(link_id = %id, clicks, "click registered");

    Ok(Json(json!({ "message": "Click registered" })))
}

#[derive(Deserialize, Debug, Default)]
pub struct ExportParams {
    pub format: Option<String>,
}

/// Downloads all of the caller's links as an attachment
///
/// `GET /api/links/export?format=json|csv|html`
pub async fn export_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<ExportParams>,
) -> AppResult<Response> {
    let format = ExportFormat::parse(params.format.as_deref())?;
    let records: Vec<ExportRecord> = state
        .store
        .links_by_owner(&user.id)?
        .iter()
        .map(|link| ExportRecord::new(link, &user.id))
        .collect();
    let body = exchange::render(format, &records)?;
    tracing::info!(user_id = %user.id, count = records.len(), ?format, "links exported");

    let disposition = format!(
        "attachment; filename=\"ledgerly-links.{}\"",
        format.extension()
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Bulk-imports links for the caller
///
/// Invalid and duplicate entries are skipped. The request only fails when
/// nothing is left to import.
pub async fn import_links(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(payload): JsonBody<ImportRequest>,
) -> AppResult<Json<ImportSummary>> {
    let (links, invalid) = exchange::prepare_import(&user.id, payload);
    let (imported, duplicates) = state.store.insert_batch(&user.id, links)?;
    let summary = ImportSummary {
        imported,
        skipped: invalid + duplicates,
    };

    if summary.imported == 0 {
        return Err(AppError::Validation(
            "No new links to import: every entry was a duplicate or had an invalid URL".to_string(),
        ));
    }

    tracing::info!(
        user_id = %user.id,
        imported = summary.imported,
        skipped = summary.skipped,
        "links imported"
    );
    Ok(Json(summary))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
