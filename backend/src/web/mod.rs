//! Board UI: the server-rendered page, card fragments and the browser script.

mod render;

pub use render::*;

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};
use serde::Deserialize;

use crate::api::{find_requests, AppQuery};
use crate::errors::AppError;
use crate::models::{ListQuery, SortBy};
use crate::AppState;

/// Browser-side behavior of the board (voting, search, sorting, submission).
pub const APP_JS: &str = include_str!("../../assets/app.js");

/// Query parameters of the board page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// Id of the signed-in user.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub search_key: Option<String>,
}

/// GET / - The board, or the login form when no known user id is given.
pub async fn index(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PageQuery>,
) -> Result<Html<String>, AppError> {
    let user = match params.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => state.repo.get_user(id).await?,
        None => None,
    };

    let query = ListQuery {
        sort_by: params.sort_by,
        search_key: params.search_key,
        limit: None,
    };
    let requests = match user {
        Some(_) => find_requests(&state.repo, &query).await?,
        None => Vec::new(),
    };

    Ok(Html(render_page(&Page {
        user: user.as_ref(),
        query: &query,
        requests: &requests,
    })))
}

/// GET /assets/app.js
pub async fn app_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        APP_JS,
    )
}

/// GET /video-request/cards - Rendered cards for a list query.
pub async fn cards(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Html<String>, AppError> {
    let requests = find_requests(&state.repo, &query).await?;
    Ok(Html(render_cards(&requests)))
}

/// GET /video-request/:id/card - One rendered card.
pub async fn card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let request = state
        .repo
        .get_request(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video request {} not found", id)))?;
    Ok(Html(render_card(&request)))
}
