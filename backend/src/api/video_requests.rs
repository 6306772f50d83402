//! Video request API endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Serialize;

use super::{ApiResult, AppJson, AppQuery};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    CreateVideoRequest, ListQuery, UpdateVideoRequest, VideoRequest, VoteRequest, VoteTally,
};
use crate::AppState;

/// Body returned after a delete.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

/// Run a list query: a title search when a search key is present, otherwise the full list.
pub async fn find_requests(
    repo: &Repository,
    query: &ListQuery,
) -> Result<Vec<VideoRequest>, AppError> {
    match query.search() {
        Some(key) => repo.search_requests(key, query.sort_by, query.limit).await,
        None => repo.list_requests(query.sort_by, query.limit).await,
    }
}

/// GET /video-request - List or search requests.
pub async fn list_requests(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> ApiResult<Vec<VideoRequest>> {
    find_requests(&state.repo, &query).await.map(Json)
}

/// GET /video-request/:id - Get a single request.
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<VideoRequest> {
    state
        .repo
        .get_request(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Video request {} not found", id)))
}

/// POST /video-request - Submit a new request from multipart form data.
pub async fn create_request(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<VideoRequest> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;
        fields.insert(name, value);
    }

    let request = CreateVideoRequest::from_fields(fields)?;
    let created = state.repo.create_request(&request).await?;
    tracing::info!(request_id = %created.id, title = %created.topic_title, "Created video request");

    Ok(Json(created))
}

/// PUT /video-request/:id - Update status and fulfillment link (admin).
pub async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateVideoRequest>,
) -> ApiResult<VideoRequest> {
    let updated = state.repo.update_request(&id, &request).await?;
    tracing::info!(request_id = %id, status = %updated.status, "Updated video request");

    Ok(Json(updated))
}

/// DELETE /video-request/:id - Delete a request and its votes (admin).
pub async fn delete_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.repo.delete_request(&id).await?;
    tracing::info!(request_id = %id, "Deleted video request");

    Ok(Json(DeletedResponse { deleted: id }))
}

/// PUT /video-request/vote - Toggle the caller's vote and return the new tally.
pub async fn vote(
    State(state): State<AppState>,
    AppJson(request): AppJson<VoteRequest>,
) -> ApiResult<VoteTally> {
    let voter_id = request.user_id.trim();
    if voter_id.is_empty() {
        return Err(AppError::Validation("user_id is required to vote".to_string()));
    }

    let votes = state
        .repo
        .toggle_vote(&request.id, request.vote_type, voter_id)
        .await?;
    tracing::debug!(request_id = %request.id, vote_type = %request.vote_type, "Toggled vote");

    Ok(Json(VoteTally::new(request.id, &votes)))
}
