//! User API endpoints.

use axum::{
    extract::{Path, State},
    response::Redirect,
    Json,
};

use super::{ApiResult, AppForm};
use crate::errors::AppError;
use crate::models::{LoginRequest, User};
use crate::AppState;

/// POST /users/login - Register or recognize a user, then open the board as them.
pub async fn login(
    State(state): State<AppState>,
    AppForm(request): AppForm<LoginRequest>,
) -> Result<Redirect, AppError> {
    request.validate()?;

    let user = state.repo.login(&request).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Redirect::to(&format!("/?id={}", user.id)))
}

/// GET /users/:id - Get a single user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    state
        .repo
        .get_user(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}
