//! REST API module.
//!
//! JSON endpoints for video requests, votes and users.

mod users;
mod video_requests;

pub use users::*;
pub use video_requests::*;

use axum::extract::{FromRequest, FromRequestParts};
use axum::Json;

use crate::errors::AppError;

/// Success bodies are the bare resource; failures use the error envelope.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// JSON body extractor whose rejections are rendered as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections are rendered as [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// URL-encoded form extractor whose rejections are rendered as [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct AppForm<T>(pub T);
