//! Data models for the video request board.
//!
//! Field names are snake_case on the wire, matching the submission form.

mod user;
mod video_request;
mod vote;

pub use user::*;
pub use video_request::*;
pub use vote::*;
