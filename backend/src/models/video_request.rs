//! Video request model and the payloads that create, update and list it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Votes;
use crate::errors::AppError;

/// Maximum length of a topic title, in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Fulfillment status of a request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Planned,
    Done,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Planned => "planned",
            RequestStatus::Done => "done",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "planned" => Ok(RequestStatus::Planned),
            "done" => Ok(RequestStatus::Done),
            other => Err(format!("Unknown status: {}", other)),
        }
    }
}

/// Audience level the requested video targets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetLevel {
    #[default]
    Beginner,
    Medium,
    Advanced,
}

impl TargetLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLevel::Beginner => "beginner",
            TargetLevel::Medium => "medium",
            TargetLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for TargetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(TargetLevel::Beginner),
            "medium" => Ok(TargetLevel::Medium),
            "advanced" => Ok(TargetLevel::Advanced),
            other => Err(format!("Unknown target level: {}", other)),
        }
    }
}

/// Link to the video that fulfilled a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoRef {
    pub link: String,
    pub date: DateTime<Utc>,
}

/// A submitted topic proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    pub id: String,
    pub topic_title: String,
    pub topic_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    pub target_level: TargetLevel,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    pub submit_date: DateTime<Utc>,
    pub votes: Votes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_ref: Option<VideoRef>,
}

/// Validated submission, built from the multipart form.
#[derive(Debug, Clone, Default)]
pub struct CreateVideoRequest {
    pub topic_title: String,
    pub topic_details: String,
    pub expected_result: Option<String>,
    pub target_level: TargetLevel,
    pub author_id: Option<String>,
}

impl CreateVideoRequest {
    /// Build a submission from raw form fields. Empty optional fields count as absent.
    pub fn from_fields(mut fields: HashMap<String, String>) -> Result<Self, AppError> {
        let mut take = |name: &str| {
            fields
                .remove(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let topic_title = take("topic_title").unwrap_or_default();
        let topic_details = take("topic_details").unwrap_or_default();
        let expected_result = take("expected_result");
        let target_level = match take("target_level") {
            Some(level) => level.parse().map_err(AppError::Validation)?,
            None => TargetLevel::default(),
        };
        let author_id = take("author_id");

        let request = Self {
            topic_title,
            topic_details,
            expected_result,
            target_level,
            author_id,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.topic_title.trim().is_empty() {
            return Err(AppError::Validation("Topic title is required".to_string()));
        }
        if self.topic_title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Topic title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if self.topic_details.trim().is_empty() {
            return Err(AppError::Validation("Topic details are required".to_string()));
        }
        Ok(())
    }
}

/// Request body for updating the status and video link of a request.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVideoRequest {
    pub status: RequestStatus,
    #[serde(default)]
    pub res_video: Option<String>,
}

impl UpdateVideoRequest {
    /// The fulfillment link, if a non-empty one was given.
    pub fn video_link(&self) -> Option<&str> {
        self.res_video
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

/// Ordering of request lists.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    NewlyAdded,
    TopVoted,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::NewlyAdded => "newlyAdded",
            SortBy::TopVoted => "topVoted",
        }
    }
}

/// Query parameters accepted by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub search_key: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl ListQuery {
    /// The trimmed search key, or `None` when searching is not requested.
    pub fn search(&self) -> Option<&str> {
        self.search_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
