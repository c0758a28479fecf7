// API response models (DTOs)

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Returned by POST /upload; `task_id` is the token for progress polling.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: String,
    pub status: &'static str,
}

/// Returned by GET /progress/{task_id}.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: u8,
    pub status: String,
}

/// Returned by POST /webhooks/{id}/test. Fire-and-forget: the result is not
/// retrievable by this token.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub task_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            detail: message.into(),
        }
    }
}
