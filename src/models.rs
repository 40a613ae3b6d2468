// Video Relay API data models
//
// This module contains the request and response types used across the API.

use serde::Serialize;
use serde_json::Value;

/// Video received in the `video` multipart field
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    /// Raw file contents
    pub data: Vec<u8>,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    /// File name declared by the client, if any
    pub file_name: Option<String>,
}

impl UploadedVideo {
    /// Short description for request logs
    pub fn describe(&self) -> String {
        format!(
            "'{}' ({} bytes, {})",
            self.file_name.as_deref().unwrap_or("unnamed"),
            self.data.len(),
            self.content_type.as_deref().unwrap_or("no content type")
        )
    }
}

/// Response for a successful transcription request
#[derive(Serialize)]
pub struct TranscriptionResponse {
    /// Transcription value exactly as returned by the upstream service
    pub transcription: Value,
}

/// Error response for API
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Diagnostic output, only set for conversion failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details<S: Into<String>, D: Into<String>>(error: S, details: D) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
