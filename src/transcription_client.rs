// Transcription service client for Video Relay API
//
// Forwards uploaded videos to the upstream speech-to-text service as a multipart
// request and extracts the transcription from its JSON answer. The credential is
// part of the client's configuration, given once at construction.

use log::{debug, info};
use reqwest::multipart;
use serde_json::Value;
use thiserror::Error;

use crate::config::TranscriptionConfig;

/// Field of the upstream JSON body holding the result
pub const TRANSCRIPTION_FIELD: &str = "transcription";

/// File name and content type announced for the forwarded video
const UPLOAD_FILE_NAME: &str = "input.webm";
const UPLOAD_CONTENT_TYPE: &str = "video/webm";

/// Errors talking to the transcription service
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("no API key configured for the transcription service")]
    MissingApiKey,

    /// Network failure, timeout or request construction error
    #[error("request to transcription service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transcription service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transcription service returned invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transcription service response has no 'transcription' field")]
    MissingField,
}

/// HTTP client for the upstream transcription service
#[derive(Clone, Debug)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl TranscriptionClient {
    /// Build a client whose requests are bounded by the configured timeout
    pub fn new(config: TranscriptionConfig) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Send `video` to the service and return its transcription value
    ///
    /// One attempt is made; any failure is returned to the caller.
    pub async fn transcribe(&self, video: Vec<u8>) -> Result<Value, TranscriptionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(TranscriptionError::MissingApiKey)?;

        let video_size = video.len();
        let video_part = multipart::Part::bytes(video)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_CONTENT_TYPE)?;

        let form = multipart::Form::new()
            .part("video", video_part)
            .text("tier", self.config.tier.clone())
            .text("api_key", api_key.to_string());

        debug!(
            "Sending {} bytes to transcription service at {}",
            video_size,
            self.config.endpoint
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let transcription = extract_transcription(&body)?;

        info!(
            "Transcription received from upstream ({} response bytes)",
            body.len()
        );
        Ok(transcription)
    }
}

/// Pull the `transcription` value out of an upstream JSON body, untouched
pub fn extract_transcription(body: &[u8]) -> Result<Value, TranscriptionError> {
    let mut value: Value = serde_json::from_slice(body)?;
    value
        .get_mut(TRANSCRIPTION_FIELD)
        .map(Value::take)
        .ok_or(TranscriptionError::MissingField)
}
