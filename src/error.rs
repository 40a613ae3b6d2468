// Error handling for Video Relay API
//
// This module defines the error taxonomy of the HTTP layer and how each error
// is rendered to the client. Upstream and encoder failures have their own enums
// in their modules and are folded into `HandlerError` at the handler boundary.

use std::io;

use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::encoder::EncoderError;
use crate::models::ErrorResponse;
use crate::transcription_client::TranscriptionError;

/// Generic message returned for any upstream transcription failure
pub const TRANSCRIPTION_FAILED: &str = "Failed to transcribe video";

/// Message returned when the encoder could not produce the MP4 file
pub const CONVERSION_FAILED: &str = "Conversion failed";

/// Errors that can occur in the Video Relay API handlers
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Error when processing multipart form data
    #[error("Form error: {0}")]
    FormError(String),

    /// Error when no `video` field was provided
    #[error("No video file uploaded")]
    NoVideoFile,

    /// Error when a file is too large
    #[error("File too large: {0} bytes exceeds limit of {1} bytes")]
    FileTooLarge(usize, usize),

    /// Error when reading or writing temporary files
    #[error("File error: {0}")]
    FileError(#[from] io::Error),

    /// Error from the transcription service; the cause is only logged
    #[error("Failed to transcribe video")]
    Upstream(#[source] TranscriptionError),

    /// Error when the encoder fails; its diagnostics are returned as details
    #[error("Conversion failed: {0}")]
    Conversion(#[source] EncoderError),
}

impl HandlerError {
    /// Create a new FormError
    pub fn form_error<S: Into<String>>(msg: S) -> Self {
        Self::FormError(msg.into())
    }
}

impl ResponseError for HandlerError {
    fn error_response(&self) -> HttpResponse {
        match self {
            HandlerError::NoVideoFile | HandlerError::FormError(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::new(self.to_string()))
            }
            HandlerError::FileTooLarge(_, _) => {
                HttpResponse::PayloadTooLarge().json(ErrorResponse::new(self.to_string()))
            }
            HandlerError::Upstream(_) => {
                HttpResponse::InternalServerError().json(ErrorResponse::new(TRANSCRIPTION_FAILED))
            }
            HandlerError::Conversion(e) => HttpResponse::InternalServerError()
                .json(ErrorResponse::with_details(CONVERSION_FAILED, e.to_string())),
            HandlerError::FileError(_) => {
                HttpResponse::InternalServerError().json(ErrorResponse::new(self.to_string()))
            }
        }
    }
}

impl From<TranscriptionError> for HandlerError {
    fn from(err: TranscriptionError) -> Self {
        HandlerError::Upstream(err)
    }
}

impl From<EncoderError> for HandlerError {
    fn from(err: EncoderError) -> Self {
        HandlerError::Conversion(err)
    }
}
