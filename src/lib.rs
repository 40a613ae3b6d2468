// Video Relay API Library
//
// This crate provides an HTTP API that forwards uploaded videos to a
// transcription service and converts them to MP4 with an external encoder.

pub mod config;
pub mod config_loader;
pub mod config_validator;
pub mod cors;
pub mod encoder;
pub mod error;
pub mod file_utils;
pub mod handlers;
pub mod models;
pub mod transcription_client;

// Re-export common types for easier access
pub use config::{AppConfig, EncoderConfig, HandlerConfig, ServerConfig, TranscriptionConfig};
pub use config_validator::AppConfigValidator;
pub use encoder::{Encoder, EncoderError};
pub use error::HandlerError;
pub use handlers::{configure_routes, convert_to_mp4, index, transcribe};
pub use models::{ErrorResponse, TranscriptionResponse, UploadedVideo};
pub use transcription_client::{TranscriptionClient, TranscriptionError};
