// API route handlers for Video Relay API
//
// This module contains the HTTP endpoints: the liveness greeting, the
// transcription relay and the MP4 conversion.

use crate::config::HandlerConfig;
use crate::encoder::{Encoder, EncoderError};
use crate::error::HandlerError;
use crate::file_utils::TempMedia;
use crate::handlers::form::{extract_video, is_multipart};
use crate::models::TranscriptionResponse;
use crate::transcription_client::TranscriptionClient;
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};
use std::time::Instant;

/// Body of the liveness endpoint
pub const GREETING: &str = "Video relay API is running";

/// File name offered to the client for converted videos
pub const DOWNLOAD_FILE_NAME: &str = "converted_video.mp4";

pub const MP4_CONTENT_TYPE: &str = "video/mp4";

/// Liveness check
#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(GREETING)
}

/// Handler for transcription requests
///
/// Forwards the `video` upload to the transcription service and returns
/// `{"transcription": ...}` with the value the service produced. Upstream
/// failures are logged and answered with a generic 500.
#[post("/api/transcribe")]
pub async fn transcribe(
    req: HttpRequest,
    form: Multipart,
    config: web::Data<HandlerConfig>,
    client: web::Data<TranscriptionClient>,
) -> Result<HttpResponse, HandlerError> {
    if !is_multipart(&req) {
        return Err(HandlerError::NoVideoFile);
    }

    let start_time = Instant::now();
    let video = extract_video(form, config.max_file_size).await?;

    let description = video.describe();
    info!("Forwarding upload {} for transcription", description);

    let transcription = client.transcribe(video.data).await.map_err(|e| {
        error!("Error calling transcription service: {}", e);
        HandlerError::from(e)
    })?;

    info!(
        "Transcribed upload {} in {:.2}s",
        description,
        start_time.elapsed().as_secs_f64()
    );

    Ok(HttpResponse::Ok().json(TranscriptionResponse { transcription }))
}

/// Handler for MP4 conversion requests
///
/// Writes the `video` upload to a temporary file, runs the encoder on it and
/// returns the MP4 as an attachment. Both temporary files are gone before the
/// response is returned, whatever the outcome.
#[post("/api/convert-to-mp4")]
pub async fn convert_to_mp4(
    req: HttpRequest,
    form: Multipart,
    config: web::Data<HandlerConfig>,
    encoder: web::Data<Encoder>,
) -> Result<HttpResponse, HandlerError> {
    if !is_multipart(&req) {
        return Err(HandlerError::NoVideoFile);
    }

    let start_time = Instant::now();
    let video = extract_video(form, config.max_file_size).await?;

    let media = TempMedia::create(&config.temp_dir, &video.data).map_err(|e| {
        error!("Failed to save upload: {}", e);
        HandlerError::FileError(e)
    })?;
    info!("Converting upload {} as {}", video.describe(), media.id());
    drop(video);

    encoder
        .convert(media.input(), media.output())
        .await
        .map_err(|e| {
            error!("Conversion {} failed: {}", media.id(), e);
            HandlerError::from(e)
        })?;

    // A zero exit status does not guarantee the encoder wrote anything
    let converted = tokio::fs::read(media.output()).await.map_err(|source| {
        let e = EncoderError::MissingOutput {
            path: media.output().to_path_buf(),
            source,
        };
        error!("Conversion {} failed: {}", media.id(), e);
        HandlerError::from(e)
    })?;

    info!(
        "Conversion {} produced {} bytes in {:.2}s",
        media.id(),
        converted.len(),
        start_time.elapsed().as_secs_f64()
    );

    // Removes both temporary files before the body is sent
    drop(media);

    Ok(HttpResponse::Ok()
        .content_type(MP4_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(DOWNLOAD_FILE_NAME.to_string())],
        })
        .body(converted))
}
