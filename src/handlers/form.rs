// Form data processing for Video Relay API
//
// This module extracts the uploaded video from multipart requests. Only the
// `video` file part is read; any other field, including a plain text `video`
// field without a file name, is drained and ignored.

use actix_multipart::Multipart;
use actix_web::{HttpMessage, HttpRequest};
use futures::{StreamExt, TryStreamExt};
use log::debug;

use crate::error::HandlerError;
use crate::models::UploadedVideo;

/// Name of the multipart field carrying the video
pub const VIDEO_FIELD: &str = "video";

/// Whether the request declares a multipart form body
///
/// Requests with any other content type cannot carry the `video` field.
pub fn is_multipart(req: &HttpRequest) -> bool {
    req.content_type().eq_ignore_ascii_case("multipart/form-data")
}

/// Read the `video` field of a multipart form into memory
///
/// # Errors
///
/// * `HandlerError::NoVideoFile` if the form has no `video` file part
/// * `HandlerError::FileTooLarge` if the upload exceeds `max_file_size`
/// * `HandlerError::FormError` if the multipart stream is malformed
pub async fn extract_video(
    mut form: Multipart,
    max_file_size: usize,
) -> Result<UploadedVideo, HandlerError> {
    let mut video: Option<UploadedVideo> = None;

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| HandlerError::form_error(format!("Error reading form: {}", e)))?
    {
        let content_disposition = field.content_disposition();
        let field_name = content_disposition
            .and_then(|cd| cd.get_name().map(|name| name.to_string()))
            .unwrap_or_default();
        let file_name = content_disposition
            .and_then(|cd| cd.get_filename())
            .map(String::from);

        // A file part is one whose disposition carries a filename
        if field_name != VIDEO_FIELD || file_name.is_none() || video.is_some() {
            debug!("Skipping form field '{}'", field_name);
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| {
                    HandlerError::form_error(format!(
                        "Error reading field {}: {}",
                        field_name, e
                    ))
                })?;
            }
            continue;
        }

        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                HandlerError::form_error(format!("Error processing file upload: {}", e))
            })?;

            if data.len() + chunk.len() > max_file_size {
                return Err(HandlerError::FileTooLarge(
                    data.len() + chunk.len(),
                    max_file_size,
                ));
            }
            data.extend_from_slice(&chunk);
        }

        debug!("Read {} bytes from the video part", data.len());

        video = Some(UploadedVideo {
            data,
            content_type,
            file_name,
        });
    }

    video.ok_or(HandlerError::NoVideoFile)
}
