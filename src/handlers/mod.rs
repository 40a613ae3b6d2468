// Video Relay API HTTP handlers
//
// This module contains the HTTP handlers for the Video Relay API.

pub mod form;
pub mod routes;

#[cfg(test)]
mod tests;

use actix_web::web;

// Re-export handlers for easier access
pub use self::routes::{convert_to_mp4, index, transcribe};

/// Register every endpoint on an actix application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(transcribe)
        .service(convert_to_mp4);
}
