// Cross-origin settings for Video Relay API
//
// Browsers call the API from a separate front-end origin; this module turns the
// configured origin list into the actix CORS middleware.

use actix_cors::Cors;
use actix_web::http::{header, Method};
use log::info;

use crate::config::ServerConfig;

/// Preflight cache duration in seconds
const CORS_MAX_AGE: usize = 3600;

/// Build the CORS middleware for the configured origins
pub fn build_cors(config: &ServerConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_any_header()
        // Lets browser code read the download file name
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .max_age(CORS_MAX_AGE);

    if config.allows_any_origin() {
        cors.allow_any_origin()
    } else {
        config
            .cors_allowed_origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
    }
}

/// Log the effective CORS policy once at startup
pub fn log_cors_policy(config: &ServerConfig) {
    if config.allows_any_origin() {
        info!("CORS: any origin allowed");
    } else {
        info!(
            "CORS: allowed origins {}",
            config.cors_allowed_origins.join(", ")
        );
    }
}
