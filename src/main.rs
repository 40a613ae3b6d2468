use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};
use std::time::Duration;

use video_relay_api::config_loader;
use video_relay_api::cors::{build_cors, log_cors_policy};
use video_relay_api::{configure_routes, AppConfigValidator, Encoder, TranscriptionClient};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Config file values become environment variables unless already set
    if !config_loader::load_config() {
        info!("No configuration file loaded, using environment and defaults");
    }

    let config = match AppConfigValidator::validate_and_load() {
        Ok(config) => config,
        Err(results) => {
            error!(
                "Refusing to start: {} configuration error(s)",
                results.errors.len()
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = config.handler.ensure_temp_dir() {
        warn!(
            "Failed to create temp directory {}: {}",
            config.handler.temp_dir.display(),
            e
        );
    }

    let client = TranscriptionClient::new(config.transcription.clone()).map_err(|e| {
        error!("Failed to build transcription client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;
    let encoder = Encoder::new(config.encoder.clone());

    let server = config.server.clone();
    let handler_config = config.handler.clone();

    info!(
        "Starting Video Relay API server on http://{}:{}",
        server.host, server.port
    );
    info!("Using temp directory: {}", handler_config.temp_dir.display());
    info!("Transcription endpoint: {}", config.transcription.endpoint);
    info!(
        "Encoder command: {} (codec {}, preset {})",
        config.encoder.command, config.encoder.video_codec, config.encoder.preset
    );
    log_cors_policy(&server);

    let cors_config = server.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(build_cors(&cors_config))
            .app_data(web::Data::new(handler_config.clone()))
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(encoder.clone()))
            .configure(configure_routes)
    })
    .workers(server.worker_count())
    .bind((server.host, server.port))?
    .client_disconnect_timeout(Duration::from_secs(server.timeout))
    .keep_alive(Duration::from_secs(server.keepalive))
    .run()
    .await
}
