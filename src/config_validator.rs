// Configuration validation module for Video Relay API
//
// Every configuration parameter is declared once in `CONFIG_PARAMS` with its type,
// default and constraints. `AppConfigValidator` walks that registry, validates each
// value and stores it into a typed `AppConfig`, collecting all problems before
// reporting them so an operator sees every mistake in one run.

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use log::{error, info, warn};

use crate::config::{defaults, parse_origin_list, AppConfig};

/// Configuration parameter types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    String,
    Secret,
    UnsignedInteger,
    IpAddress,
    Port,
    Url,
    OriginList,
    Enum(&'static [&'static str]),
}

/// Validation severity levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Critical, // Must be valid for application to start
    Standard, // Invalid values are errors, missing ones fall back to defaults
    Warning,  // Optional, generates warnings only
}

/// Configuration parameter definition
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: &'static str,
    pub description: &'static str,
    pub param_type: ConfigType,
    pub default_value: Option<&'static str>,
    pub required: bool,
    pub validation_level: ValidationLevel,
    pub min_value: Option<u64>,
    pub max_value: Option<u64>,
}

/// Centralized configuration parameter registry
pub const CONFIG_PARAMS: &[ConfigParam] = &[
    // Server Configuration
    ConfigParam {
        name: "VIDEO_API_HOST",
        description: "Host IP address for the API server",
        param_type: ConfigType::IpAddress,
        default_value: Some(defaults::HOST),
        required: false,
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "VIDEO_API_PORT",
        description: "Port for the API server",
        param_type: ConfigType::Port,
        default_value: Some(defaults::PORT_TEXT),
        required: false,
        validation_level: ValidationLevel::Critical,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "VIDEO_API_TIMEOUT",
        description: "Client disconnect timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::TIMEOUT_SECONDS_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: "VIDEO_API_KEEPALIVE",
        description: "Keep-alive timeout in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::KEEPALIVE_SECONDS_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    ConfigParam {
        name: "HTTP_WORKER_NUMBER",
        description: "Number of HTTP workers (0 = use CPU cores)",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::WORKERS_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(0),
        max_value: Some(64),
    },
    ConfigParam {
        name: "CORS_ALLOWED_ORIGINS",
        description: "Comma separated list of allowed browser origins, '*' for any",
        param_type: ConfigType::OriginList,
        default_value: Some(defaults::CORS_ALLOWED_ORIGINS),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    // Upload Configuration
    ConfigParam {
        name: "VIDEO_API_TMP_DIR",
        description: "Directory for temporary upload and output files",
        param_type: ConfigType::String,
        default_value: None,
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "MAX_FILE_SIZE",
        description: "Maximum upload size in bytes",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::MAX_FILE_SIZE_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: None,
    },
    // Transcription Service Configuration
    ConfigParam {
        name: "SYMPHONIC_API_KEY",
        description: "API key for the transcription service",
        param_type: ConfigType::Secret,
        default_value: None,
        required: true,
        validation_level: ValidationLevel::Warning,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "SYMPHONIC_API_URL",
        description: "Endpoint of the transcription service",
        param_type: ConfigType::Url,
        default_value: Some(defaults::TRANSCRIPTION_URL),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "SYMPHONIC_TIER",
        description: "Service tier sent with each transcription request",
        param_type: ConfigType::String,
        default_value: Some(defaults::TRANSCRIPTION_TIER),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "TRANSCRIPTION_TIMEOUT_SECONDS",
        description: "Maximum wait for the transcription service in seconds",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::TRANSCRIPTION_TIMEOUT_SECONDS_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(1),
        max_value: Some(3600),
    },
    // Encoder Configuration
    ConfigParam {
        name: "ENCODER_CMD",
        description: "Encoder binary used for MP4 conversion",
        param_type: ConfigType::String,
        default_value: Some(defaults::ENCODER_CMD),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "ENCODER_EXTRA_ARGS",
        description: "Whitespace separated arguments placed before the input (e.g. -hide_banner)",
        param_type: ConfigType::String,
        default_value: None,
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "ENCODER_VIDEO_CODEC",
        description: "Video codec passed to the encoder",
        param_type: ConfigType::String,
        default_value: Some(defaults::ENCODER_VIDEO_CODEC),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "ENCODER_PRESET",
        description: "Encoding speed preset",
        param_type: ConfigType::Enum(&defaults::ENCODER_PRESETS),
        default_value: Some(defaults::ENCODER_PRESET),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: None,
        max_value: None,
    },
    ConfigParam {
        name: "ENCODER_TIMEOUT_SECONDS",
        description: "Maximum encoder run time in seconds (0 = no limit)",
        param_type: ConfigType::UnsignedInteger,
        default_value: Some(defaults::ENCODER_TIMEOUT_SECONDS_TEXT),
        required: false,
        validation_level: ValidationLevel::Standard,
        min_value: Some(0),
        max_value: Some(86400),
    },
];

/// Configuration validation errors with detailed context
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub value: String,
    pub error_type: ConfigErrorType,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigErrorType {
    InvalidValue,
    InvalidFormat,
    InvalidRange,
    Insecure,
    Required,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error in '{}' ({:?}): {} (value: '{}')",
            self.field, self.error_type, self.message, self.value
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " - Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigValidationError {}

pub type ValidationResult<T> = Result<T, ConfigValidationError>;

/// Configuration validation results
#[derive(Debug)]
pub struct ValidationResults {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
    pub is_valid: bool,
}

impl Default for ValidationResults {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResults {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn add_error(&mut self, error: ConfigValidationError) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ConfigValidationError) {
        self.warnings.push(warning);
    }

    fn add(&mut self, level: ValidationLevel, error: ConfigValidationError) {
        match level {
            ValidationLevel::Critical | ValidationLevel::Standard => self.add_error(error),
            ValidationLevel::Warning => self.add_warning(error),
        }
    }

    pub fn print_summary(&self) {
        if !self.errors.is_empty() {
            error!(
                "Configuration validation found {} error(s):",
                self.errors.len()
            );
            for (i, err) in self.errors.iter().enumerate() {
                error!("  {}. {}", i + 1, err);
            }
        }

        if !self.warnings.is_empty() {
            warn!(
                "Configuration validation found {} warning(s):",
                self.warnings.len()
            );
            for (i, warning) in self.warnings.iter().enumerate() {
                warn!("  {}. {}", i + 1, warning);
            }
        }

        if self.is_valid && self.warnings.is_empty() {
            info!("Configuration validation passed successfully");
        } else if self.is_valid {
            info!(
                "Configuration validation passed with {} warning(s)",
                self.warnings.len()
            );
        }
    }
}

/// Helper functions for common validation patterns
pub mod validators {
    use super::*;

    fn invalid(
        field: &str,
        value: &str,
        error_type: ConfigErrorType,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> ConfigValidationError {
        ConfigValidationError {
            field: field.to_string(),
            value: value.to_string(),
            error_type,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Validate unsigned integer values with optional range
    pub fn validate_unsigned(
        field: &str,
        value: &str,
        min: Option<u64>,
        max: Option<u64>,
    ) -> ValidationResult<u64> {
        let parsed = value.trim().parse::<u64>().map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid unsigned integer format",
                "Use a valid positive integer number",
            )
        })?;

        if let Some(min) = min {
            if parsed < min {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is below minimum {}", parsed, min),
                    format!("Use a value >= {}", min),
                ));
            }
        }

        if let Some(max) = max {
            if parsed > max {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidRange,
                    format!("Value {} is above maximum {}", parsed, max),
                    format!("Use a value <= {}", max),
                ));
            }
        }

        Ok(parsed)
    }

    /// Validate enumerated values, case-insensitively
    pub fn validate_enum(
        field: &str,
        value: &str,
        valid_values: &[&str],
    ) -> ValidationResult<String> {
        let lowered = value.trim().to_lowercase();
        if valid_values.iter().any(|v| v.to_lowercase() == lowered) {
            Ok(lowered)
        } else {
            Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Invalid value, must be one of: {}", valid_values.join(", ")),
                format!("Use one of: {}", valid_values.join(", ")),
            ))
        }
    }

    /// Validate IP address
    pub fn validate_ip_address(field: &str, value: &str) -> ValidationResult<IpAddr> {
        IpAddr::from_str(value.trim()).map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid IP address format",
                "Use a valid IPv4 or IPv6 address (e.g., 127.0.0.1 or ::1)",
            )
        })
    }

    /// Validate port number
    pub fn validate_port(field: &str, value: &str) -> ValidationResult<u16> {
        let port = value.trim().parse::<u16>().map_err(|_| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                "Invalid port number format",
                "Use a number between 1 and 65535",
            )
        })?;

        if port == 0 {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidRange,
                "Port number cannot be 0",
                "Use a port between 1 and 65535",
            ));
        }

        Ok(port)
    }

    /// Validate an absolute http(s) URL
    pub fn validate_url(field: &str, value: &str) -> ValidationResult<String> {
        let url = reqwest::Url::parse(value.trim()).map_err(|e| {
            invalid(
                field,
                value,
                ConfigErrorType::InvalidFormat,
                format!("Invalid URL: {}", e),
                "Use an absolute URL such as https://api.example.com/transcribe",
            )
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url.to_string()),
            scheme => Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                format!("Unsupported URL scheme '{}'", scheme),
                "Use an http:// or https:// URL",
            )),
        }
    }

    /// Validate a comma separated origin list
    pub fn validate_origin_list(field: &str, value: &str) -> ValidationResult<Vec<String>> {
        let origins = parse_origin_list(value);
        if origins.is_empty() {
            return Err(invalid(
                field,
                value,
                ConfigErrorType::InvalidValue,
                "Origin list is empty",
                "Use '*' or a list such as http://localhost:3000,https://app.example.com",
            ));
        }

        for origin in &origins {
            if origin != "*" && !(origin.starts_with("http://") || origin.starts_with("https://"))
            {
                return Err(invalid(
                    field,
                    value,
                    ConfigErrorType::InvalidFormat,
                    format!("Origin '{}' must start with http:// or https://", origin),
                    "Write origins as scheme://host[:port]",
                ));
            }
        }

        Ok(origins)
    }
}

/// Configuration validator for the Video Relay API
pub struct AppConfigValidator;

impl AppConfigValidator {
    /// Validate all parameters from the process environment
    pub fn validate_and_load() -> Result<AppConfig, ValidationResults> {
        Self::validate_and_load_with(|key| env::var(key).ok())
    }

    /// Validate all parameters using `lookup` as the value source
    pub fn validate_and_load_with<F>(lookup: F) -> Result<AppConfig, ValidationResults>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut results = ValidationResults::new();
        let mut config = AppConfig::default();

        info!("Starting configuration validation...");

        for param in CONFIG_PARAMS {
            let value = lookup(param.name)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| param.default_value.map(String::from))
                .unwrap_or_default();

            if param.required && value.is_empty() {
                results.add(
                    param.validation_level,
                    ConfigValidationError {
                        field: param.name.to_string(),
                        value: String::new(),
                        error_type: ConfigErrorType::Required,
                        message: format!("{} is not set", param.description),
                        suggestion: Some(format!("Set {} environment variable", param.name)),
                    },
                );
                continue;
            }

            if value.is_empty() {
                continue;
            }

            if let Err(error) = Self::validate_and_store_parameter(param, &value, &mut config) {
                results.add(param.validation_level, error);
            }
        }

        Self::validate_cross_dependencies(&mut results, &config);

        results.print_summary();

        if results.is_valid {
            Ok(config)
        } else {
            Err(results)
        }
    }

    /// Validate a single parameter and store its value in the config struct
    fn validate_and_store_parameter(
        param: &ConfigParam,
        value: &str,
        config: &mut AppConfig,
    ) -> ValidationResult<()> {
        match param.param_type {
            ConfigType::String => {
                let value = value.trim().to_string();
                match param.name {
                    "VIDEO_API_TMP_DIR" => config.handler.temp_dir = PathBuf::from(value),
                    "SYMPHONIC_TIER" => config.transcription.tier = value,
                    "ENCODER_CMD" => config.encoder.command = value,
                    "ENCODER_EXTRA_ARGS" => {
                        config.encoder.extra_args =
                            value.split_whitespace().map(String::from).collect()
                    }
                    "ENCODER_VIDEO_CODEC" => config.encoder.video_codec = value,
                    _ => {}
                }
            }
            ConfigType::Secret => {
                if param.name == "SYMPHONIC_API_KEY" {
                    config.transcription.api_key = Some(value.trim().to_string());
                }
            }
            ConfigType::UnsignedInteger => {
                let parsed = validators::validate_unsigned(
                    param.name,
                    value,
                    param.min_value,
                    param.max_value,
                )?;
                match param.name {
                    "VIDEO_API_TIMEOUT" => config.server.timeout = parsed,
                    "VIDEO_API_KEEPALIVE" => config.server.keepalive = parsed,
                    "HTTP_WORKER_NUMBER" => config.server.workers = parsed as usize,
                    "MAX_FILE_SIZE" => config.handler.max_file_size = parsed as usize,
                    "TRANSCRIPTION_TIMEOUT_SECONDS" => {
                        config.transcription.timeout_seconds = parsed
                    }
                    "ENCODER_TIMEOUT_SECONDS" => config.encoder.timeout_seconds = parsed,
                    _ => {}
                }
            }
            ConfigType::IpAddress => {
                let parsed = validators::validate_ip_address(param.name, value)?;
                if param.name == "VIDEO_API_HOST" {
                    config.server.host = parsed;
                }
            }
            ConfigType::Port => {
                let parsed = validators::validate_port(param.name, value)?;
                if param.name == "VIDEO_API_PORT" {
                    config.server.port = parsed;
                }
            }
            ConfigType::Url => {
                let parsed = validators::validate_url(param.name, value)?;
                if param.name == "SYMPHONIC_API_URL" {
                    config.transcription.endpoint = parsed;
                }
            }
            ConfigType::OriginList => {
                let parsed = validators::validate_origin_list(param.name, value)?;
                if param.name == "CORS_ALLOWED_ORIGINS" {
                    config.server.cors_allowed_origins = parsed;
                }
            }
            ConfigType::Enum(valid_values) => {
                let parsed = validators::validate_enum(param.name, value, valid_values)?;
                if param.name == "ENCODER_PRESET" {
                    config.encoder.preset = parsed;
                }
            }
        }
        Ok(())
    }

    /// Validate cross-parameter dependencies
    fn validate_cross_dependencies(results: &mut ValidationResults, config: &AppConfig) {
        if config.transcription.api_key.is_some()
            && config.transcription.endpoint.starts_with("http://")
        {
            results.add_warning(ConfigValidationError {
                field: "SYMPHONIC_API_URL".to_string(),
                value: config.transcription.endpoint.clone(),
                error_type: ConfigErrorType::Insecure,
                message: "API key will be sent over plain HTTP".to_string(),
                suggestion: Some("Use an https:// endpoint".to_string()),
            });
        }

        if config.server.allows_any_origin() && config.server.cors_allowed_origins.len() > 1 {
            results.add_warning(ConfigValidationError {
                field: "CORS_ALLOWED_ORIGINS".to_string(),
                value: config.server.cors_allowed_origins.join(","),
                error_type: ConfigErrorType::InvalidValue,
                message: "'*' allows every origin, other entries are ignored".to_string(),
                suggestion: Some("Use either '*' or an explicit list".to_string()),
            });
        }
    }
}
