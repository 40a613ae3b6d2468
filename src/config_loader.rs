// Configuration loader for Video Relay API
//
// This module reads the optional TOML configuration file and exposes its values
// as environment variables, so that `config_validator` sees a single source.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use toml::Value;

const CONFIG_FILE_PATH: &str = "video_relay_api.conf";

/// Environment variable overriding the configuration file location
const CONFIG_FILE_ENV: &str = "VIDEO_API_CONFIG_FILE";

/// Loads configuration from the TOML file into the process environment
///
/// Configuration precedence (highest to lowest):
/// 1. Environment variables
/// 2. Configuration file values
/// 3. Default values (applied by the validator)
///
/// Returns true if the config file was successfully loaded, false otherwise
pub fn load_config() -> bool {
    let path = env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| CONFIG_FILE_PATH.to_string());
    load_config_from(Path::new(&path))
}

/// Same as [`load_config`] with an explicit file path
pub fn load_config_from(config_path: &Path) -> bool {
    if !config_path.exists() {
        debug!("Configuration file not found at: {}", config_path.display());
        return false;
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read configuration file: {}", e);
            return false;
        }
    };

    let config_map = match parse_config(&config_content) {
        Ok(map) => map,
        Err(e) => {
            warn!("Failed to parse configuration file: {}", e);
            return false;
        }
    };

    for (key, value) in config_map {
        // Only set if the environment variable doesn't already exist
        if env::var(&key).is_err() {
            // Never echo the credential
            if key.ends_with("_API_KEY") {
                debug!("Setting env var from config file: {} = <redacted>", key);
            } else {
                debug!("Setting env var from config file: {} = {}", key, value);
            }
            env::set_var(key, value);
        } else {
            debug!("Env var already exists, skipping: {}", key);
        }
    }

    info!("Configuration loaded from {}", config_path.display());
    true
}

/// Flatten a TOML document into key-value pairs
///
/// The file is expected to be flat; arrays and tables are skipped with a warning.
pub fn parse_config(content: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let config_values: Value = content.parse()?;
    let mut config_map = HashMap::new();

    if let Value::Table(table) = config_values {
        for (key, value) in table {
            match value {
                Value::String(s) => {
                    config_map.insert(key, s);
                }
                Value::Integer(i) => {
                    config_map.insert(key, i.to_string());
                }
                Value::Float(f) => {
                    config_map.insert(key, f.to_string());
                }
                Value::Boolean(b) => {
                    config_map.insert(key, b.to_string());
                }
                _ => {
                    warn!("Skipping unsupported TOML value type for key: {}", key);
                }
            }
        }
    }

    Ok(config_map)
}
