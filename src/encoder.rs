// External encoder invocation for Video Relay API
//
// Runs the configured command-line encoder on a temporary input file and
// reports its outcome. The process is awaited asynchronously so the HTTP
// worker is not blocked while it runs.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use log::{debug, error, info};
use thiserror::Error;
use tokio::process::Command;

use crate::config::EncoderConfig;

/// Errors reported by the encoder invocation
#[derive(Error, Debug)]
pub enum EncoderError {
    /// The encoder binary does not exist or is not in PATH
    #[error("encoder '{command}' not found: {source}")]
    NotFound {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The encoder could not be started for another reason
    #[error("failed to start encoder '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The encoder ran and exited with a non-zero status
    #[error("{stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The encoder exceeded its time limit and was killed
    #[error("encoder did not finish within {0} seconds")]
    Timeout(u64),

    /// The encoder exited successfully but its output cannot be read
    #[error("encoder produced no readable output at {path:?}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting for the encoder failed
    #[error("error while waiting for encoder: {0}")]
    Io(#[from] io::Error),
}

/// Wrapper around the external encoder command
#[derive(Clone, Debug)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Argument list passed to the encoder for one conversion
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .config
            .extra_args
            .iter()
            .map(OsString::from)
            .collect();

        args.push("-y".into());
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
        args.push("-c:v".into());
        args.push(OsString::from(&self.config.video_codec));
        args.push("-preset".into());
        args.push(OsString::from(&self.config.preset));
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Encode `input` into `output`, waiting for the process to exit
    ///
    /// Standard error is captured and returned in [`EncoderError::Failed`] when
    /// the process exits with a non-zero status. When a timeout is configured the
    /// process is killed once it expires.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<(), EncoderError> {
        let start_time = Instant::now();
        let args = self.arguments(input, output);
        debug!("Running encoder: {} {:?}", self.config.command, args);

        let child = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                error!("Failed to start encoder '{}': {}", self.config.command, source);
                if source.kind() == io::ErrorKind::NotFound {
                    EncoderError::NotFound {
                        command: self.config.command.clone(),
                        source,
                    }
                } else {
                    EncoderError::Spawn {
                        command: self.config.command.clone(),
                        source,
                    }
                }
            })?;

        // Dropping the pending future kills the child (kill_on_drop)
        let result = match self.config.timeout() {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result?,
                Err(_) => {
                    error!(
                        "Encoder exceeded {} seconds, killed",
                        self.config.timeout_seconds
                    );
                    return Err(EncoderError::Timeout(self.config.timeout_seconds));
                }
            },
            None => child.wait_with_output().await?,
        };

        let duration = start_time.elapsed().as_secs_f64();

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            error!(
                "Encoder exited with {} after {:.2}s",
                result.status, duration
            );
            let stderr = if stderr.is_empty() {
                format!("encoder exited with {}", result.status)
            } else {
                stderr
            };
            return Err(EncoderError::Failed {
                code: result.status.code(),
                stderr,
            });
        }

        info!(
            "Encoded {} to {} in {:.2}s",
            input.display(),
            output.display(),
            duration
        );
        Ok(())
    }
}
