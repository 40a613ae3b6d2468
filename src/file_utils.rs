// File utilities for Video Relay API
//
// This module manages the temporary files of a conversion request. A
// `TempMedia` owns a uniquely named input file and the output path derived from
// it, and removes both when dropped, whichever way the handler returns.

use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Suffix of the uploaded input container
pub const INPUT_EXTENSION: &str = "webm";

/// Suffix of the encoder output
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Temporary input file and derived output path of one request
#[derive(Debug)]
pub struct TempMedia {
    input: PathBuf,
    output: PathBuf,
    id: String,
}

impl TempMedia {
    /// Write `data` to a new uniquely named input file inside `base_dir`
    ///
    /// The directory is created if needed. The output path is the input path
    /// with its suffix replaced; nothing is created there.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory or the file cannot be written.
    /// No file is left behind in that case.
    pub fn create(base_dir: &Path, data: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(base_dir)?;

        let id = Uuid::new_v4().to_string();
        let input = base_dir.join(format!("upload_{}.{}", id, INPUT_EXTENSION));
        let output = input.with_extension(OUTPUT_EXTENSION);

        // Constructed before writing so a partial write is still cleaned up
        let media = Self { input, output, id };
        save_file_data(data, &media.input)?;

        info!("Saved upload {} to {}", media.id, media.input.display());
        Ok(media)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn cleanup(&self) {
        remove_file_logged(&self.input);

        // A failed encode may never have produced the output
        if self.output.exists() {
            remove_file_logged(&self.output);
        }
    }
}

impl Drop for TempMedia {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Save uploaded file data to the filesystem
pub fn save_file_data(data: &[u8], file_path: &Path) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Remove a file, logging instead of returning errors
pub fn remove_file_logged(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => info!("Removed temporary file: {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Temporary file already gone: {}", path.display())
        }
        Err(e) => error!("Failed to remove temporary file {}: {}", path.display(), e),
    }
}
