//! Preview image derivation via an external converter
//!
//! Runs ImageMagick's `convert` (which shells out to FFmpeg for video) as a
//! child process. The process is bounded by a timeout and killed when the
//! handler gives up on it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use super::StagedFile;
use crate::{Error, Result};

/// Default timeout for a conversion
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default converter program
pub const DEFAULT_PROGRAM: &str = "convert";

/// What the staged file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// JPEG image, resized to 240px wide
    Image,
    /// MP4 video, first frame extracted
    Video,
}

/// Derives JPEG previews next to staged files
#[derive(Debug, Clone)]
pub struct PreviewConverter {
    program: String,
    timeout: Duration,
}

impl Default for PreviewConverter {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_TIMEOUT)
    }
}

impl PreviewConverter {
    /// Create a converter running `program` with a per-call `timeout`
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Whether the converter program can be found on `PATH`
    #[must_use]
    pub fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Write a preview for `staged` and return its path
    ///
    /// # Errors
    ///
    /// Returns error if the process cannot be spawned, exits non-zero, or
    /// does not finish within the timeout
    pub async fn derive(&self, staged: &StagedFile, kind: PreviewKind) -> Result<PathBuf> {
        let preview = staged.preview_path();
        let args = conversion_args(staged.path(), &preview, kind);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Media(format!("failed to spawn {}: {e}", self.program)))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::Media(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|e| Error::Media(format!("{} failed: {e}", self.program)))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Media(format!(
                "{} exited with code {code}: {}",
                self.program,
                stderr.trim()
            )));
        }

        tracing::debug!(preview = %preview.display(), ?kind, "derived preview");
        Ok(preview)
    }
}

/// Build converter arguments for `kind`
fn conversion_args(original: &Path, preview: &Path, kind: PreviewKind) -> Vec<String> {
    let original = original.display();
    let preview = format!("jpeg:{}", preview.display());
    match kind {
        PreviewKind::Image => vec![
            "-resize".to_string(),
            "240x".to_string(),
            format!("jpeg:{original}"),
            preview,
        ],
        PreviewKind::Video => vec![format!("mp4:{original}[0]"), preview],
    }
}
