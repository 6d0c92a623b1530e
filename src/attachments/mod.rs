//! Staging of downloaded message content
//!
//! Heavy content (images, video, audio, files) is streamed from the source
//! platform into a flat download directory. Files are named with a random
//! UUID so concurrent requests never collide, and the directory is served
//! read-only under `/downloaded/`.

pub mod preview;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

pub use preview::{PreviewConverter, PreviewKind};

/// A file written by [`ContentStager::stage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Location on disk
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name within the download directory
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Sibling path for a derived JPEG preview
    #[must_use]
    pub fn preview_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!("{stem}-preview.jpeg"))
    }
}

/// Writes inbound byte streams into the download directory
#[derive(Debug, Clone)]
pub struct ContentStager {
    dir: PathBuf,
}

impl ContentStager {
    /// Create a stager, creating the download directory if absent
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Attachment(format!(
                "failed to create download dir {}: {e}",
                dir.display()
            ))
        })?;

        tracing::debug!(dir = %dir.display(), "download directory ready");
        Ok(Self { dir })
    }

    /// Download directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Consume `stream` into a new uniquely named file
    ///
    /// A partially written file is left in place when the stream fails.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written, or if the
    /// stream yields an error
    pub async fn stage<S>(&self, mut stream: S, suffix: Option<&str>) -> Result<StagedFile>
    where
        S: Stream<Item = Result<Bytes>> + Unpin + Send,
    {
        let name = match suffix {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4().simple()),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        let path = self.dir.join(name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(path = %path.display(), bytes = written, "saved content");
        Ok(StagedFile { path })
    }

    /// Delete staged files last modified more than `max_age` ago
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read
    pub async fn sweep(&self, max_age: Duration) -> Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }

            let expired = meta.modified().is_ok_and(|modified| modified < cutoff);
            if !expired {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "failed to remove expired file"
                    );
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "swept expired downloads");
        }
        Ok(removed)
    }

    /// Spawn a background task that sweeps every `interval`
    #[must_use]
    pub fn spawn_sweeper(
        &self,
        max_age: Duration,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let stager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = stager.sweep(max_age).await {
                    tracing::warn!(error = %e, "download sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn chunks(data: &[u8], size: usize) -> Vec<Result<Bytes>> {
        data.chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect()
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("line-bot");

        let stager = ContentStager::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(stager.dir(), dir);
    }

    #[tokio::test]
    async fn staged_bytes_match_independent_of_chunking() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();
        let data: Vec<u8> = (0..10_000_u32).map(|i| (i % 251) as u8).collect();

        for size in [1, 7, 512, 4096, 10_000] {
            let staged = stager
                .stage(stream::iter(chunks(&data, size)), Some("jpeg"))
                .await
                .unwrap();
            let on_disk = std::fs::read(staged.path()).unwrap();
            assert_eq!(on_disk, data, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn empty_stream_creates_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();

        let staged = stager.stage(stream::iter(Vec::new()), None).await.unwrap();
        assert_eq!(std::fs::read(staged.path()).unwrap().len(), 0);
        assert!(!staged.file_name().contains('.'));
    }

    #[tokio::test]
    async fn names_are_unique_and_suffixed() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();

        let a = stager.stage(stream::iter(chunks(b"a", 1)), Some("mp4")).await.unwrap();
        let b = stager.stage(stream::iter(chunks(b"b", 1)), Some("mp4")).await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.file_name().ends_with(".mp4"));
        assert_eq!(a.path().parent(), Some(tmp.path()));
    }

    #[tokio::test]
    async fn preview_path_is_sibling() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();

        let staged = stager.stage(stream::iter(chunks(b"x", 1)), Some("jpeg")).await.unwrap();
        let preview = staged.preview_path();
        let stem = staged.file_name().trim_end_matches(".jpeg").to_string();

        assert_eq!(preview.parent(), staged.path().parent());
        assert_eq!(
            preview.file_name().unwrap().to_string_lossy(),
            format!("{stem}-preview.jpeg")
        );
    }

    #[tokio::test]
    async fn stream_error_leaves_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();

        let items: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::Channel("connection reset".to_string())),
        ];
        let err = stager.stage(stream::iter(items), None).await.unwrap_err();
        assert!(matches!(err, Error::Channel(_)));

        let files: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_files() {
        let tmp = tempfile::tempdir().unwrap();
        let stager = ContentStager::new(tmp.path()).unwrap();

        let staged = stager.stage(stream::iter(chunks(b"old", 3)), None).await.unwrap();

        // Nothing is older than an hour yet
        assert_eq!(stager.sweep(Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(staged.path().exists());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stager.sweep(Duration::from_millis(1)).await.unwrap(), 1);
        assert!(!staged.path().exists());
    }
}
