//! Where embedded files end up.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// A write-once file sink addressable later under a public URL prefix.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Writes `data` as `file_name` with unix permission bits `mode`.
    ///
    /// Writing a name that already exists succeeds without touching it.
    async fn write(&self, file_name: &str, data: &[u8], mode: u32) -> io::Result<()>;
}

/// Media stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    dir: PathBuf,
}

impl FsMediaStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The media directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn write(&self, file_name: &str, data: &[u8], mode: u32) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        if fs::try_exists(&path).await? {
            debug!(path = %path.display(), "Media file already stored");
            return Ok(());
        }

        // The final name only ever appears complete; a failed write leaves
        // nothing a redelivery would mistake for a stored file.
        let temp = self.temp_path();
        let stored = match write_new(&temp, data, mode).await {
            Ok(()) => fs::rename(&temp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            match fs::remove_file(&temp).await {
                Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                    warn!(path = %temp.display(), error = %cleanup, "Failed to remove partial media file");
                }
                _ => {}
            }
            return Err(e);
        }

        debug!(path = %path.display(), bytes = data.len(), "Stored media file");
        Ok(())
    }
}

impl FsMediaStore {
    fn temp_path(&self) -> PathBuf {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(".partial-{}-{n}", std::process::id()))
    }
}

async fn write_new(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.flush().await
}
