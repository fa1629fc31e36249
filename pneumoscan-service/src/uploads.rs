use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Lower-cased extension of `filename` if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Flat directory holding uploaded X-rays and generated reports.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an uploaded image under a fresh random name and return that name.
    pub async fn save_image(&self, bytes: &[u8], extension: &str) -> std::io::Result<String> {
        let filename = format!("{}.{}", Uuid::new_v4().simple(), extension);
        tokio::fs::write(self.dir.join(&filename), bytes).await?;
        debug!("Stored upload {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    pub fn new_report_path(&self) -> PathBuf {
        let id = Uuid::new_v4().simple().to_string();
        self.dir.join(format!("report_{}.pdf", &id[..8]))
    }

    /// Resolve a client-supplied file name to an existing file in the store.
    ///
    /// Only a single plain path component is accepted, so names such as
    /// `../secret` or `/etc/passwd` never escape the directory.
    pub async fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let mut components = Path::new(filename).components();
        let is_plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_plain {
            return None;
        }

        let path = self.dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Delete regular files whose modification time is older than `max_age`.
    /// Returns how many were removed.
    pub async fn remove_older_than(&self, max_age: Duration) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok(removed)
    }
}
