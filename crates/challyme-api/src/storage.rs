use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

/// Manages on-disk storage for challenge images.
///
/// Each image is stored as a single flat file at `{storage_dir}/{file_ref}`
/// and served back under `/uploads/{file_ref}`.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Image storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the file for a given reference.
    pub fn file_path(&self, file_ref: &str) -> Result<PathBuf> {
        if !is_plain_name(file_ref) {
            bail!("Invalid file reference '{}'", file_ref);
        }
        Ok(self.dir.join(file_ref))
    }

    /// Write the whole file under a temporary name and rename it into place,
    /// so a half-written image is never served.
    pub async fn save(&self, file_ref: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(file_ref)?;
        let tmp = self.dir.join(format!(".{}.part", file_ref));

        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn delete_file(&self, file_ref: &str) -> Result<()> {
        let path = self.file_path(file_ref)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of files left behind by a deleted challenge or a
    /// departed participant.
    pub async fn delete_all(&self, file_refs: &[String]) {
        for file_ref in file_refs {
            if let Err(e) = self.delete_file(file_ref).await {
                warn!("Failed to delete image {}: {}", file_ref, e);
            }
        }
    }
}

/// Fresh reference for an upload: a random UUID plus the original file's
/// extension when it looks sane.
pub fn new_file_ref(original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase());

    match ext {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    }
}

fn is_plain_name(file_ref: &str) -> bool {
    !file_ref.is_empty()
        && !file_ref.starts_with('.')
        && file_ref
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
