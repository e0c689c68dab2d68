//! Filesystem blob storage backend.
//!
//! Stores uploaded PDFs and rendered page images under a media root using the
//! relative paths the pipeline hands it (e.g.
//! `chapters/{slug}/v{vol}/ch{num}/001.webp`). Writes are atomic: data lands
//! in a temp file that is renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

use inkpress_core::{BlobStorage, Error, Result};

/// Filesystem storage backend rooted at a media directory.
pub struct FilesystemStorage {
    base_path: PathBuf,
}

impl FilesystemStorage {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the backend can write, read, and delete files.
    ///
    /// Full round-trip test at startup to catch filesystem issues
    /// (permissions, missing mounts) before the first job is claimed.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

#[async_trait]
impl BlobStorage for FilesystemStorage {
    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);
        debug!(
            subsystem = "storage",
            op = "write",
            blob_path = %path,
            size = data.len(),
            "Writing blob"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "create_dir_all failed");
                Error::Io(e)
            })?;
        }

        // Atomic write: temp file + rename. The suffix is appended, not
        // substituted, so blobs differing only in extension never share a
        // temp path.
        let mut temp_name = full_path.clone().into_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        fs::read(&full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
                _ => Error::Io(e),
            })
    }

    async fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        let mut file = fs::File::open(&full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
                _ => Error::Io(e),
            })?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        // read() may return short counts; fill until EOF or the buffer ends.
        while filled < len {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            // Deleting an already-gone blob is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path)).await?)
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.full_path(path))
    }
}

impl FilesystemStorage {
    /// Base directory of this backend.
    pub fn base(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        storage
            .write("chapters/slug/v1/ch1/001.webp", b"payload")
            .await
            .unwrap();
        let data = storage.read("chapters/slug/v1/ch1/001.webp").await.unwrap();
        assert_eq!(data, b"payload");
    }

    #[tokio::test]
    async fn test_write_does_not_disturb_tmp_named_sibling() {
        // A stored blob that happens to end in .tmp must survive a write to
        // a sibling that differs only in extension.
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        storage.write("ch/001.tmp", b"kept").await.unwrap();
        storage.write("ch/001.webp", b"image").await.unwrap();

        assert_eq!(storage.read("ch/001.tmp").await.unwrap(), b"kept");
        assert_eq!(storage.read("ch/001.webp").await.unwrap(), b"image");
    }

    #[tokio::test]
    async fn test_read_range_chunks_and_eof() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage.write("blob.bin", b"0123456789").await.unwrap();

        assert_eq!(storage.read_range("blob.bin", 0, 4).await.unwrap(), b"0123");
        assert_eq!(storage.read_range("blob.bin", 4, 4).await.unwrap(), b"4567");
        // Short final chunk, then empty at EOF.
        assert_eq!(storage.read_range("blob.bin", 8, 4).await.unwrap(), b"89");
        assert!(storage.read_range("blob.bin", 10, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_range_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        let err = storage.read_range("gone.pdf", 0, 16).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        match storage.read("nope.pdf").await {
            Err(Error::NotFound(p)) => assert_eq!(p, "nope.pdf"),
            other => panic!("expected NotFound, got {:?}", other.map(|v| v.len())),
        }
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        storage.write("a/b.bin", b"x").await.unwrap();
        storage.delete("a/b.bin").await.unwrap();
        storage.delete("a/b.bin").await.unwrap();
        assert!(!storage.exists("a/b.bin").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_path_points_inside_base() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        let p = storage.local_path("u/j.pdf").unwrap();
        assert!(p.starts_with(dir.path()));
        assert!(p.ends_with("u/j.pdf"));
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage.validate().await.unwrap();
    }
}
