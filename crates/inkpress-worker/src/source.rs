//! Source PDF resolution.
//!
//! The renderer needs a plain local filesystem path. Filesystem-backed blob
//! storage hands one over directly; other backends get stream-copied into a
//! temp file that lives exactly as long as the job run.

use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use inkpress_core::defaults::BLOB_COPY_CHUNK;
use inkpress_core::{BlobStorage, Error, Result};

/// A readable local path for a job's source PDF.
///
/// Holds the backing temp file (if one was needed) so it is removed when the
/// job run ends, success or failure.
#[derive(Debug)]
pub enum LocalPdf {
    /// The blob already lives on the local filesystem.
    Direct(PathBuf),
    /// Copy fetched from remote storage; deleted on drop.
    Temp(NamedTempFile),
}

impl LocalPdf {
    pub fn path(&self) -> &Path {
        match self {
            LocalPdf::Direct(p) => p,
            LocalPdf::Temp(f) => f.path(),
        }
    }
}

/// Resolve a blob reference to a readable local path.
pub async fn resolve_local_pdf(storage: &dyn BlobStorage, blob_path: &str) -> Result<LocalPdf> {
    if let Some(path) = storage.local_path(blob_path) {
        if path.is_file() {
            return Ok(LocalPdf::Direct(path));
        }
        return Err(Error::NotFound(blob_path.to_string()));
    }

    debug!(
        subsystem = "worker",
        op = "fetch_pdf",
        blob_path = %blob_path,
        "Copying remote PDF to temp file"
    );
    let temp = NamedTempFile::with_suffix(".pdf").map_err(Error::Io)?;
    let mut file = tokio::fs::File::create(temp.path()).await?;

    // Chunked copy keeps memory bounded for large chapter PDFs.
    let mut offset: u64 = 0;
    loop {
        let chunk = storage.read_range(blob_path, offset, BLOB_COPY_CHUNK).await?;
        if chunk.is_empty() {
            break;
        }
        file.write_all(&chunk).await?;
        offset += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(LocalPdf::Temp(temp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct RemoteOnly {
        payload: Vec<u8>,
    }

    #[async_trait]
    impl BlobStorage for RemoteOnly {
        async fn write(&self, _path: &str, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        async fn read(&self, path: &str) -> Result<Vec<u8>> {
            if path == "uploads/ch.pdf" {
                Ok(self.payload.clone())
            } else {
                Err(Error::NotFound(path.to_string()))
            }
        }
        async fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>> {
            if path != "uploads/ch.pdf" {
                return Err(Error::NotFound(path.to_string()));
            }
            let start = (offset as usize).min(self.payload.len());
            let end = (start + len).min(self.payload.len());
            Ok(self.payload[start..end].to_vec())
        }
        async fn delete(&self, _path: &str) -> Result<()> {
            Ok(())
        }
        async fn exists(&self, _path: &str) -> Result<bool> {
            Ok(true)
        }
        fn local_path(&self, _path: &str) -> Option<PathBuf> {
            None
        }
    }

    #[tokio::test]
    async fn test_remote_blob_lands_in_temp_file() {
        let storage = RemoteOnly {
            payload: b"%PDF-1.7 fake".to_vec(),
        };
        let pdf = resolve_local_pdf(&storage, "uploads/ch.pdf").await.unwrap();

        let on_disk = tokio::fs::read(pdf.path()).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.7 fake");

        let path = pdf.path().to_path_buf();
        drop(pdf);
        assert!(!path.exists(), "temp file must be removed on drop");
    }

    #[tokio::test]
    async fn test_remote_copy_streams_across_chunk_boundaries() {
        // Payload larger than one copy chunk: the temp file must still be
        // byte-identical, assembled from multiple bounded reads.
        let mut payload = vec![0u8; BLOB_COPY_CHUNK * 2 + 1234];
        for (i, b) in payload.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let storage = RemoteOnly {
            payload: payload.clone(),
        };

        let pdf = resolve_local_pdf(&storage, "uploads/ch.pdf").await.unwrap();
        let on_disk = tokio::fs::read(pdf.path()).await.unwrap();
        assert_eq!(on_disk.len(), payload.len());
        assert_eq!(on_disk, payload);
    }

    #[tokio::test]
    async fn test_missing_remote_blob_is_not_found() {
        let storage = RemoteOnly { payload: vec![] };
        let err = resolve_local_pdf(&storage, "uploads/other.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_backend_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = inkpress_db::FilesystemStorage::new(dir.path());
        let err = resolve_local_pdf(&storage, "uploads/gone.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_local_backend_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = inkpress_db::FilesystemStorage::new(dir.path());
        storage.write("uploads/ch.pdf", b"%PDF").await.unwrap();

        let pdf = resolve_local_pdf(&storage, "uploads/ch.pdf").await.unwrap();
        assert!(matches!(pdf, LocalPdf::Direct(_)));
        assert!(pdf.path().starts_with(dir.path()));
    }
}
