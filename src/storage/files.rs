use super::StorageError;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Ensures the parent directory of `path` exists
pub async fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Writes `bytes` to `path`, creating parent directories and replacing any existing file
pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    ensure_parent(path).await?;
    fs::write(path, bytes)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Opens `path` for streaming writes, truncating an existing file
pub async fn create_file(path: &Path) -> Result<File, StorageError> {
    ensure_parent(path).await?;
    File::create(path)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Appends one chunk to a file opened with [`create_file`]
pub async fn write_chunk(file: &mut File, path: &Path, chunk: &[u8]) -> Result<(), StorageError> {
    file.write_all(chunk)
        .await
        .map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Flushes a streamed file to disk
pub async fn finish_file(mut file: File, path: &Path) -> Result<(), StorageError> {
    file.flush().await.map_err(|source| StorageError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn read_file(path: &Path) -> Result<Vec<u8>, StorageError> {
    fs::read(path).await.map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a saved file as text, replacing invalid UTF-8 sequences
pub async fn read_text(path: &Path) -> Result<String, StorageError> {
    let bytes = read_file(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Copies a saved file to `to`, creating parent directories
pub async fn copy_file(from: &Path, to: &Path) -> Result<u64, StorageError> {
    ensure_parent(to).await?;
    fs::copy(from, to)
        .await
        .map_err(|source| StorageError::Write {
            path: to.to_path_buf(),
            source,
        })
}
