//! Document persistence layer
//!
//! This module provides the byte-level storage collaborator used by the palette
//! engine: configuration documents are read through it at initialization and
//! preset files are loaded and saved through it afterwards.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Store path is unusable
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// A single named document that can be read and written as raw bytes
///
/// The palette engine never touches the file system directly; it only sees
/// this trait, so hosts can back it with file pickers, browser storage or
/// plain memory.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the whole document
    async fn read(&self) -> Result<Vec<u8>>;

    /// Replace the whole document
    async fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Display name of the document (the file stem for file-backed stores)
    fn name(&self) -> String;
}

/// File store configuration
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path to the document
    pub path: PathBuf,
    /// Enable atomic writes with temp files
    pub atomic_writes: bool,
    /// Enable automatic backups before overwriting
    pub auto_backup: bool,
    /// Number of backups to keep
    pub backup_count: usize,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("palette.json"),
            atomic_writes: true,
            auto_backup: false,
            backup_count: 3,
        }
    }
}

impl FileStoreConfig {
    /// Create a new configuration
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }

    /// Configure backups
    pub fn backups(mut self, enabled: bool, count: usize) -> Self {
        self.auto_backup = enabled;
        self.backup_count = count;
        self
    }
}

/// File-backed document store
#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    /// Create a store with default settings for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_config(FileStoreConfig::new(path))
    }

    /// Create a store from an explicit configuration
    pub fn with_config(config: FileStoreConfig) -> Self {
        Self { config }
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Write atomically using temp file + rename
    async fn write_atomic(&self, contents: &[u8]) -> Result<()> {
        let temp_path = self.config.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.config.path).await?;

        Ok(())
    }

    /// Rotate backups and copy the current document into slot 1
    ///
    /// A `backup_count` of 0 keeps no backups.
    async fn create_backup(&self) -> Result<()> {
        if self.config.backup_count == 0 || !self.config.path.exists() {
            return Ok(());
        }

        for i in (1..self.config.backup_count).rev() {
            let from = self.backup_path(i)?;
            let to = self.backup_path(i + 1)?;

            if from.exists() {
                if let Err(e) = fs::rename(&from, &to).await {
                    tracing::warn!("Rotating backup {} failed: {}", from.display(), e);
                }
            }
        }

        fs::copy(&self.config.path, self.backup_path(1)?).await?;

        Ok(())
    }

    /// Get backup file path
    pub fn backup_path(&self, n: usize) -> Result<PathBuf> {
        let filename = self
            .config
            .path
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(self.config.path.display().to_string()))?
            .to_string_lossy()
            .to_string();

        let mut path = self.config.path.clone();
        path.set_file_name(format!("{}.backup.{}", filename, n));
        Ok(path)
    }

    /// Restore the document from a backup slot
    pub async fn restore_from_backup(&self, backup_number: usize) -> Result<()> {
        let backup_path = self.backup_path(backup_number)?;

        if !backup_path.exists() {
            return Err(StorageError::NotFound(backup_path.display().to_string()));
        }

        fs::copy(&backup_path, &self.config.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self) -> Result<Vec<u8>> {
        match fs::read(&self.config.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(self.config.path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        if self.config.auto_backup {
            if let Err(e) = self.create_backup().await {
                tracing::warn!("Backup of {} failed: {}", self.config.path.display(), e);
            }
        }

        if self.config.atomic_writes {
            self.write_atomic(bytes).await?;
        } else {
            fs::write(&self.config.path, bytes).await?;
        }

        tracing::debug!("Wrote {} bytes to {}", bytes.len(), self.config.path.display());
        Ok(())
    }

    fn name(&self) -> String {
        self.config
            .path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.config.path.display().to_string())
    }
}

/// In-memory document store (for tests and hosts without a file system)
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    data: RwLock<Option<Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), data: RwLock::new(None) }
    }

    /// Create a store that already holds a document
    pub fn with_contents(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: RwLock::new(Some(contents.into())) }
    }

    /// Snapshot of the current contents
    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self) -> Result<Vec<u8>> {
        self.data
            .read()
            .await
            .clone()
            .ok_or_else(|| StorageError::NotFound(self.name.clone()))
    }

    async fn write(&self, bytes: &[u8]) -> Result<()> {
        *self.data.write().await = Some(bytes.to_vec());
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("preset.json"));

        store.write(b"{\"Id\":\"a\"}").await.unwrap();
        let bytes = store.read().await.unwrap();

        assert_eq!(bytes, b"{\"Id\":\"a\"}");
        assert_eq!(store.name(), "preset");
    }

    #[tokio::test]
    async fn test_file_store_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));

        let result = store.read().await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_atomic_writes_clean_up_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("atomic.json");
        let store = FileStore::with_config(FileStoreConfig::new(&path).atomic_writes(true));

        store.write(b"first").await.unwrap();

        assert!(!path.with_extension("tmp").exists());
        assert_eq!(fs::read(&path).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_non_atomic_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.json");
        let store = FileStore::with_config(FileStoreConfig::new(&path).atomic_writes(false));

        store.write(b"plain").await.unwrap();
        assert_eq!(store.read().await.unwrap(), b"plain");
    }

    #[tokio::test]
    async fn test_backups_rotate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.json");
        let store = FileStore::with_config(FileStoreConfig::new(&path).backups(true, 2));

        for i in 1..=3 {
            store.write(format!("v{}", i).as_bytes()).await.unwrap();
        }

        // backup.1 holds the state before the last write, backup.2 the one before that
        assert_eq!(fs::read(store.backup_path(1).unwrap()).await.unwrap(), b"v2");
        assert_eq!(fs::read(store.backup_path(2).unwrap()).await.unwrap(), b"v1");

        store.restore_from_backup(2).await.unwrap();
        assert_eq!(store.read().await.unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_zero_backup_count_keeps_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nobackup.json");
        let store = FileStore::with_config(FileStoreConfig::new(&path).backups(true, 0));

        store.write(b"v1").await.unwrap();
        store.write(b"v2").await.unwrap();

        assert!(!store.backup_path(1).unwrap().exists());
        assert_eq!(store.read().await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_restore_missing_backup() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("none.json"));

        let result = store.restore_from_backup(1).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new("memory.json");
        assert!(matches!(store.read().await, Err(StorageError::NotFound(_))));

        store.write(b"data").await.unwrap();
        assert_eq!(store.read().await.unwrap(), b"data");
        assert_eq!(store.contents().await, Some(b"data".to_vec()));
        assert_eq!(store.name(), "memory.json");
    }

    #[tokio::test]
    async fn test_memory_store_with_contents() {
        let store = MemoryStore::with_contents("seeded", "hello");
        assert_eq!(store.read().await.unwrap(), b"hello");
    }
}
