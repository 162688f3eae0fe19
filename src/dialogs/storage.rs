//! Conversation state stores and on-disk layout
//!
//! The engine persists exactly one thing per conversation: its
//! [`DialogStackState`]. A [`StateStore`] loads it before a turn and saves it
//! afterwards. Each conversation's stack is read, mutated and written as a
//! unit, which is what keeps conversations isolated from one another.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::EngineConfig;
use super::error::{Result, StorageError, StorageResult};
use super::instance::DialogStackState;
use crate::STATE_FORMAT_VERSION;

/// Persistence for per-conversation dialog stacks
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stack for `conversation_id`, if one was saved
    async fn read(&self, conversation_id: &str) -> Result<Option<DialogStackState>>;

    /// Save the stack for `conversation_id`
    async fn write(&self, conversation_id: &str, state: &DialogStackState) -> Result<()>;

    /// Forget the stack for `conversation_id`
    async fn delete(&self, conversation_id: &str) -> Result<()>;
}

/// In-process store
///
/// Stacks are kept in serialized form so that every turn rehydrates its stack
/// exactly as a persistent store would.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    conversations: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with saved state
    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    /// Check whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStorage {
    async fn read(&self, conversation_id: &str) -> Result<Option<DialogStackState>> {
        let stored = self.conversations.read().get(conversation_id).cloned();
        match stored {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, conversation_id: &str, state: &DialogStackState) -> Result<()> {
        let value = serde_json::to_value(state)?;
        self.conversations
            .write()
            .insert(conversation_id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.conversations.write().remove(conversation_id);
        Ok(())
    }
}

/// On-disk envelope around a saved stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConversation {
    /// Format version of this file
    pub version: u32,
    /// Conversation the stack belongs to
    pub conversation_id: String,
    /// When the stack was written
    pub saved_at: DateTime<Utc>,
    /// The stack itself
    pub state: DialogStackState,
}

/// Directory layout manager for engine persistence
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Get the conversations directory path
    pub fn conversations_dir(&self) -> PathBuf {
        self.root.join("conversations")
    }

    /// Get the state file path for a conversation
    ///
    /// Characters outside `[A-Za-z0-9_-]` are replaced so that any
    /// conversation id maps to a single file inside the directory.
    pub fn conversation_path(&self, conversation_id: &str) -> PathBuf {
        let file_name: String = conversation_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.conversations_dir().join(format!("{file_name}.json"))
    }

    /// Write data atomically to a file
    ///
    /// Creates a temporary file, writes the data, syncs, then renames
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let temp_path = path.with_extension("tmp");
        let failed = |detail: String| StorageError::AtomicWriteFailed {
            path: path.to_path_buf(),
            detail,
        };

        let mut file = File::create(&temp_path)
            .map_err(|e| failed(format!("create {}: {e}", temp_path.display())))?;
        file.write_all(data)
            .map_err(|e| failed(format!("write: {e}")))?;
        file.sync_all().map_err(|e| failed(format!("sync: {e}")))?;
        drop(file);

        fs::rename(&temp_path, path).map_err(|e| failed(format!("rename: {e}")))?;

        if let Some(parent) = path.parent() {
            let dir = OpenOptions::new().read(true).open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Read a file that must exist
    pub fn read_file(&self, path: &Path) -> StorageResult<Vec<u8>> {
        self.read_optional(path)?
            .ok_or_else(|| StorageError::PathNotFound(path.to_path_buf()))
    }

    /// Read a file, `None` if it does not exist
    pub fn read_optional(&self, path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Create a directory and all parent directories
    pub fn create_dir_all(&self, path: &Path) -> StorageResult<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Conversation ids with a saved stack, derived from file names
    pub fn list_conversations(&self) -> StorageResult<Vec<String>> {
        let dir = self.conversations_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Store that keeps one JSON file per conversation
#[derive(Debug, Clone)]
pub struct FileStorage {
    storage: Storage,
}

impl FileStorage {
    /// Store files under `root/conversations`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: Storage::new(root.into()),
        }
    }

    /// The underlying layout
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

#[async_trait]
impl StateStore for FileStorage {
    async fn read(&self, conversation_id: &str) -> Result<Option<DialogStackState>> {
        let storage = self.storage.clone();
        let path = storage.conversation_path(conversation_id);
        let data = tokio::task::spawn_blocking(move || storage.read_optional(&path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        let Some(data) = data else {
            return Ok(None);
        };
        let stored: StoredConversation =
            serde_json::from_slice(&data).map_err(StorageError::from)?;
        if stored.version != STATE_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: stored.version,
                expected: STATE_FORMAT_VERSION,
            }
            .into());
        }
        Ok(Some(stored.state))
    }

    async fn write(&self, conversation_id: &str, state: &DialogStackState) -> Result<()> {
        let stored = StoredConversation {
            version: STATE_FORMAT_VERSION,
            conversation_id: conversation_id.to_string(),
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let data = serde_json::to_vec_pretty(&stored).map_err(StorageError::from)?;

        let storage = self.storage.clone();
        let path = storage.conversation_path(conversation_id);
        tokio::task::spawn_blocking(move || {
            storage.create_dir_all(&storage.conversations_dir())?;
            storage.write_atomic(&path, &data)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        tracing::debug!(
            conversation_id,
            depth = state.depth(),
            "conversation state saved"
        );
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<()> {
        let path = self.storage.conversation_path(conversation_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::from(err).into()),
        }
    }
}

/// Initialize storage directories
pub fn init_storage(root: &Path) -> anyhow::Result<()> {
    let storage = Storage::new(root.to_path_buf());
    storage
        .create_dir_all(root)
        .with_context(|| format!("Failed to create directory: {:?}", root))?;
    storage
        .create_dir_all(&storage.conversations_dir())
        .context("Failed to create conversations directory")?;
    Ok(())
}

/// Write engine configuration
pub fn write_config(config: &EngineConfig) -> anyhow::Result<()> {
    let storage = Storage::new(config.root.clone());
    let config_path = storage.config_path();

    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    storage
        .write_atomic(&config_path, &json)
        .with_context(|| format!("Failed to write config: {:?}", config_path))?;

    Ok(())
}

/// Load engine configuration
pub fn load_config(root: &Path) -> anyhow::Result<EngineConfig> {
    let storage = Storage::new(root.to_path_buf());
    let config_path = storage.config_path();

    let data = storage
        .read_file(&config_path)
        .with_context(|| format!("Failed to read file: {:?}", config_path))?;
    let config: EngineConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::instance::DialogInstance;
    use tempfile::TempDir;

    fn sample_state() -> DialogStackState {
        let mut top = DialogInstance::new("age");
        top.state.set("attempts", &2u32).unwrap();
        DialogStackState {
            dialog_stack: vec![DialogInstance::new("profile"), top],
        }
    }

    #[test]
    fn test_init_storage() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        init_storage(root).unwrap();

        assert!(root.join("conversations").exists());
    }

    #[test]
    fn test_write_and_read_config() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();

        init_storage(&root).unwrap();

        let config = EngineConfig {
            root: root.clone(),
            root_dialog: "profile".to_string(),
            conversation_id: "alice".to_string(),
            debug: true,
        };

        write_config(&config).unwrap();
        let loaded = load_config(&root).unwrap();

        assert_eq!(loaded.root_dialog, "profile");
        assert_eq!(loaded.conversation_id, "alice");
        assert!(loaded.debug);
    }

    #[test]
    fn test_load_config_without_init_fails() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path()).unwrap_err();
        assert!(err.downcast_ref::<StorageError>().is_some());
    }

    #[test]
    fn test_conversation_path_is_flat() {
        let storage = Storage::new(PathBuf::from("/tmp/dialogs"));
        let path = storage.conversation_path("../team/alice");
        assert_eq!(path, PathBuf::from("/tmp/dialogs/conversations/___team_alice.json"));
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip_and_isolation() {
        let store = MemoryStorage::new();
        store.write("a", &sample_state()).await.unwrap();

        assert_eq!(store.read("a").await.unwrap(), Some(sample_state()));
        assert_eq!(store.read("b").await.unwrap(), None);

        store.delete("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_persists_across_instances() {
        let temp = TempDir::new().unwrap();

        FileStorage::new(temp.path())
            .write("alice", &sample_state())
            .await
            .unwrap();

        let reopened = FileStorage::new(temp.path());
        assert_eq!(reopened.read("alice").await.unwrap(), Some(sample_state()));
        assert_eq!(
            reopened.storage().list_conversations().unwrap(),
            vec!["alice".to_string()]
        );

        reopened.delete("alice").await.unwrap();
        reopened.delete("alice").await.unwrap();
        assert_eq!(reopened.read("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_rejects_unknown_version() {
        let temp = TempDir::new().unwrap();
        let store = FileStorage::new(temp.path());
        store.write("bob", &sample_state()).await.unwrap();

        let path = store.storage().conversation_path("bob");
        let mut stored: StoredConversation =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        stored.version = STATE_FORMAT_VERSION + 1;
        std::fs::write(&path, serde_json::to_vec(&stored).unwrap()).unwrap();

        let err = store.read("bob").await.unwrap_err();
        assert!(matches!(
            err,
            crate::dialogs::error::DialogError::Storage(StorageError::UnsupportedVersion { .. })
        ));
    }
}
