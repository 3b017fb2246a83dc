//! Flat-file chat storage.
//!
//! Each save writes a new file named after a local timestamp
//! (`YYYY-MM-DD HH:MM:SS`) holding `{"chat": [{role, content}, ...]}`.
//! Saves from different tenants land in different files, so no locking is
//! needed beyond idempotent directory creation. Two saves within the same
//! second overwrite each other.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use parley_core::{ChatRecord, Conversation};
use tracing::info;

pub const FILE_NAME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct ChatStore {
    directory: PathBuf,
}

impl ChatStore {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub fn path_for(&self, timestamp: DateTime<Local>) -> PathBuf {
        self.directory
            .join(timestamp.format(FILE_NAME_FORMAT).to_string())
    }

    /// Write `conversation` to `<directory>/<timestamp>`, creating the
    /// directory if needed.
    pub fn write(
        &self,
        conversation: &Conversation,
        timestamp: DateTime<Local>,
    ) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.directory).with_context(|| {
            format!("Failed to create chat directory {}", self.directory.display())
        })?;

        let path = self.path_for(timestamp);
        let body = serde_json::to_vec(&conversation.to_persistable())?;
        std::fs::write(&path, body)
            .with_context(|| format!("Failed to write chat file {}", path.display()))?;

        info!(
            "Stored chat with {} turns as {}",
            conversation.len(),
            path.display()
        );
        Ok(path)
    }

    /// Read a saved chat back into a conversation.
    pub fn load(path: &Path) -> anyhow::Result<Conversation> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chat file {}", path.display()))?;
        let record: ChatRecord = serde_json::from_str(&content)
            .with_context(|| format!("Invalid chat file {}", path.display()))?;
        Ok(Conversation::from_messages(record.chat)?)
    }
}
