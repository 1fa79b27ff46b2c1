//! JSON file storage for conversation snapshots.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::infrastructure::ports::{ConversationSnapshot, PortError, SnapshotPort};

/// Stores the latest snapshot as a single JSON document.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct JsonSnapshotFile {
    path: PathBuf,
}

impl JsonSnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotPort for JsonSnapshotFile {
    async fn save(&self, snapshot: &ConversationSnapshot) -> Result<(), PortError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::storage("snapshot.create_dir", e))?;
        }

        let json = serde_json::to_vec_pretty(snapshot).map_err(PortError::serialization)?;
        let temp = self.temp_path();
        fs::write(&temp, json)
            .await
            .map_err(|e| PortError::storage("snapshot.write", e))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| PortError::storage("snapshot.rename", e))?;

        tracing::debug!(
            path = %self.path.display(),
            conversations = snapshot.len(),
            "Conversation snapshot written"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<ConversationSnapshot>, PortError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::storage("snapshot.read", e)),
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(PortError::serialization)?;
        Ok(Some(snapshot))
    }
}
