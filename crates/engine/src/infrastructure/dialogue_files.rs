//! Dialogue content files.
//!
//! One tree per file under `<content>/dialogue/`, in YAML (`.yaml`, `.yml`)
//! or JSON (`.json`). Other files in the folder are ignored.

use std::path::{Path, PathBuf};

use taleweave_domain::DialogueTree;
use thiserror::Error;
use tokio::fs;

/// Name of the folder under the content root that holds tree files.
pub const DIALOGUE_FOLDER: &str = "dialogue";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported content file: {0}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeFormat {
    Yaml,
    Json,
}

impl TreeFormat {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads dialogue tree files from a content root.
pub struct DialogueFileReader {
    content_path: PathBuf,
}

impl DialogueFileReader {
    pub fn new(content_path: impl Into<PathBuf>) -> Self {
        Self {
            content_path: content_path.into(),
        }
    }

    pub fn dialogue_dir(&self) -> PathBuf {
        self.content_path.join(DIALOGUE_FOLDER)
    }

    /// Tree files in the dialogue folder, sorted by path.
    ///
    /// A missing folder yields an empty list.
    pub async fn list_files(&self) -> Result<Vec<PathBuf>, ContentError> {
        let dir = self.dialogue_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %dir.display(), "Dialogue folder not found, no trees loaded");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && TreeFormat::of(&path).is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Parse one tree file. Does not validate the tree.
    pub async fn read_tree(&self, path: &Path) -> Result<DialogueTree, ContentError> {
        let format =
            TreeFormat::of(path).ok_or_else(|| ContentError::UnsupportedFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).await?;
        parse_tree(&content, format)
    }
}

fn parse_tree(content: &str, format: TreeFormat) -> Result<DialogueTree, ContentError> {
    let tree = match format {
        TreeFormat::Yaml => serde_yaml::from_str(content)?,
        TreeFormat::Json => serde_json::from_str(content)?,
    };
    Ok(tree)
}
