//! Dialogue tree storage.
//!
//! Trees are loaded once at startup and served as shared immutable values.
//! Replacing a tree at runtime goes through `upsert`, which re-validates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use taleweave_domain::{DialogueTree, DomainError, TreeId};

use crate::infrastructure::dialogue_files::DialogueFileReader;

/// A content file that could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a content load. Loading never fails as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<TreeId>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    fn skip(&mut self, path: &Path, reason: impl ToString) {
        let reason = reason.to_string();
        tracing::warn!(path = %path.display(), reason = %reason, "Skipping dialogue file");
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }
}

/// In-memory dialogue tree store.
#[derive(Default)]
pub struct DialogueTreeStore {
    trees: DashMap<TreeId, Arc<DialogueTree>>,
}

impl DialogueTreeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every tree file under `<content_path>/dialogue`.
    ///
    /// Each file is parsed and validated on its own; a malformed file is
    /// logged and skipped and the rest still load.
    pub async fn load(&self, content_path: &Path) -> LoadReport {
        let reader = DialogueFileReader::new(content_path);
        let mut report = LoadReport::default();

        let files = match reader.list_files().await {
            Ok(files) => files,
            Err(e) => {
                report.skip(&reader.dialogue_dir(), e);
                return report;
            }
        };

        for path in files {
            let tree = match reader.read_tree(&path).await {
                Ok(tree) => tree,
                Err(e) => {
                    report.skip(&path, e);
                    continue;
                }
            };
            if let Err(e) = tree.validate() {
                report.skip(&path, e);
                continue;
            }

            let id = tree.id.clone();
            if self.trees.insert(id.clone(), Arc::new(tree)).is_some() {
                tracing::warn!(tree_id = %id, path = %path.display(), "Dialogue tree id loaded twice, later file wins");
            }
            report.loaded.push(id);
        }

        tracing::info!(
            loaded = report.loaded.len(),
            skipped = report.skipped.len(),
            path = %reader.dialogue_dir().display(),
            "Dialogue trees loaded"
        );
        report
    }

    pub fn get(&self, id: &TreeId) -> Option<Arc<DialogueTree>> {
        self.trees.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// All trees, ordered by id.
    pub fn get_all(&self) -> Vec<Arc<DialogueTree>> {
        let mut trees: Vec<_> = self.trees.iter().map(|e| Arc::clone(e.value())).collect();
        trees.sort_by(|a, b| a.id.cmp(&b.id));
        trees
    }

    pub fn contains(&self, id: &TreeId) -> bool {
        self.trees.contains_key(id)
    }

    /// Insert or replace a tree after validating it.
    pub fn upsert(&self, tree: DialogueTree) -> Result<(), DomainError> {
        tree.validate()?;
        let id = tree.id.clone();
        let replaced = self.trees.insert(id.clone(), Arc::new(tree)).is_some();
        tracing::info!(tree_id = %id, replaced, "Dialogue tree upserted");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::dialogue_files::DIALOGUE_FOLDER;
    use taleweave_domain::DialogueNode;

    const SMITH_YAML: &str = r#"
id: smith
name: The Smith
startNodeId: greet
nodes:
  greet:
    id: greet
    npcMessage: Hello
"#;

    const NO_START_JSON: &str = r#"{
        "id": "broken",
        "name": "Broken",
        "startNodeId": "missing",
        "nodes": { "a": { "id": "a", "npcMessage": "" } }
    }"#;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).expect("write");
    }

    #[tokio::test]
    async fn malformed_files_are_skipped_and_the_rest_load() {
        let root = tempfile::tempdir().expect("tempdir");
        let dir = root.path().join(DIALOGUE_FOLDER);
        std::fs::create_dir_all(&dir).expect("mkdir");
        write(&dir, "smith.yaml", SMITH_YAML);
        write(&dir, "broken.json", NO_START_JSON);
        write(&dir, "garbage.yml", "id: [unterminated");

        let store = DialogueTreeStore::new();
        let report = store.load(root.path()).await;

        assert_eq!(report.loaded, vec![TreeId::new("smith")]);
        assert_eq!(report.skipped.len(), 2);
        assert!(store.get(&TreeId::new("smith")).is_some());
        assert!(store.get(&TreeId::new("broken")).is_none());
    }

    #[tokio::test]
    async fn missing_content_folder_loads_nothing() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = DialogueTreeStore::new();
        let report = store.load(root.path()).await;
        assert!(report.loaded.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_rejects_invalid_trees() {
        let store = DialogueTreeStore::new();
        let mut tree = crate::test_fixtures::shop_tree();
        tree.start_node_id = "nowhere".to_string();

        let err = store.upsert(tree).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_replaces_existing_trees() {
        let store = DialogueTreeStore::new();
        let mut tree = crate::test_fixtures::shop_tree();
        store.upsert(tree.clone()).expect("first");

        tree.nodes
            .insert("extra".to_string(), DialogueNode::new("extra", "More"));
        store.upsert(tree.clone()).expect("second");

        assert_eq!(store.len(), 1);
        let stored = store.get(&tree.id).expect("stored");
        assert!(stored.node("extra").is_some());
    }

    #[test]
    fn get_all_is_ordered_by_id() {
        let store = DialogueTreeStore::new();
        let mut b = crate::test_fixtures::shop_tree();
        b.id = TreeId::new("b");
        let mut a = crate::test_fixtures::shop_tree();
        a.id = TreeId::new("a");
        store.upsert(b).expect("b");
        store.upsert(a).expect("a");

        let ids: Vec<_> = store.get_all().iter().map(|t| t.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
