//! Snapshots: the world as currently known.
//!
//! A [`Snapshot`] maps file paths to parsed [`Document`]s and is never
//! mutated once shared. The [`SnapshotStore`] holds the current snapshot
//! behind an `Arc`; a request pins one snapshot with
//! [`SnapshotStore::snapshot`] and keeps using it even if the host swaps in
//! a newer one meanwhile.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Document, Language};
use crate::error::SenseResult;

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable collection of documents, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    documents: BTreeMap<String, Arc<Document>>,
    builtins: Vec<Arc<Document>>,
}

/// On-disk form of a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Builtin documents (language runtime globals, framework types).
    #[serde(default)]
    pub builtins: Vec<Document>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Build a snapshot from documents; a later document with the same path
    /// replaces an earlier one.
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut snapshot = Snapshot::new();
        for doc in documents {
            snapshot.documents.insert(doc.path.clone(), Arc::new(doc));
        }
        snapshot
    }

    /// Add builtin documents.
    pub fn with_builtins(mut self, builtins: impl IntoIterator<Item = Document>) -> Self {
        self.builtins.extend(builtins.into_iter().map(Arc::new));
        self
    }

    /// Load a snapshot file written by a host parser.
    pub fn load(path: &Path) -> SenseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: SnapshotFile = serde_json::from_str(&content)?;
        let snapshot = Snapshot::from_documents(file.documents).with_builtins(file.builtins);
        debug!(
            path = %path.display(),
            documents = snapshot.len(),
            builtins = snapshot.builtins.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Look up a document by path.
    pub fn document(&self, path: &str) -> Option<&Arc<Document>> {
        self.documents.get(path)
    }

    /// All documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    /// Builtin documents of the language family of `language`.
    pub fn builtins_for(&self, language: Language) -> impl Iterator<Item = &Arc<Document>> {
        self.builtins
            .iter()
            .filter(move |doc| doc.language.same_family(language))
    }

    /// Number of (non-builtin) documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the snapshot holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Resolve an `#include` spelling from `from`.
    ///
    /// Tries the path relative to the including file, then the exact path,
    /// then any document whose path ends with `/<include>`.
    pub fn resolve_include(&self, from: &Document, include: &str) -> Option<&Arc<Document>> {
        let dir = from.directory();
        if !dir.is_empty() {
            if let Some(doc) = self.documents.get(&format!("{dir}/{include}")) {
                return Some(doc);
            }
        }
        if let Some(doc) = self.documents.get(include) {
            return Some(doc);
        }
        let suffix = format!("/{include}");
        self.documents
            .iter()
            .find(|(path, _)| path.ends_with(&suffix))
            .map(|(_, doc)| doc)
    }

    /// Documents reachable from `doc` through includes, depth-first,
    /// excluding `doc` itself. Missing includes are skipped.
    pub fn included_documents(&self, doc: &Document) -> Vec<&Arc<Document>> {
        let mut processed: HashSet<&str> = HashSet::new();
        processed.insert(doc.path.as_str());
        let mut result = Vec::new();
        let mut stack: Vec<&str> = doc.includes.iter().rev().map(String::as_str).collect();
        let mut from: Vec<&Document> = vec![doc; stack.len()];

        while let (Some(include), Some(origin)) = (stack.pop(), from.pop()) {
            let Some(included) = self.resolve_include(origin, include) else {
                debug!(include, from = %origin.path, "include not in snapshot");
                continue;
            };
            if !processed.insert(included.path.as_str()) {
                continue;
            }
            result.push(included);
            for nested in included.includes.iter().rev() {
                stack.push(nested.as_str());
                from.push(included.as_ref());
            }
        }
        result
    }
}

// ============================================================================
// Snapshot Store
// ============================================================================

/// Thread-safe holder of the current snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store holding `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        SnapshotStore {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Pin the current snapshot for one request.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Merge reparsed documents into a new snapshot.
    ///
    /// A document replaces the one with the same path only when its revision
    /// is newer; stale revisions are ignored. Returns how many documents
    /// were added or replaced.
    pub fn update(&self, documents: impl IntoIterator<Item = Document>) -> usize {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Snapshot::clone(&guard);
        let mut changed = 0;
        for doc in documents {
            let newer = next
                .documents
                .get(&doc.path)
                .is_none_or(|existing| doc.revision > existing.revision);
            if newer {
                next.documents.insert(doc.path.clone(), Arc::new(doc));
                changed += 1;
            } else {
                debug!(path = %doc.path, revision = doc.revision, "ignoring stale document");
            }
        }
        if changed > 0 {
            debug!(changed, documents = next.len(), "snapshot replaced");
            *guard = Arc::new(next);
        }
        changed
    }

    /// Drop a document; returns whether it was present.
    pub fn remove(&self, path: &str) -> bool {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        if guard.document(path).is_none() {
            return false;
        }
        let mut next = Snapshot::clone(&guard);
        next.documents.remove(path);
        debug!(path, documents = next.len(), "document removed from snapshot");
        *guard = Arc::new(next);
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocumentBuilder;

    fn cpp(path: &str, revision: u64, includes: &[&str]) -> Document {
        let mut builder = DocumentBuilder::new(path, Language::Cpp).revision(revision);
        for include in includes {
            builder.include(*include);
        }
        builder.finish()
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn same_path_keeps_one_document() {
            let snapshot = Snapshot::from_documents([cpp("a.h", 1, &[]), cpp("a.h", 2, &[])]);
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot.document("a.h").unwrap().revision, 2);
        }

        #[test]
        fn includes_are_transitive_and_cycle_safe() {
            let snapshot = Snapshot::from_documents([
                cpp("src/main.cpp", 1, &["a.h"]),
                cpp("src/a.h", 1, &["b.h", "missing.h"]),
                cpp("include/b.h", 1, &["a.h"]),
            ]);
            let main = snapshot.document("src/main.cpp").unwrap();
            let paths: Vec<&str> = snapshot
                .included_documents(main)
                .iter()
                .map(|d| d.path.as_str())
                .collect();
            assert_eq!(paths, vec!["src/a.h", "include/b.h"]);
        }

        #[test]
        fn builtins_filtered_by_family() {
            let snapshot = Snapshot::new().with_builtins([
                DocumentBuilder::new("<js>", Language::JavaScript).finish(),
                DocumentBuilder::new("<c++>", Language::Cpp).finish(),
            ]);
            let qml: Vec<&str> = snapshot
                .builtins_for(Language::Qml)
                .map(|d| d.path.as_str())
                .collect();
            assert_eq!(qml, vec!["<js>"]);
        }

        #[test]
        fn load_snapshot_file() {
            let file = SnapshotFile {
                documents: vec![cpp("main.cpp", 3, &[])],
                builtins: Vec::new(),
            };
            let tmp = tempfile::NamedTempFile::new().unwrap();
            std::fs::write(tmp.path(), serde_json::to_string(&file).unwrap()).unwrap();
            let snapshot = Snapshot::load(tmp.path()).unwrap();
            assert_eq!(snapshot.document("main.cpp").unwrap().revision, 3);
        }
    }

    mod store_tests {
        use super::*;

        #[test]
        fn pinned_snapshot_survives_update() {
            let store = SnapshotStore::new(Snapshot::from_documents([cpp("a.cpp", 1, &[])]));
            let pinned = store.snapshot();
            assert_eq!(store.update([cpp("a.cpp", 2, &[])]), 1);

            assert_eq!(pinned.document("a.cpp").unwrap().revision, 1);
            assert_eq!(store.snapshot().document("a.cpp").unwrap().revision, 2);
        }

        #[test]
        fn stale_revision_is_ignored() {
            let store = SnapshotStore::new(Snapshot::from_documents([cpp("a.cpp", 5, &[])]));
            let before = store.snapshot();
            assert_eq!(store.update([cpp("a.cpp", 4, &[])]), 0);
            assert!(Arc::ptr_eq(&before, &store.snapshot()));
        }

        #[test]
        fn remove_document() {
            let store = SnapshotStore::new(Snapshot::from_documents([cpp("a.cpp", 1, &[])]));
            assert!(store.remove("a.cpp"));
            assert!(!store.remove("a.cpp"));
            assert!(store.snapshot().is_empty());
        }
    }
}
