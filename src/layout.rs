//! Persisted window layout.
//!
//! The layout is a single JSON object keyed by window id:
//!
//! ```json
//! {
//!   "0x55d1c8a0": { "position": [0, 1], "size": [480, 270] },
//!   "0x55d1c9f0": { "position": [1, 0], "size": [480, 270] }
//! }
//! ```
//!
//! `position` is `[row, col]`; `size` is `[width, height]` in pixels at the
//! time of the save.  The file is always rewritten in full, through a
//! temporary sibling file that is renamed into place.

use crate::command::WindowId;
use crate::grid::GridCell;
use crate::registry::Registry;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Persisted placement of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRecord {
    pub position: GridCell,
    pub size: (u32, u32),
}

/// Every persisted record, ordered by window id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout {
    records: BTreeMap<String, LayoutRecord>,
}

impl Layout {
    /// A layout with no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every placed slot of `registry`.
    pub fn from_registry(registry: &Registry) -> Self {
        let records = registry
            .placed()
            .filter_map(|slot| {
                let placement = slot.placement()?;
                Some((
                    slot.id().to_string(),
                    LayoutRecord {
                        position: placement.cell,
                        size: (placement.geometry.width, placement.geometry.height),
                    },
                ))
            })
            .collect();
        Self { records }
    }

    /// Add or replace the record of `id`.
    pub fn insert(&mut self, id: &WindowId, record: LayoutRecord) {
        self.records.insert(id.to_string(), record);
    }

    /// Record stored for `id`.
    pub fn get(&self, id: &WindowId) -> Option<&LayoutRecord> {
        self.records.get(id.as_str())
    }

    /// `(window id, record)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &LayoutRecord)> {
        self.records
            .iter()
            .map(|(k, v)| (WindowId::new(k.as_str()), v))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when no record is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Errors from reading or writing the layout file.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed layout in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and writes the layout file at a fixed path.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    /// A store for the file at `path`; nothing is read yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the layout file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the layout.
    ///
    /// A missing file is an empty layout, not an error.
    pub fn load(&self) -> Result<Layout, LayoutError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no layout at {}", self.path.display());
                return Ok(Layout::new());
            }
            Err(source) => {
                return Err(LayoutError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| LayoutError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the file with `layout`.
    ///
    /// The parent directory is created if needed.  The data goes to
    /// `<file>.tmp` first and is renamed over the target, so a reader never
    /// sees a half-written layout.
    pub fn save(&self, layout: &Layout) -> Result<(), LayoutError> {
        let io_err = |source: std::io::Error| LayoutError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(layout).map_err(|source| LayoutError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).map_err(io_err)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(e));
        }
        debug!("saved {} layout record(s) to {}", layout.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "layout.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::WindowKind;
    use crate::grid::Geometry;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    /// Unique temporary directory per test.
    fn tmp_dir() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "astrodistro-layout-test-{}-{}",
            std::process::id(),
            id
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn record(row: usize, col: usize) -> LayoutRecord {
        LayoutRecord {
            position: GridCell::new(row, col),
            size: (400, 300),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = LayoutStore::new(tmp_dir().join("layout.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tmp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layout.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = LayoutStore::new(&path).load().unwrap_err();
        assert!(matches!(err, LayoutError::Json { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reads_documented_format() {
        let dir = tmp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layout.json");
        std::fs::write(&path, r#"{"w1": {"position": [0, 0], "size": [400, 300]}}"#).unwrap();
        let layout = LayoutStore::new(&path).load().unwrap();
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get(&"w1".into()), Some(&record(0, 0)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tmp_dir();
        let store = LayoutStore::new(dir.join("nested").join("layout.json"));
        let mut layout = Layout::new();
        layout.insert(&"0xa".into(), record(0, 1));
        layout.insert(&"0xb".into(), record(2, 3));
        store.save(&layout).unwrap();
        assert_eq!(store.load().unwrap(), layout);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_overwrites_longer_previous_content() {
        let dir = tmp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("layout.json");
        std::fs::write(&path, "x".repeat(4096)).unwrap();
        let store = LayoutStore::new(&path);
        let mut layout = Layout::new();
        layout.insert(&"w1".into(), record(0, 0));
        store.save(&layout).unwrap();
        assert_eq!(store.load().unwrap(), layout);
        assert!(!dir.join("layout.json.tmp").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_to_unwritable_path_fails() {
        let dir = tmp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = LayoutStore::new(blocker.join("layout.json"));
        let err = store.save(&Layout::new()).unwrap_err();
        assert!(matches!(err, LayoutError::Io { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn snapshot_contains_only_placed_slots() {
        let mut reg = Registry::new();
        reg.register("w1".into(), WindowKind::Normal);
        reg.register("w2".into(), WindowKind::Normal);
        reg.assign(&"w1".into(), GridCell::new(0, 1), Geometry::new(400, 0, 400, 300))
            .unwrap();
        let layout = Layout::from_registry(&reg);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout.get(&"w1".into()), Some(&record(0, 1)));
        assert!(layout.get(&"w2".into()).is_none());
    }

    #[test]
    fn serialized_shape_matches_file_format() {
        let mut layout = Layout::new();
        layout.insert(&"w1".into(), record(1, 0));
        let value = serde_json::to_value(&layout).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "w1": { "position": [1, 0], "size": [400, 300] } })
        );
    }

    #[test]
    fn iter_yields_window_ids_in_order() {
        let mut layout = Layout::new();
        layout.insert(&"b".into(), record(0, 1));
        layout.insert(&"a".into(), record(0, 0));
        let ids: Vec<String> = layout.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
