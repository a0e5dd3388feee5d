use std::path::{Component, Path, PathBuf};

use supply_protocol::Document;

use crate::error::DatasetError;

/// Read-only directory of JSON dataset files.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(&self, reference: &str) -> Result<Document, DatasetError> {
        load(reference, &self.root)
    }
}

/// Resolve `reference` under `root` and parse it as JSON, unchanged.
///
/// References must stay inside `root`: absolute paths and `..` components are
/// rejected before the filesystem is touched.
pub fn load(reference: &str, root: &Path) -> Result<Document, DatasetError> {
    let relative = Path::new(reference);
    let inside_root = !reference.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside_root {
        return Err(DatasetError::OutsideRoot {
            reference: reference.to_string(),
        });
    }

    let path = root.join(relative);
    if !path.is_file() {
        return Err(DatasetError::Missing { path });
    }

    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DatasetError::Missing { path });
        }
        Err(source) => return Err(DatasetError::Io { path, source }),
    };

    serde_json::from_slice(&raw).map_err(|source| DatasetError::Malformed { path, source })
}
