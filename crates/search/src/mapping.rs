use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use supply_protocol::MappingEntry;

use crate::error::{Result, SearchError};

/// Ordered activity label -> dataset file table.
///
/// Order is a priority order: resolution walks entries front to back and the
/// first one that qualifies wins. It is kept exactly as received from the
/// mapping source and never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON object `{"label": "file.json", ...}` keeping key order.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(SearchError::InvalidMapping(
                "expected a JSON object of label -> file name".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (label, dataset) in map {
            let serde_json::Value::String(dataset) = dataset else {
                return Err(SearchError::InvalidMapping(format!(
                    "dataset reference for {label:?} is not a string"
                )));
            };
            entries.push(MappingEntry::new(label, dataset));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<MappingEntry> for MappingTable {
    fn from_iter<I: IntoIterator<Item = MappingEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Process-wide handle to the current mapping table.
///
/// Readers take an `Arc` snapshot and keep it for a whole resolution; a refresh
/// swaps the reference in one step, so nobody ever sees a half-built table.
#[derive(Debug, Default)]
pub struct SharedMappingTable {
    current: RwLock<Arc<MappingTable>>,
}

impl SharedMappingTable {
    pub fn new(table: MappingTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    pub fn snapshot(&self) -> Arc<MappingTable> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the whole table; returns the previous snapshot.
    pub fn replace(&self, table: MappingTable) -> Arc<MappingTable> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(table))
    }
}

/// Something that can hand out a fresh mapping table.
#[async_trait]
pub trait MappingSource: Send + Sync {
    /// Human-readable origin used in log lines.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<MappingTable>;
}

/// Mapping stored as a JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileMappingSource {
    path: PathBuf,
}

impl FileMappingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MappingSource for FileMappingSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<MappingTable> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        MappingTable::from_json_str(&raw)
    }
}

/// Fetch the mapping, degrading to an empty table when the source fails.
pub async fn load_or_empty(source: &dyn MappingSource) -> MappingTable {
    match source.fetch().await {
        Ok(table) => {
            log::info!(
                "Loaded {} mapping entries from {}",
                table.len(),
                source.describe()
            );
            table
        }
        Err(err) => {
            log::error!(
                "Error fetching query mapping from {}: {err}; continuing with an empty table",
                source.describe()
            );
            MappingTable::empty()
        }
    }
}

/// Re-fetch the mapping into `shared`. A failed fetch keeps the current
/// snapshot and reports the error.
pub async fn refresh(shared: &SharedMappingTable, source: &dyn MappingSource) -> Result<usize> {
    let table = source.fetch().await.map_err(|err| {
        log::warn!(
            "Mapping refresh from {} failed: {err}; keeping {} current entries",
            source.describe(),
            shared.snapshot().len()
        );
        SearchError::MappingFetch(err.to_string())
    })?;
    let len = table.len();
    shared.replace(table);
    log::info!("Mapping refreshed from {} ({len} entries)", source.describe());
    Ok(len)
}
