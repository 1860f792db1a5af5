//! Run history: one JSON file per cycle result.

use std::path::PathBuf;

use tracing::debug;

use crate::{logging::targets, prelude::*, CycleResult, Error};

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Creates `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write `distribution-<timestamp>.json` and return its path.
    pub fn record(&self, result: &CycleResult) -> Result<PathBuf> {
        let name = format!(
            "distribution-{}.json",
            result.timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ")
        );
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| Error::json_parse(e.to_string()))?;
        std::fs::write(&path, json)?;
        debug!(target: targets::SERVER, path = %path.display(), "Cycle result saved");
        Ok(path)
    }

    /// Stored files, oldest first.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("distribution-") && n.ends_with(".json"))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}
