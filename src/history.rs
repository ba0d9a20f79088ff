//! Persisted analysis history: one JSON snapshot per completed
//! analysis, append-only, named by processing timestamp.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::AnalysisResult;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error in analysis history: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize analysis: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only store of completed analyses under one directory.
/// Filenames are `analysis_<YYYYMMDD_HHMMSS>.json`; two analyses
/// finishing within the same second get a `_<n>` suffix instead of
/// silently overwriting each other.
#[derive(Debug, Clone)]
pub struct AnalysisHistory {
    dir: PathBuf,
}

impl AnalysisHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist one analysis snapshot. Returns the filename written.
    pub fn save(&self, result: &AnalysisResult) -> Result<String, HistoryError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(result)?;

        let base = format!("analysis_{}", result.timestamp);
        let mut suffix = 0usize;
        loop {
            let filename = if suffix == 0 {
                format!("{base}.json")
            } else {
                format!("{base}_{}.json", suffix + 1)
            };
            // create_new makes the existence check and the create one
            // atomic step, so concurrent saves cannot clobber a file.
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&filename))
            {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    return Ok(filename);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Most recent analysis by file modification time, or `None` when
    /// the history is empty.
    pub fn latest(&self) -> Result<Option<AnalysisResult>, HistoryError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("analysis_") || !name.ends_with(".json") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
                newest = Some((modified, entry.path()));
            }
        }

        match newest {
            None => Ok(None),
            Some((_, path)) => {
                let file = File::open(path)?;
                Ok(Some(serde_json::from_reader(file)?))
            }
        }
    }
}
