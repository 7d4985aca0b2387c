//! On-disk best-score store.
//!
//! A flat JSON object of integer values, e.g. `{"BestScore": 20480}`. The store
//! never fails the game: unreadable files load as empty and write errors are
//! logged and otherwise ignored, leaving the in-memory value authoritative.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::ScoreStore;

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, u64>,
}

impl FileStore {
    /// Open the store at `path`, loading whatever is readable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match load(&path) {
            Ok(values) => values,
            Err(e) => {
                log::warn!("ignoring best-score file {}: {:#}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(&self.values)?;
        // Write-then-rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, u64>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let values = serde_json::from_slice(&bytes).context("parsing best-score JSON")?;
    Ok(values)
}

impl ScoreStore for FileStore {
    fn get_integer(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    fn set_integer(&mut self, key: &str, value: u64) {
        self.values.insert(key.to_string(), value);
        if let Err(e) = self.save() {
            log::warn!("failed to persist {}: {:#}", key, e);
        }
    }
}
