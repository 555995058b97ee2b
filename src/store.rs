// src/store.rs
//! Persisted record set: a single JSON document, merged by id.
//!
//! The store is the only owner of the persisted collection; the pipeline
//! hands transient records to `merge` and the presentation layer reads via
//! `load_all`. Read-modify-write with no locking — batch runs are assumed
//! serialized, and merge idempotence (same id twice is a no-op) is the
//! safety net against overlapping runs.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::record::NewsRecord;

pub struct NewsStore {
    path: PathBuf,
    max_records: usize,
}

impl NewsStore {
    pub fn new<P: Into<PathBuf>>(path: P, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records,
        }
    }

    /// Full persisted set, newest first. A missing file is an empty store,
    /// not an error.
    pub fn load_all(&self) -> Result<Vec<NewsRecord>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading news store {}", self.path.display()))
            }
        };
        serde_json::from_str(&data)
            .with_context(|| format!("parsing news store {}", self.path.display()))
    }

    /// Additive merge by id: records whose id is already persisted are
    /// dropped, never overwritten. The surviving set is re-sorted by
    /// capture time (newest first) and truncated to the retention cap.
    /// Returns how many records were actually added.
    pub fn merge(&self, incoming: &[NewsRecord]) -> Result<usize> {
        let mut records = self.load_all()?;
        let mut ids: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();

        let mut added = 0usize;
        for record in incoming {
            if ids.insert(record.id.clone()) {
                records.push(record.clone());
                added += 1;
            }
        }

        records.sort_by(|a, b| b.capture_time.cmp(&a.capture_time));
        records.truncate(self.max_records);

        self.write(&records)?;
        Ok(added)
    }

    fn write(&self, records: &[NewsRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(records).context("serializing news store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
