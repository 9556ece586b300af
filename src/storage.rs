//! Saved results.
//!
//! Finished jobs are written as pretty JSON under the platform data directory
//! (`~/.local/share/annot-jobs/results` on Linux) and can be listed back newest first.

use crate::analysis::AnalysisKind;
use crate::model::now_rfc3339;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A completed result together with what produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    /// Kind id, e.g. "blast" or "pfamscan".
    pub kind: String,
    pub payload: String,
    pub saved_at: String,
    pub result: Value,
}

impl StoredResult {
    pub fn new<K: AnalysisKind>(kind: &K, payload: &str, result: &K::Output) -> Result<Self> {
        Ok(Self {
            kind: kind.id().to_string(),
            payload: payload.to_string(),
            saved_at: now_rfc3339(),
            result: serde_json::to_value(result).context("serialize result")?,
        })
    }

    fn file_stem(&self) -> String {
        let stamp = self.saved_at.replace(':', "-").replace('T', "_");
        let payload: String = self
            .payload
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(32)
            .collect();
        format!("{}-{}-{}", self.kind, stamp, payload)
    }
}

pub fn results_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("could not determine the user data directory")?;
    Ok(base.join("annot-jobs").join("results"))
}

/// Save to the default location and return the written path.
pub fn save_result(stored: &StoredResult) -> Result<PathBuf> {
    save_result_in(&results_dir()?, stored)
}

pub fn save_result_in(dir: &Path, stored: &StoredResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let stem = stored.file_stem();
    let mut path = dir.join(format!("{stem}.json"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{stem}-{n}.json"));
        n += 1;
    }
    write_json(&path, stored)?;
    debug!(path = %path.display(), "result saved");
    Ok(path)
}

/// Write a result to an explicit path, replacing any existing file.
pub fn export_json(path: &Path, stored: &StoredResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    write_json(path, stored)
}

fn write_json(path: &Path, stored: &StoredResult) -> Result<()> {
    let body = serde_json::to_vec_pretty(stored).context("serialize saved result")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

/// Newest `limit` saved results from the default location.
pub fn load_recent(limit: usize) -> Result<Vec<StoredResult>> {
    load_recent_in(&results_dir()?, limit)
}

pub fn load_recent_in(dir: &Path, limit: usize) -> Result<Vec<StoredResult>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = std::fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<StoredResult>(&bytes)?));
        match parsed {
            Ok(stored) => out.push(stored),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable saved result"),
        }
    }
    // RFC 3339 UTC stamps sort lexically.
    out.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
    out.truncate(limit);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Blast, PfamHit, PfamScan};
    use serde_json::json;

    fn stored(kind: &str, payload: &str, saved_at: &str) -> StoredResult {
        StoredResult {
            kind: kind.into(),
            payload: payload.into(),
            saved_at: saved_at.into(),
            result: json!({"ok": true}),
        }
    }

    #[test]
    fn recent_results_are_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        save_result_in(dir.path(), &stored("blast", "g1", "2024-05-01T10:00:00Z")).unwrap();
        save_result_in(dir.path(), &stored("pfamscan", "p1", "2024-05-03T10:00:00Z")).unwrap();
        save_result_in(dir.path(), &stored("blast", "g2", "2024-05-02T10:00:00Z")).unwrap();

        let recent = load_recent_in(dir.path(), 2).unwrap();
        let payloads: Vec<_> = recent.iter().map(|r| r.payload.as_str()).collect();
        assert_eq!(payloads, ["p1", "g2"]);
    }

    #[test]
    fn same_second_saves_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let r = stored("blast", "geneA", "2024-05-01T10:00:00Z");
        let a = save_result_in(dir.path(), &r).unwrap();
        let b = save_result_in(dir.path(), &r).unwrap();
        assert_ne!(a, b);
        assert_eq!(load_recent_in(dir.path(), 10).unwrap().len(), 2);
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        save_result_in(dir.path(), &stored("blast", "g1", "2024-05-01T10:00:00Z")).unwrap();
        assert_eq!(load_recent_in(dir.path(), 10).unwrap().len(), 1);
    }

    #[test]
    fn missing_dir_means_no_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_recent_in(&dir.path().join("nope"), 5).unwrap().is_empty());
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("scan.json");
        let hits = vec![PfamHit {
            acc: "PF00069".into(),
            ..Default::default()
        }];
        let r = StoredResult::new(&PfamScan, "pep/1", &hits).unwrap();
        export_json(&path, &r).unwrap();

        let back: StoredResult = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.kind, "pfamscan");
        assert_eq!(back.result[0]["acc"], "PF00069");
    }

    #[test]
    fn file_names_are_filesystem_safe() {
        let r = StoredResult::new(&Blast, "chr1:100-200/x", &json!({})).unwrap();
        let stem = r.file_stem();
        assert!(stem.starts_with("blast-"));
        assert!(!stem.contains(':') && !stem.contains('/'));
    }
}
