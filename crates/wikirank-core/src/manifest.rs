//! Run manifest: config, row counts and blake3 content hashes of every output

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::EtlParams;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Hash a file's contents with blake3.
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(path)?;
    Ok(hasher.finalize())
}

/// Combine per-file hashes, in the given order, into one.
pub fn combine_hashes(hashes: &[blake3::Hash]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize()
}

/// Row counters recorded alongside the hashes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestCounts {
    pub rows_read: u64,
    pub rows_without_language: u64,
    pub languages: usize,
    pub chunks: usize,
    pub topk_entries: usize,
}

/// Written next to the outputs as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Input file as given on the command line
    pub input: PathBuf,
    /// Content-affecting parameters
    pub params: EtlParams,
    pub counts: ManifestCounts,
    /// Output file name → blake3 hex
    pub file_hashes: BTreeMap<String, String>,
    /// Hash over `file_hashes` in file-name order
    pub content_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RunManifest {
    /// Hash the named files in `dir` and build a manifest.
    pub fn build(
        dir: &Path,
        files: &[String],
        input: &Path,
        params: &EtlParams,
        counts: ManifestCounts,
    ) -> Result<Self> {
        let mut file_hashes = BTreeMap::new();
        for name in files {
            let path = dir.join(name);
            let h = hash_file(&path).with_context(|| format!("failed to hash {}", path.display()))?;
            file_hashes.insert(name.clone(), h.to_hex().to_string());
        }
        Ok(Self {
            input: input.to_path_buf(),
            params: params.clone(),
            counts,
            content_hash: content_hash(&file_hashes)?,
            file_hashes,
            created_at: chrono::Utc::now(),
        })
    }

    /// Write manifest to dir/manifest.json
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Read manifest from dir/manifest.json
    pub fn read_from(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Re-hash every listed file and report differences.
    pub fn verify(&self, dir: &Path) -> VerifyReport {
        let mut report = VerifyReport::default();
        for (name, expected) in &self.file_hashes {
            let path = dir.join(name);
            if !path.exists() {
                report.missing.push(name.clone());
                continue;
            }
            match hash_file(&path) {
                Ok(h) if h.to_hex().as_str() == expected.as_str() => report.ok.push(name.clone()),
                Ok(_) => report.mismatched.push(name.clone()),
                Err(e) => {
                    log::warn!("{}: {e}", path.display());
                    report.mismatched.push(name.clone());
                }
            }
        }
        report
    }
}

fn content_hash(file_hashes: &BTreeMap<String, String>) -> Result<String> {
    let hashes = file_hashes
        .values()
        .map(|hex| blake3::Hash::from_hex(hex).context("invalid blake3 hex"))
        .collect::<Result<Vec<_>>>()?;
    Ok(combine_hashes(&hashes).to_hex().to_string())
}

/// Outcome of [`RunManifest::verify`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub ok: Vec<String>,
    pub mismatched: Vec<String>,
    pub missing: Vec<String>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Vec<String>) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), b"lang\nen\n").unwrap();
        std::fs::write(dir.path().join("b.tsv"), b"lang\trank\n").unwrap();
        (dir, vec!["a.csv".to_string(), "b.tsv".to_string()])
    }

    fn manifest(dir: &Path, files: &[String]) -> RunManifest {
        RunManifest::build(
            dir,
            files,
            Path::new("in.csv"),
            &EtlParams::default(),
            ManifestCounts::default(),
        )
        .unwrap()
    }

    #[test]
    fn hash_file_matches_bytes() {
        let (dir, _) = setup();
        let h = hash_file(&dir.path().join("a.csv")).unwrap();
        assert_eq!(h, blake3::hash(b"lang\nen\n"));
    }

    #[test]
    fn combine_hashes_order_matters() {
        let h1 = blake3::hash(b"a");
        let h2 = blake3::hash(b"b");
        assert_ne!(combine_hashes(&[h1, h2]), combine_hashes(&[h2, h1]));
    }

    #[test]
    fn round_trip_and_verify_clean() {
        let (dir, files) = setup();
        let m = manifest(dir.path(), &files);
        m.write_to(dir.path()).unwrap();

        let loaded = RunManifest::read_from(dir.path()).unwrap();
        assert_eq!(loaded.file_hashes, m.file_hashes);
        assert_eq!(loaded.content_hash, m.content_hash);
        assert_eq!(loaded.params, EtlParams::default());

        let report = loaded.verify(dir.path());
        assert!(report.is_clean());
        assert_eq!(report.ok.len(), 2);
    }

    #[test]
    fn verify_detects_changes() {
        let (dir, files) = setup();
        let m = manifest(dir.path(), &files);
        std::fs::write(dir.path().join("a.csv"), b"tampered").unwrap();
        std::fs::remove_file(dir.path().join("b.tsv")).unwrap();

        let report = m.verify(dir.path());
        assert_eq!(report.mismatched, vec!["a.csv"]);
        assert_eq!(report.missing, vec!["b.tsv"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn same_outputs_same_content_hash() {
        let (dir, files) = setup();
        let m1 = manifest(dir.path(), &files);
        let m2 = manifest(dir.path(), &files);
        assert_eq!(m1.content_hash, m2.content_hash);
    }

    #[test]
    fn build_fails_on_missing_file() {
        let (dir, _) = setup();
        let result = RunManifest::build(
            dir.path(),
            &["nope.csv".to_string()],
            Path::new("in.csv"),
            &EtlParams::default(),
            ManifestCounts::default(),
        );
        assert!(result.is_err());
    }
}
