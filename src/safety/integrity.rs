/// Checksum validation of the test-data corpus
///
/// Reads a `sha256sum`-style listing (`<hex>  <path>` or `<hex> *<path>`)
/// and checks every entry against the data root. Callers treat a failed
/// check as a warning; nothing here aborts a run.
use crate::config::types::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Entries whose digest matched
    pub verified: usize,
    /// Entries whose digest did not match
    pub mismatched: Vec<PathBuf>,
    /// Entries that could not be read
    pub missing: Vec<PathBuf>,
    /// Listing lines that could not be parsed, 1-based
    pub malformed_lines: Vec<usize>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.missing.is_empty() && self.malformed_lines.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ChecksumEntry {
    digest: String,
    path: PathBuf,
}

fn parse_line(line: &str) -> Option<ChecksumEntry> {
    let (digest, rest) = line.split_once(char::is_whitespace)?;
    // Text mode has a second space, binary mode a '*'.
    let path = rest
        .strip_prefix(' ')
        .or_else(|| rest.strip_prefix('*'))
        .unwrap_or(rest);

    let valid_digest = digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit());
    if !valid_digest || path.is_empty() {
        return None;
    }

    Some(ChecksumEntry {
        digest: digest.to_ascii_lowercase(),
        path: PathBuf::from(path),
    })
}

/// SHA-256 of a file, lowercase hex
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify every entry of `checksum_file`, resolving paths against `data_root`.
/// Only an unreadable checksum file is an error.
pub fn verify_checksums(checksum_file: &Path, data_root: &Path) -> Result<IntegrityReport> {
    let listing = std::fs::read_to_string(checksum_file).map_err(|e| {
        HarnessError::Integrity(format!(
            "Failed to read checksum file {}: {}",
            checksum_file.display(),
            e
        ))
    })?;

    let mut report = IntegrityReport::default();
    for (index, line) in listing.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some(entry) = parse_line(line) else {
            log::warn!("{}:{}: malformed checksum line", checksum_file.display(), index + 1);
            report.malformed_lines.push(index + 1);
            continue;
        };

        let target = data_root.join(&entry.path);
        match sha256_file(&target) {
            Ok(actual) if actual == entry.digest => report.verified += 1,
            Ok(actual) => {
                log::warn!(
                    "checksum mismatch for {}: expected {}, got {}",
                    target.display(),
                    entry.digest,
                    actual
                );
                report.mismatched.push(entry.path);
            }
            Err(e) => {
                log::warn!("cannot read {}: {}", target.display(), e);
                report.missing.push(entry.path);
            }
        }
    }

    Ok(report)
}
