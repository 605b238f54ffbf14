//! Indexed random access over the per-date JSONL record tree.
//!
//! Two interchangeable back-ends: [`MemoryStore`] holds every line in RAM,
//! [`StreamStore`] keeps open file handles plus a byte-offset index and
//! reads on demand. Both address records by `(ticker, family, category)`.

mod memory;
mod stream;

pub use memory::MemoryStore;
pub use stream::StreamStore;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data not found")]
    NotFound,
    #[error("index out of bounds")]
    OutOfRange,
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Path triple addressing one record file within the loaded date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub ticker: String,
    pub family: String,
    pub category: String,
}

impl RecordKey {
    pub fn new(ticker: &str, family: &str, category: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            family: family.to_string(),
            category: category.to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.ticker, self.family, self.category)
    }
}

/// Random access over loaded record files. Implementations are read-mostly
/// after construction and safe to share behind an `Arc`.
pub trait RecordStore: Send + Sync {
    fn exists(&self, ticker: &str, family: &str, category: &str) -> bool;

    /// Number of records for the key, or `NotFound`.
    fn len_of(&self, ticker: &str, family: &str, category: &str) -> Result<usize, StoreError>;

    /// Raw bytes of the record line at `index`, newline excluded. The store
    /// does not interpret the payload.
    fn raw_at(
        &self,
        ticker: &str,
        family: &str,
        category: &str,
        index: usize,
    ) -> Result<Vec<u8>, StoreError>;

    /// Every loaded key, unordered.
    fn keys(&self) -> Vec<RecordKey>;

    fn mode(&self) -> &'static str;
}

/// Parses `{ticker}/{family}/{category}.jsonl` out of a path relative to the
/// date directory. Returns `None` for anything that does not match.
pub(crate) fn parse_record_path(date_dir: &Path, path: &Path) -> Option<RecordKey> {
    if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
        return None;
    }
    let rel = path.strip_prefix(date_dir).ok()?;
    let mut parts = rel.components();
    let ticker = parts.next()?.as_os_str().to_str()?;
    let family = parts.next()?.as_os_str().to_str()?;
    let file = parts.next()?.as_os_str().to_str()?;
    if parts.next().is_some() {
        return None;
    }
    let category = file.strip_suffix(".jsonl")?;
    Some(RecordKey::new(ticker, family, category))
}

/// Collects every `.jsonl` file under the date directory, two levels deep.
pub(crate) fn walk_record_files(date_dir: &Path) -> std::io::Result<Vec<(RecordKey, PathBuf)>> {
    let mut found = Vec::new();
    for ticker_entry in std::fs::read_dir(date_dir)? {
        let ticker_path = ticker_entry?.path();
        if !ticker_path.is_dir() {
            continue;
        }
        for family_entry in std::fs::read_dir(&ticker_path)? {
            let family_path = family_entry?.path();
            if !family_path.is_dir() {
                continue;
            }
            for file_entry in std::fs::read_dir(&family_path)? {
                let file_path = file_entry?.path();
                if let Some(key) = parse_record_path(date_dir, &file_path) {
                    found.push((key, file_path));
                }
            }
        }
    }
    Ok(found)
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::io::Write;
    use std::path::Path;

    /// Writes a record file under `root/{date}/{ticker}/{family}/{category}.jsonl`.
    pub fn write_records(
        root: &Path,
        date: &str,
        ticker: &str,
        family: &str,
        category: &str,
        lines: &[&str],
    ) {
        let dir = root.join(date).join(ticker).join(family);
        std::fs::create_dir_all(&dir).unwrap();
        let mut f = std::fs::File::create(dir.join(format!("{category}.jsonl"))).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_paths() {
        let date_dir = Path::new("/data/2025-11-03");
        let key = parse_record_path(
            date_dir,
            Path::new("/data/2025-11-03/SPX/state/gex_full.jsonl"),
        )
        .unwrap();
        assert_eq!(key, RecordKey::new("SPX", "state", "gex_full"));

        assert!(parse_record_path(date_dir, Path::new("/data/2025-11-03/SPX/state/notes.txt")).is_none());
        assert!(parse_record_path(date_dir, Path::new("/data/2025-11-03/loose.jsonl")).is_none());
    }
}
