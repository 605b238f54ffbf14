//! Full-memory record store: every non-empty line is read into an owned
//! buffer at construction, reads are indexed slice lookups.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::{walk_record_files, RecordKey, RecordStore, StoreError};

/// Line reader capacity; record lines can run over a megabyte for dense
/// chains.
const LINE_BUFFER_CAPACITY: usize = 1024 * 1024;

pub struct MemoryStore {
    data: HashMap<RecordKey, Vec<Box<[u8]>>>,
}

impl MemoryStore {
    /// Loads every record file under `{data_root}/{date}`. Files that fail
    /// to read are skipped with a warning; an entirely empty tree is fatal.
    pub fn open(data_root: &Path, date: &str) -> Result<Self> {
        let date_dir = data_root.join(date);
        let files = walk_record_files(&date_dir)
            .with_context(|| format!("walking data directory {}", date_dir.display()))?;

        let mut data = HashMap::new();
        for (key, path) in files {
            match load_lines(&path) {
                Ok(lines) => {
                    info!(key = %key, count = lines.len(), "loaded data");
                    data.insert(key, lines);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load file");
                }
            }
        }

        if data.is_empty() {
            bail!("no JSONL files found in {}", date_dir.display());
        }

        Ok(Self { data })
    }
}

fn load_lines(path: &Path) -> Result<Vec<Box<[u8]>>> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::with_capacity(LINE_BUFFER_CAPACITY, file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    let mut line_num = 0usize;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line_num += 1;
        while buf.last() == Some(&b'\n') || buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.is_empty() {
            continue;
        }
        // Reject files whose lines are not records up front so a corrupt
        // file is skipped as a whole rather than served partially.
        serde_json::from_slice::<serde::de::IgnoredAny>(&buf)
            .with_context(|| format!("line {line_num}"))?;
        lines.push(buf.clone().into_boxed_slice());
    }

    Ok(lines)
}

impl RecordStore for MemoryStore {
    fn exists(&self, ticker: &str, family: &str, category: &str) -> bool {
        self.data
            .contains_key(&RecordKey::new(ticker, family, category))
    }

    fn len_of(&self, ticker: &str, family: &str, category: &str) -> Result<usize, StoreError> {
        self.data
            .get(&RecordKey::new(ticker, family, category))
            .map(|lines| lines.len())
            .ok_or(StoreError::NotFound)
    }

    fn raw_at(
        &self,
        ticker: &str,
        family: &str,
        category: &str,
        index: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let lines = self
            .data
            .get(&RecordKey::new(ticker, family, category))
            .ok_or(StoreError::NotFound)?;
        lines
            .get(index)
            .map(|line| line.to_vec())
            .ok_or(StoreError::OutOfRange)
    }

    fn keys(&self) -> Vec<RecordKey> {
        self.data.keys().cloned().collect()
    }

    fn mode(&self) -> &'static str {
        "memory"
    }
}
