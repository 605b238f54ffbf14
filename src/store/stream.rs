//! On-disk record store: keeps an open handle and a byte-offset index per
//! file, reading single lines on demand. Each file carries its own mutex,
//! so seek+read pairs serialize per file and reads on distinct files never
//! contend. Callers receive owned buffers.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use tracing::{info, warn};

use super::{walk_record_files, RecordKey, RecordStore, StoreError};

struct IndexedFile {
    // Seek+read pairs serialize on the handle; offsets are immutable.
    file: Mutex<File>,
    offsets: Vec<u64>,
}

pub struct StreamStore {
    // Immutable after open; only each file handle is locked.
    files: HashMap<RecordKey, IndexedFile>,
}

impl StreamStore {
    /// Indexes every record file under `{data_root}/{date}` without reading
    /// record bodies into memory. Unreadable files are skipped with a
    /// warning; an entirely empty tree is fatal.
    pub fn open(data_root: &Path, date: &str) -> Result<Self> {
        let date_dir = data_root.join(date);
        let found = walk_record_files(&date_dir)
            .with_context(|| format!("walking data directory {}", date_dir.display()))?;

        let mut files = HashMap::new();
        for (key, path) in found {
            match index_file(&path) {
                Ok(indexed) => {
                    info!(key = %key, count = indexed.offsets.len(), "indexed data");
                    files.insert(key, indexed);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to index file");
                }
            }
        }

        if files.is_empty() {
            bail!("no JSONL files found in {}", date_dir.display());
        }

        Ok(Self { files })
    }
}

/// Records the byte offset of every non-empty line and keeps the file open
/// for later reads.
fn index_file(path: &Path) -> Result<IndexedFile> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut offsets = Vec::new();
    let mut offset = 0u64;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        let trimmed = buf
            .strip_suffix(b"\n")
            .map(|rest| rest.strip_suffix(b"\r").unwrap_or(rest))
            .unwrap_or(&buf);
        if !trimmed.is_empty() {
            offsets.push(offset);
        }
        offset += read as u64;
    }

    let file = reader.into_inner();
    Ok(IndexedFile {
        file: Mutex::new(file),
        offsets,
    })
}

impl RecordStore for StreamStore {
    fn exists(&self, ticker: &str, family: &str, category: &str) -> bool {
        self.files
            .contains_key(&RecordKey::new(ticker, family, category))
    }

    fn len_of(&self, ticker: &str, family: &str, category: &str) -> Result<usize, StoreError> {
        self.files
            .get(&RecordKey::new(ticker, family, category))
            .map(|f| f.offsets.len())
            .ok_or(StoreError::NotFound)
    }

    fn raw_at(
        &self,
        ticker: &str,
        family: &str,
        category: &str,
        index: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let indexed = self
            .files
            .get(&RecordKey::new(ticker, family, category))
            .ok_or(StoreError::NotFound)?;
        let offset = *indexed.offsets.get(index).ok_or(StoreError::OutOfRange)?;

        // Held for the seek+read only; other files stay readable.
        let mut file = indexed.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&*file);
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line)?;
        while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(line)
    }

    fn keys(&self) -> Vec<RecordKey> {
        self.files.keys().cloned().collect()
    }

    fn mode(&self) -> &'static str {
        "stream"
    }
}
