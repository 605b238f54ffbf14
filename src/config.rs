//! Process configuration from environment variables. Invalid values are
//! startup errors; nothing here is reloadable at runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;

use crate::cursor::PlaybackMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Memory,
    Stream,
}

impl StoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreMode::Memory => "memory",
            StoreMode::Stream => "stream",
        }
    }
}

/// Cursor namespace for the request API. Push cursors are always scoped per
/// (hub, ticker, category) and are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorScope {
    /// Every category of a ticker+family shares one cursor per key.
    Shared,
    /// Each (ticker, family, category) advances independently.
    Independent,
}

impl CursorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CursorScope::Shared => "shared",
            CursorScope::Independent => "independent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_root: PathBuf,
    pub data_date: String,
    pub store_mode: StoreMode,
    pub playback_mode: PlaybackMode,
    pub cursor_scope: CursorScope,
    pub push_enabled: bool,
    pub push_tick: Duration,
    pub group_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("invalid PORT")?;

        let data_root = PathBuf::from(
            std::env::var("DATA_ROOT").unwrap_or_else(|_| "./data".to_string()),
        );

        let date_var = std::env::var("DATA_DATE").unwrap_or_default();
        let data_date = if date_var.is_empty() || date_var == "latest" {
            detect_latest_date(&data_root)
                .with_context(|| format!("detecting latest date in {}", data_root.display()))?
        } else {
            date_var
        };

        let store_mode = match std::env::var("STORE_MODE")
            .unwrap_or_else(|_| "memory".to_string())
            .as_str()
        {
            "memory" => StoreMode::Memory,
            "stream" => StoreMode::Stream,
            other => bail!("invalid STORE_MODE: {other} (must be 'memory' or 'stream')"),
        };

        let playback_mode = match std::env::var("PLAYBACK_MODE")
            .unwrap_or_else(|_| "exhaust".to_string())
            .as_str()
        {
            "exhaust" => PlaybackMode::Exhaust,
            "rotation" => PlaybackMode::Rotation,
            other => bail!("invalid PLAYBACK_MODE: {other} (must be 'exhaust' or 'rotation')"),
        };

        let cursor_scope = match std::env::var("CURSOR_SCOPE")
            .unwrap_or_else(|_| "shared".to_string())
            .as_str()
        {
            "shared" => CursorScope::Shared,
            "independent" => CursorScope::Independent,
            other => bail!("invalid CURSOR_SCOPE: {other} (must be 'shared' or 'independent')"),
        };

        let push_enabled = std::env::var("PUSH_ENABLED")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(true);

        let push_tick = Duration::from_millis(
            std::env::var("PUSH_TICK_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse::<u64>()
                .unwrap_or(1000),
        );

        let group_prefix =
            std::env::var("GROUP_PREFIX").unwrap_or_else(|_| "blue".to_string());

        Ok(Self {
            port,
            data_root,
            data_date,
            store_mode,
            playback_mode,
            cursor_scope,
            push_enabled,
            push_tick,
            group_prefix,
        })
    }
}

/// True for directory names shaped like `YYYY-MM-DD` that parse as real
/// dates.
pub fn is_date_dir_name(name: &str) -> bool {
    name.len() == 10 && NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok()
}

/// Scans the data root for date folders and returns the most recent
/// non-empty one.
pub fn detect_latest_date(data_root: &Path) -> Result<String> {
    let mut dates = Vec::new();
    let entries = std::fs::read_dir(data_root)
        .with_context(|| format!("reading data directory {}", data_root.display()))?;

    for entry in entries {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_date_dir_name(&name) {
            continue;
        }
        // A date folder counts only when something was downloaded into it.
        let non_empty = std::fs::read_dir(entry.path())
            .map(|mut sub| sub.next().is_some())
            .unwrap_or(false);
        if non_empty {
            dates.push(name);
        }
    }

    if dates.is_empty() {
        bail!("no date folders found in {}", data_root.display());
    }

    dates.sort();
    Ok(dates.pop().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn date_dir_names() {
        assert!(is_date_dir_name("2025-11-03"));
        assert!(!is_date_dir_name("2025-13-03"));
        assert!(!is_date_dir_name("2025-11-3"));
        assert!(!is_date_dir_name(".staging"));
        assert!(!is_date_dir_name("notes"));
    }

    #[test]
    fn latest_date_skips_empty_and_non_date_folders() {
        let tmp = TempDir::new().unwrap();
        for (name, fill) in [
            ("2025-10-31", true),
            ("2025-11-03", true),
            ("2025-11-04", false),
            (".staging", true),
        ] {
            let dir = tmp.path().join(name);
            std::fs::create_dir_all(&dir).unwrap();
            if fill {
                std::fs::create_dir_all(dir.join("SPX")).unwrap();
            }
        }

        assert_eq!(detect_latest_date(tmp.path()).unwrap(), "2025-11-03");
    }

    #[test]
    fn latest_date_with_no_folders_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(detect_latest_date(tmp.path()).is_err());
    }
}
