//! Per-invocation session records and the statistics computed over them.
//!
//! Each `push` or `quick` invocation leaves one JSON file in the log
//! directory. `patrick stats` reads them all back.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tag written into every record produced by the degraded-mode loop.
pub const MODE_TAG: &str = "patrick";

/// Number of most recent records that decide Patrick's mood.
const MOOD_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: DateTime<Utc>,
    pub problem: String,
    pub solved: bool,
    pub solution: Option<String>,
    pub attempts: usize,
    pub tokens: u64,
    pub mode: String,
}

impl SessionRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        problem: &str,
        solution: Option<&str>,
        solved: bool,
        attempts: usize,
        tokens: u64,
    ) -> Self {
        Self {
            timestamp,
            problem: problem.to_string(),
            solved,
            solution: solution.map(str::to_string),
            attempts,
            tokens,
            mode: MODE_TAG.to_string(),
        }
    }
}

/// Destination for finished session records.
///
/// The orchestrator treats recording as best-effort: an error returned here is
/// logged and otherwise ignored.
pub trait SessionRecorder: Send + Sync {
    fn record(&self, record: &SessionRecord) -> Result<()>;
}

/// Aggregate statistics over every stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total_problems: usize,
    pub solved: usize,
    pub total_attempts: usize,
    pub total_tokens: u64,
}

impl SessionStats {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut stats, record| {
            stats.total_problems += 1;
            stats.total_attempts += record.attempts;
            stats.total_tokens += record.tokens;
            if record.solved {
                stats.solved += 1;
            }
            stats
        })
    }

    /// Solved share rounded to whole percent; 0 when there are no records.
    pub fn success_rate_percent(&self) -> u32 {
        if self.total_problems == 0 {
            return 0;
        }
        ((self.solved as f64 / self.total_problems as f64) * 100.0).round() as u32
    }

    pub fn average_attempts(&self) -> f64 {
        if self.total_problems == 0 {
            return 0.0;
        }
        self.total_attempts as f64 / self.total_problems as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Happy,
    Neutral,
    Confused,
}

impl Mood {
    /// Mood from the solved share of the most recent records.
    ///
    /// `records` must be in chronological order.
    pub fn from_recent(records: &[SessionRecord]) -> Self {
        if records.is_empty() {
            return Mood::Neutral;
        }
        let recent = &records[records.len().saturating_sub(MOOD_WINDOW)..];
        let solved = recent.iter().filter(|r| r.solved).count();
        let rate = solved as f64 / recent.len() as f64;

        if rate >= 0.8 {
            Mood::Happy
        } else if rate >= 0.5 {
            Mood::Neutral
        } else {
            Mood::Confused
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Neutral => "neutral",
            Mood::Confused => "confused",
        }
    }
}

/// Directory of JSON session records.
pub struct SessionLog {
    dir: PathBuf,
}

impl SessionLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `record` to a new file and returns its path.
    ///
    /// File names come from the record timestamp in millisecond resolution.
    /// Existing files are never overwritten; a numeric suffix is added instead.
    pub fn save(&self, record: &SessionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stem = format!(
            "patrick-{}",
            record.timestamp.format("%Y-%m-%dT%H-%M-%S%.3f")
        );
        let content = serde_json::to_string_pretty(record)?;

        let mut suffix = 0u32;
        loop {
            let name = if suffix == 0 {
                format!("{}.json", stem)
            } else {
                format!("{}-{}.json", stem, suffix)
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())?;
                    info!("Session log saved to: {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, trying next suffix", path.display());
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Loads every record in chronological (file name) order.
    ///
    /// A missing directory yields no records. Files that cannot be parsed are
    /// skipped with a warning.
    pub fn load_records(&self) -> Result<Vec<SessionRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| Ok(serde_json::from_str::<SessionRecord>(&content)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable session log {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    pub fn stats(&self) -> Result<SessionStats> {
        Ok(SessionStats::from_records(&self.load_records()?))
    }
}

impl SessionRecorder for SessionLog {
    fn record(&self, record: &SessionRecord) -> Result<()> {
        self.save(record).map(|_| ())
    }
}
