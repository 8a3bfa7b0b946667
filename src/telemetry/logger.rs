//! # Session Transcript
//!
//! Appends robot traffic to JSONL files, one record per line:
//!
//! ```json
//! {"timestamp":"2026-03-01T12:00:00.123456Z","direction":"rx","line":"~boot ok"}
//! ```
//!
//! Without `show_all` only verbose inbound lines (`~...`) are recorded.
//! A new file is started every `max_records_per_file` records and only the
//! newest `max_files_to_keep` files are kept.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::protocol::decoder::is_verbose;

const FILE_PREFIX: &str = "session_";
const FILE_EXTENSION: &str = "jsonl";

/// Which way a line travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDirection {
    Rx,
    Tx,
}

#[derive(Serialize)]
struct TranscriptRecord<'a> {
    timestamp: String,
    direction: LineDirection,
    line: &'a str,
}

/// Rotating JSONL transcript writer.
#[derive(Debug)]
pub struct TranscriptLogger {
    dir: PathBuf,
    show_all: bool,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl TranscriptLogger {
    /// Create the log directory if needed. No file is opened until the
    /// first record.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Recording session transcript in {}", dir.display());

        Ok(Self {
            dir,
            show_all: config.show_all,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Whether a line would be written under the current filter.
    #[must_use]
    pub fn accepts(&self, direction: LineDirection, line: &str) -> bool {
        self.show_all || (direction == LineDirection::Rx && is_verbose(line))
    }

    /// Record one line. Returns `false` if the filter dropped it.
    pub fn record(&mut self, direction: LineDirection, line: &str) -> Result<bool> {
        if !self.accepts(direction, line) {
            return Ok(false);
        }

        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = TranscriptRecord {
            timestamp: Utc::now().to_rfc3339(),
            direction,
            line,
        };
        let encoded = serde_json::to_string(&record).map_err(std::io::Error::from)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", encoded)?;
            writer.flush()?;
        }
        self.records_in_file += 1;
        Ok(true)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_seq += 1;
        let name = format!(
            "{}{}_{:04}.{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_seq,
            FILE_EXTENSION
        );
        let path = self.dir.join(name);
        debug!("Opening transcript file {}", path.display());

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;

        self.prune()
    }

    fn prune(&self) -> Result<()> {
        let mut files = transcript_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for old in files.drain(..excess) {
            debug!("Removing old transcript {}", old.display());
            fs::remove_file(&old)?;
        }
        Ok(())
    }
}

/// Transcript files in `dir`, oldest first.
pub fn transcript_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let is_transcript = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with(FILE_PREFIX));
            is_transcript && path.extension().map_or(false, |ext| ext == FILE_EXTENSION)
        })
        .collect();
    // names embed a UTC timestamp and a sequence number
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir, show_all: bool, per_file: usize, keep: usize) -> TelemetryConfig {
        TelemetryConfig {
            enabled: true,
            log_dir: dir.path().to_string_lossy().to_string(),
            show_all,
            max_records_per_file: per_file,
            max_files_to_keep: keep,
        }
    }

    fn read_records(dir: &Path) -> Vec<serde_json::Value> {
        transcript_files(dir)
            .unwrap()
            .iter()
            .flat_map(|path| {
                fs::read_to_string(path)
                    .unwrap()
                    .lines()
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    #[test]
    fn test_filter_keeps_only_verbose_inbound() {
        let dir = TempDir::new().unwrap();
        let mut logger = TranscriptLogger::new(&config(&dir, false, 100, 5)).unwrap();

        assert!(logger.record(LineDirection::Rx, "~battery 7.4V").unwrap());
        assert!(!logger.record(LineDirection::Rx, "RF120").unwrap());
        assert!(!logger.record(LineDirection::Tx, "X255255").unwrap());

        let records = read_records(dir.path());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["direction"], "rx");
        assert_eq!(records[0]["line"], "~battery 7.4V");
    }

    #[test]
    fn test_show_all_records_both_directions() {
        let dir = TempDir::new().unwrap();
        let mut logger = TranscriptLogger::new(&config(&dir, true, 100, 5)).unwrap();

        logger.record(LineDirection::Tx, "MI").unwrap();
        logger.record(LineDirection::Rx, "MI").unwrap();

        let records = read_records(dir.path());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["direction"], "tx");
        assert_eq!(records[1]["direction"], "rx");
        let timestamp = records[0]["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_no_file_until_first_record() {
        let dir = TempDir::new().unwrap();
        let mut logger = TranscriptLogger::new(&config(&dir, false, 100, 5)).unwrap();
        logger.record(LineDirection::Tx, "X255255").unwrap();
        assert!(transcript_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_rotation_and_retention() {
        let dir = TempDir::new().unwrap();
        let mut logger = TranscriptLogger::new(&config(&dir, true, 2, 2)).unwrap();

        for i in 0..7 {
            logger.record(LineDirection::Rx, &format!("~line {}", i)).unwrap();
        }

        // 7 records at 2 per file make 4 files, of which the newest 2 remain
        let files = transcript_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let lines: Vec<_> = read_records(dir.path())
            .iter()
            .map(|r| r["line"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(lines, vec!["~line 4", "~line 5", "~line 6"]);
    }

    #[test]
    fn test_unrelated_files_are_left_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let mut logger = TranscriptLogger::new(&config(&dir, true, 1, 1)).unwrap();
        logger.record(LineDirection::Rx, "a").unwrap();
        logger.record(LineDirection::Rx, "b").unwrap();

        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(transcript_files(dir.path()).unwrap().len(), 1);
    }
}
