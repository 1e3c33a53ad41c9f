//! # Telemetry Logger
//!
//! Appends timestamped telemetry snapshots to JSONL files, starting a new
//! file every `max_records_per_file` records and deleting the oldest files
//! beyond `max_files_to_keep`.
//!
//! Files are named `telemetry_<utc timestamp>_<sequence>.jsonl`. Files left
//! in the directory by earlier runs count towards the retention limit, and
//! the sequence continues from the highest one found, so names sort in
//! creation order.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use super::store::CrsfData;
use crate::config::TelemetryConfig;
use crate::error::{CrsfLinkError, Result};

const FILE_PREFIX: &str = "telemetry_";
const FILE_EXTENSION: &str = ".jsonl";

/// One line of the log file
#[derive(Serialize)]
struct TelemetryRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    data: &'a CrsfData,
}

/// Rotating JSONL writer for telemetry snapshots
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    files: VecDeque<PathBuf>,
    sequence: u64,
}

impl TelemetryLogger {
    /// Create the log directory and a logger writing into it
    ///
    /// No file is created until the first record is logged. Log files
    /// already in the directory are adopted, oldest first.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;

        let mut existing = Vec::new();
        let mut sequence = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(seq) = path.file_name().and_then(|name| name.to_str()).and_then(log_sequence)
            else {
                continue;
            };
            sequence = sequence.max(seq);
            existing.push(path);
        }
        existing.sort();

        if !existing.is_empty() {
            debug!(count = existing.len(), sequence, "found existing telemetry logs");
        }

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file,
            max_files_to_keep: config.max_files_to_keep,
            writer: None,
            records_in_file: 0,
            files: existing.into(),
            sequence,
        })
    }

    /// Append one snapshot
    pub fn log(&mut self, data: &CrsfData) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(CrsfLinkError::Io(io::Error::new(
                io::ErrorKind::Other,
                "telemetry log file is not open",
            )));
        };

        let record = TelemetryRecord {
            timestamp: Utc::now().to_rfc3339(),
            data,
        };
        serde_json::to_writer(&mut *writer, &record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        self.records_in_file += 1;
        Ok(())
    }

    /// Files written by this logger that still exist, oldest first
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let (path, file) = loop {
            self.sequence += 1;
            let name = format!(
                "{}{}_{:04}{}",
                FILE_PREFIX,
                Utc::now().format("%Y%m%d_%H%M%S"),
                self.sequence,
                FILE_EXTENSION
            );
            let path = self.dir.join(name);

            // Never truncate a file another logger created in the same second
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        };
        debug!(path = %path.display(), "opened telemetry log");
        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;
        self.files.push_back(path);

        while self.files.len() > self.max_files_to_keep {
            let Some(oldest) = self.files.pop_front() else {
                break;
            };
            if let Err(e) = fs::remove_file(&oldest) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %oldest.display(), error = %e, "failed to remove old telemetry log");
                }
            }
        }

        Ok(())
    }
}

/// Sequence number of a file name this logger writes, if it is one
fn log_sequence(name: &str) -> Option<u64> {
    let stem = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_EXTENSION)?;
    let (_, sequence) = stem.rsplit_once('_')?;
    sequence.parse().ok()
}
