// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only script output log.
//!
//! One JSON array per line: `["stdout","text","2026-01-01T00:00:00Z"]`.
//! The sequence number of an entry is its 1-based line number, so a poller
//! holding cursor `n` asks for everything after line `n`. Only lines ending
//! in a newline are counted; a line still being written is invisible until
//! it is complete.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tend_core::{ProcessOutput, ProcessOutputSource};
use thiserror::Error;

use crate::masker::SensitiveValueMasker;

pub const LOG_FILE: &str = "output.log";

#[derive(Debug, Error)]
pub enum ScriptLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shared handle to one execution's log. Readers and writers of the same
/// handle serialise on an internal lock.
#[derive(Debug, Clone)]
pub struct ScriptLog {
    path: PathBuf,
    sync: Arc<Mutex<()>>,
    masker: Arc<SensitiveValueMasker>,
}

impl ScriptLog {
    /// Log file inside `dir`.
    pub fn new(dir: &Path) -> Self {
        Self::with_masker(dir, SensitiveValueMasker::default())
    }

    pub fn with_masker(dir: &Path, masker: SensitiveValueMasker) -> Self {
        Self { path: dir.join(LOG_FILE), sync: Arc::default(), masker: Arc::new(masker) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open for appending, terminating any line left unfinished by a crash.
    pub fn writer(&self) -> Result<ScriptLogWriter, ScriptLogError> {
        let _guard = self.sync.lock();
        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&self.path)?;
        if file.metadata()?.len() > 0 {
            file.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }
        Ok(ScriptLogWriter { file, sync: Arc::clone(&self.sync), masker: Arc::clone(&self.masker) })
    }

    /// Entries with sequence number greater than `after`, and the cursor to
    /// pass next time. The cursor never moves backward.
    ///
    /// `now` stamps the corrupt-log entry when no earlier entry was read.
    pub fn get_output(&self, after: i64, now: DateTime<Utc>) -> Result<(Vec<ProcessOutput>, i64), ScriptLogError> {
        let _guard = self.sync.lock();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), after)),
            Err(e) => return Err(e.into()),
        };

        let mut results = Vec::new();
        let mut sequence = 0i64;
        let mut last_occurred: Option<DateTime<Utc>> = None;
        let complete = match bytes.iter().rposition(|b| *b == b'\n') {
            Some(end) => &bytes[..=end],
            None => &[][..],
        };
        for line in complete.split(|b| *b == b'\n') {
            if line.is_empty() || line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            sequence += 1;
            if sequence <= after {
                continue;
            }
            match parse_line(line) {
                Some(output) => {
                    last_occurred = Some(output.occurred);
                    results.push(output);
                }
                None => {
                    results.push(ProcessOutput::new(
                        ProcessOutputSource::StdErr,
                        format!("Corrupt log at line {sequence}, no more logs will be read"),
                        last_occurred.unwrap_or(now),
                    ));
                    break;
                }
            }
        }
        Ok((results, sequence.max(after)))
    }
}

fn parse_line(line: &[u8]) -> Option<ProcessOutput> {
    let (source, text, occurred): (String, String, DateTime<Utc>) = serde_json::from_slice(line).ok()?;
    let source = match source.as_str() {
        "stdout" => ProcessOutputSource::StdOut,
        "stderr" => ProcessOutputSource::StdErr,
        "debug" => ProcessOutputSource::Debug,
        _ => return None,
    };
    Some(ProcessOutput::new(source, text, occurred))
}

/// Appends entries to a [`ScriptLog`]
#[derive(Debug)]
pub struct ScriptLogWriter {
    file: File,
    sync: Arc<Mutex<()>>,
    masker: Arc<SensitiveValueMasker>,
}

impl ScriptLogWriter {
    pub fn write_output(
        &mut self,
        source: ProcessOutputSource,
        text: &str,
        occurred: DateTime<Utc>,
    ) -> Result<(), ScriptLogError> {
        let text = self.masker.mask(text);
        let mut line = serde_json::to_vec(&(source.to_string(), text.as_ref(), occurred))?;
        line.push(b'\n');
        let _guard = self.sync.lock();
        self.file.write_all(&line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn write(&mut self, output: &ProcessOutput) -> Result<(), ScriptLogError> {
        self.write_output(output.source, &output.text, output.occurred)
    }
}

#[cfg(test)]
#[path = "script_log_tests.rs"]
mod tests;
