//! Process backend
//!
//! The workload is a shell command. Each run gets a progress file named
//! after its identifier; the command learns the path from `PROGRESS_FILE`
//! and appends one record per line:
//!
//! ```text
//! 0.25
//! {"fraction": 0.5, "snapshot": "digraph progress { ... }"}
//! ```
//!
//! The sampler reads the last complete record of the file for the
//! identifier it was handed.

use super::{RunIdentifier, Sampler, SamplingSource, Workload, WorkloadSession};
use crate::error::{BackendError, BackendResult};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};
use uuid::Uuid;

/// Environment variable carrying the progress file path
pub const PROGRESS_FILE_ENV: &str = "PROGRESS_FILE";

/// Environment variable carrying the run identifier
pub const PROGRESS_RUN_ID_ENV: &str = "PROGRESS_RUN_ID";

/// Path of the progress file for a run
pub fn progress_file_path(progress_dir: &Path, identifier: &RunIdentifier) -> PathBuf {
    progress_dir.join(format!("{}.progress", identifier))
}

/// A single progress record written by the workload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressRecord {
    /// Completed fraction
    pub fraction: f64,

    /// Optional serialized snapshot
    #[serde(default)]
    pub snapshot: Option<String>,
}

impl ProgressRecord {
    fn empty() -> Self {
        Self {
            fraction: 0.0,
            snapshot: None,
        }
    }
}

/// Parse one record line: a bare float or a JSON object
pub fn parse_record(line: &str) -> BackendResult<ProgressRecord> {
    let line = line.trim();
    let malformed = |reason: String| BackendError::MalformedRecord {
        record: line.to_string(),
        reason,
    };

    if line.starts_with('{') {
        serde_json::from_str(line).map_err(|e| malformed(e.to_string()))
    } else {
        line.parse::<f64>()
            .map(|fraction| ProgressRecord {
                fraction,
                snapshot: None,
            })
            .map_err(|e| malformed(e.to_string()))
    }
}

/// Last complete, non-empty line of a progress file
///
/// A trailing line without a newline may still be in the middle of being
/// written and is ignored.
fn last_complete_line(contents: &str) -> Option<&str> {
    let complete = match contents.rfind('\n') {
        Some(end) => &contents[..end],
        None => return None,
    };

    complete
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

/// Workload that runs a shell command
#[derive(Debug, Clone)]
pub struct ProcessWorkload {
    shell: String,
    progress_dir: PathBuf,
}

impl ProcessWorkload {
    /// Create a workload running commands through `shell -c`
    pub fn new(shell: impl Into<String>, progress_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            progress_dir: progress_dir.into(),
        }
    }
}

impl Workload for ProcessWorkload {
    type Session = ProcessSession;

    fn connect(&self) -> BackendResult<ProcessSession> {
        fs::create_dir_all(&self.progress_dir).map_err(|source| BackendError::Io {
            path: self.progress_dir.clone(),
            source,
        })?;

        let identifier = RunIdentifier::new(Uuid::new_v4().simple().to_string());
        let progress_file = progress_file_path(&self.progress_dir, &identifier);
        File::create(&progress_file).map_err(|source| BackendError::Io {
            path: progress_file.clone(),
            source,
        })?;

        debug!(
            identifier = %identifier,
            file = %progress_file.display(),
            "Progress file created"
        );

        Ok(ProcessSession {
            shell: self.shell.clone(),
            identifier,
            progress_file,
        })
    }
}

/// A connected process workload
#[derive(Debug)]
pub struct ProcessSession {
    shell: String,
    identifier: RunIdentifier,
    progress_file: PathBuf,
}

impl ProcessSession {
    /// Path of this session's progress file
    pub fn progress_file(&self) -> &Path {
        &self.progress_file
    }
}

impl WorkloadSession for ProcessSession {
    fn identifier(&self) -> RunIdentifier {
        self.identifier.clone()
    }

    fn execute(&mut self, command: &str) -> BackendResult<()> {
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .env(PROGRESS_FILE_ENV, &self.progress_file)
            .env(PROGRESS_RUN_ID_ENV, self.identifier.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| BackendError::Launch {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BackendError::ExitStatus {
                command: command.to_string(),
                status: status.to_string(),
            })
        }
    }

    fn close(&mut self) -> BackendResult<()> {
        match fs::remove_file(&self.progress_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BackendError::Io {
                path: self.progress_file.clone(),
                source,
            }),
        }
    }
}

/// Sampling source reading progress files
#[derive(Debug, Clone)]
pub struct ProcessSource {
    progress_dir: PathBuf,
}

impl ProcessSource {
    /// Create a source reading progress files from `progress_dir`
    pub fn new(progress_dir: impl Into<PathBuf>) -> Self {
        Self {
            progress_dir: progress_dir.into(),
        }
    }
}

impl SamplingSource for ProcessSource {
    type Sampler = ProcessSampler;

    fn connect(&self) -> BackendResult<ProcessSampler> {
        if !self.progress_dir.is_dir() {
            return Err(BackendError::Connect(format!(
                "progress directory '{}' does not exist",
                self.progress_dir.display()
            )));
        }

        Ok(ProcessSampler {
            progress_dir: self.progress_dir.clone(),
            tail: None,
            latest: None,
        })
    }
}

/// Read position in one run's progress file
#[derive(Debug)]
struct FileTail {
    identifier: RunIdentifier,

    /// Bytes consumed so far
    offset: u64,

    /// Trailing bytes of an unterminated line
    pending: Vec<u8>,

    /// Last complete, non-empty line seen
    last_line: Option<String>,
}

impl FileTail {
    fn new(identifier: &RunIdentifier) -> Self {
        Self {
            identifier: identifier.clone(),
            offset: 0,
            pending: Vec::new(),
            last_line: None,
        }
    }

    /// Read whatever was appended since the previous call
    fn advance(&mut self, path: &Path) -> io::Result<()> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < self.offset {
            // Truncated or replaced; start over
            self.offset = 0;
            self.pending.clear();
            self.last_line = None;
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = std::mem::take(&mut self.pending);
        let read = file.read_to_end(&mut chunk)?;
        self.offset += read as u64;

        match chunk.iter().rposition(|&b| b == b'\n') {
            Some(end) => {
                let complete = String::from_utf8_lossy(&chunk[..=end]);
                if let Some(line) = last_complete_line(&complete) {
                    self.last_line = Some(line.to_string());
                }
                self.pending = chunk[end + 1..].to_vec();
            }
            None => self.pending = chunk,
        }
        Ok(())
    }
}

/// A connected progress file reader
///
/// Keeps its read position between updates and only reads what was appended.
#[derive(Debug)]
pub struct ProcessSampler {
    progress_dir: PathBuf,
    tail: Option<FileTail>,
    latest: Option<ProgressRecord>,
}

impl Sampler for ProcessSampler {
    fn request_update(&mut self, identifier: &RunIdentifier) -> BackendResult<()> {
        self.latest = None;

        let path = progress_file_path(&self.progress_dir, identifier);
        if self
            .tail
            .as_ref()
            .map_or(true, |tail| tail.identifier != *identifier)
        {
            self.tail = Some(FileTail::new(identifier));
        }
        let tail = self.tail.get_or_insert_with(|| FileTail::new(identifier));
        tail.advance(&path).map_err(|source| BackendError::Io {
            path: path.clone(),
            source,
        })?;

        let record = match tail.last_line.as_deref() {
            Some(line) => parse_record(line)?,
            None => ProgressRecord::empty(),
        };

        trace!(identifier = %identifier, fraction = record.fraction, "Progress record read");
        self.latest = Some(record);
        Ok(())
    }

    fn request_snapshot(&mut self) -> BackendResult<Option<String>> {
        self.latest
            .as_mut()
            .map(|record| record.snapshot.take())
            .ok_or_else(|| BackendError::request("snapshot", "no successful update"))
    }

    fn request_fraction(&mut self) -> BackendResult<f64> {
        self.latest
            .as_ref()
            .map(|record| record.fraction)
            .ok_or_else(|| BackendError::request("fraction", "no successful update"))
    }
}
