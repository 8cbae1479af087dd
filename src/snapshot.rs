//! Snapshot buffering and persistence
//!
//! The monitor buffers snapshots in memory while sampling and writes them
//! out only after the shutdown rendezvous. Files are numbered contiguously
//! from zero in iteration order; iterations without a snapshot (or with an
//! empty one) leave no file and no gap.

use crate::error::SnapshotError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the snapshot at `index`
pub fn snapshot_file_name(index: usize, extension: &str) -> String {
    format!("{:04}_snapshot.{}", index, extension)
}

/// Snapshot captured in one sampling iteration
#[derive(Debug, Clone)]
struct BufferedSnapshot {
    iteration: u64,
    contents: Arc<str>,
}

/// In-memory snapshot buffer
#[derive(Debug)]
pub struct SnapshotBuffer {
    extension: String,
    snapshots: Vec<BufferedSnapshot>,
}

impl SnapshotBuffer {
    /// Create an empty buffer for snapshots with the given file extension
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            snapshots: Vec::new(),
        }
    }

    /// Buffer the snapshot of an iteration; empty snapshots are dropped
    pub fn record(&mut self, iteration: u64, snapshot: &Arc<str>) {
        if snapshot.trim().is_empty() {
            return;
        }

        debug_assert!(
            self.snapshots
                .last()
                .map_or(true, |last| last.iteration < iteration),
            "snapshots must be recorded in iteration order"
        );

        self.snapshots.push(BufferedSnapshot {
            iteration,
            contents: Arc::clone(snapshot),
        });
    }

    /// Number of buffered snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if nothing was buffered
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Iterations that produced a buffered snapshot
    pub fn iterations(&self) -> impl Iterator<Item = u64> + '_ {
        self.snapshots.iter().map(|s| s.iteration)
    }

    /// Total size of the buffered snapshots in bytes
    pub fn total_bytes(&self) -> u64 {
        self.snapshots.iter().map(|s| s.contents.len() as u64).sum()
    }

    /// Write every buffered snapshot into `output_dir`
    ///
    /// Returns the written paths in index order.
    pub fn persist(&self, output_dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
        if self.snapshots.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(output_dir).map_err(|source| SnapshotError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.snapshots.len());
        for (index, snapshot) in self.snapshots.iter().enumerate() {
            let path = output_dir.join(snapshot_file_name(index, &self.extension));
            fs::write(&path, snapshot.contents.as_bytes()).map_err(|source| {
                SnapshotError::Write {
                    path: path.clone(),
                    source,
                }
            })?;
            written.push(path);
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snap(contents: &str) -> Arc<str> {
        Arc::from(contents)
    }

    #[test]
    fn test_snapshot_file_name() {
        assert_eq!(snapshot_file_name(0, "dot"), "0000_snapshot.dot");
        assert_eq!(snapshot_file_name(42, "json"), "0042_snapshot.json");
        assert_eq!(snapshot_file_name(12345, "dot"), "12345_snapshot.dot");
    }

    #[test]
    fn test_persist_numbers_contiguously() {
        let dir = tempdir().unwrap();
        let mut buffer = SnapshotBuffer::new("dot");
        buffer.record(0, &snap("digraph a {}"));
        buffer.record(1, &snap(""));
        buffer.record(2, &snap("   "));
        buffer.record(3, &snap("digraph b {}"));
        buffer.record(5, &snap("digraph c {}"));

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.iterations().collect::<Vec<_>>(), vec![0, 3, 5]);

        let written = buffer.persist(dir.path()).unwrap();
        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["0000_snapshot.dot", "0001_snapshot.dot", "0002_snapshot.dot"]
        );
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "digraph b {}");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_persist_creates_output_dir() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested").join("frames");
        let mut buffer = SnapshotBuffer::new("dot");
        buffer.record(0, &snap("digraph {}"));

        let written = buffer.persist(&output).unwrap();
        assert_eq!(written, vec![output.join("0000_snapshot.dot")]);
        assert_eq!(buffer.total_bytes(), 10);
    }

    #[test]
    fn test_empty_buffer_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("untouched");
        let buffer = SnapshotBuffer::new("dot");

        assert!(buffer.persist(&output).unwrap().is_empty());
        assert!(!output.exists());
    }
}
