//! Out-of-band sink for probe output that no signature recognized.
//!
//! The evidence is kept so the signature catalog can be extended later. A
//! failing sink never fails brand detection.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ConnectError;

pub const BEGIN_MARKER: &str = "----------------BEGIN---------------";
pub const END_MARKER: &str = "--------------------------END---------------------";

/// Default location of the unknown-device log.
pub const DEFAULT_UNKNOWN_LOG: &str = "unknown_models/data.txt";

/// Receives raw probe output from devices that matched no signature.
///
/// Called while the session is locked, so implementations must not block
/// the runtime.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn record_unknown(&self, device_addr: &str, evidence: &str) -> Result<(), ConnectError>;
}

/// Wraps evidence in BEGIN/END marker lines.
pub fn format_record(evidence: &str) -> String {
    format!("{BEGIN_MARKER}\n{evidence}\n{END_MARKER}\n")
}

/// Appends unknown-device evidence to a text file.
#[derive(Debug)]
pub struct UnknownDeviceLog {
    path: PathBuf,
    // Appends from concurrent sessions must not interleave.
    write_lock: Arc<Mutex<()>>,
}

impl UnknownDeviceLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for UnknownDeviceLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNKNOWN_LOG)
    }
}

/// Blocking append of one record, creating the parent directory on demand.
fn append_record(path: &Path, write_lock: &Mutex<()>, evidence: &str) -> std::io::Result<()> {
    let _guard = write_lock
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format_record(evidence).as_bytes())
}

#[async_trait]
impl DiagnosticsSink for UnknownDeviceLog {
    async fn record_unknown(&self, _device_addr: &str, evidence: &str) -> Result<(), ConnectError> {
        let path = self.path.clone();
        let write_lock = self.write_lock.clone();
        let evidence = evidence.to_string();
        tokio::task::spawn_blocking(move || append_record(&path, &write_lock, &evidence))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

/// Discards all evidence.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl DiagnosticsSink for NullSink {
    async fn record_unknown(&self, _device_addr: &str, _evidence: &str) -> Result<(), ConnectError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_are_appended_with_markers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("unknown_models").join("data.txt");
        let log = UnknownDeviceLog::new(&path);

        log.record_unknown("admin@10.0.0.1:22", "first device")
            .await
            .expect("first append");
        log.record_unknown("admin@10.0.0.2:22", "second device")
            .await
            .expect("second append");

        let content = fs::read_to_string(&path).expect("read log");
        assert_eq!(
            content,
            format!("{}{}", format_record("first device"), format_record("second device"))
        );
        assert!(content.starts_with(BEGIN_MARKER));
        assert!(content.trim_end().ends_with(END_MARKER));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_records_do_not_interleave() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        let log = Arc::new(UnknownDeviceLog::new(&path));

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    log.record_unknown("admin@sim:22", &format!("device {i}\nline two"))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("join").expect("append");
        }

        let content = fs::read_to_string(&path).expect("read log");
        assert_eq!(content.matches(BEGIN_MARKER).count(), 8);
        for i in 0..8 {
            assert!(content.contains(&format_record(&format!("device {i}\nline two"))));
        }
    }
}
