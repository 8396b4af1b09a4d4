//! Event Logger - persists validation events to a JSONL file
//!
//! Each line is `{"ts": <rfc3339>, "event": {...}}`. A watch-mode consumer can
//! tail the file or read it back with [`read_event_log`].

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, ValidationEvent};

/// Subscribe to the bus and append every event to `path`
///
/// The subscription is taken before this returns, so no event emitted
/// afterwards is missed. The task ends when the bus is dropped.
pub fn spawn_event_logger(bus: Arc<EventBus>, path: impl Into<PathBuf>) -> JoinHandle<()> {
    let path = path.into();
    debug!(?path, "spawn_event_logger: called");
    let rx = bus.subscribe();
    drop(bus);
    tokio::spawn(run_logger(rx, path))
}

async fn run_logger(mut rx: broadcast::Receiver<ValidationEvent>, path: PathBuf) {
    let mut writer = match open_log(&path) {
        Ok(w) => w,
        Err(e) => {
            error!(?path, error = %e, "EventLogger: cannot open log file");
            return;
        }
    };

    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(e) = write_entry(&mut writer, &event) {
                    error!(event_type = event.event_type(), error = %e, "EventLogger: failed to write event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "EventLogger: lagged behind, missed events");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("EventLogger: channel closed, shutting down");
                break;
            }
        }
    }

    let _ = writer.flush();
}

fn open_log(path: &Path) -> std::io::Result<BufWriter<fs::File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

fn write_entry(writer: &mut impl Write, event: &ValidationEvent) -> eyre::Result<()> {
    let entry = EventLogEntry::new(event.clone());
    writeln!(writer, "{}", serde_json::to_string(&entry)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a JSONL event log back, skipping lines that do not parse
pub fn read_event_log(path: impl AsRef<Path>) -> eyre::Result<Vec<EventLogEntry>> {
    let path = path.as_ref();
    debug!(?path, "read_event_log: called");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(line = idx + 1, error = %e, "read_event_log: skipping malformed line"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_logger_writes_jsonl() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let bus = Arc::new(EventBus::with_default_capacity());

        let handle = spawn_event_logger(bus.clone(), &path);
        bus.emit(ValidationEvent::LoopValidationStarted {
            loop_id: "l1".to_string(),
            loop_name: "Loop".to_string(),
        });
        bus.emit(ValidationEvent::file_met("l1", "src/a.py"));
        drop(bus);
        handle.await.unwrap();

        let entries = read_event_log(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event.event_type(), "loop_validation_started");
        assert_eq!(entries[1].event, ValidationEvent::file_met("l1", "src/a.py"));
    }

    #[test]
    fn test_read_missing_log_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_event_log(dir.path().join("none.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let good = serde_json::to_string(&EventLogEntry::new(ValidationEvent::ValidationTime {
            loop_id: "l".to_string(),
            elapsed_ms: 3.0,
        }))
        .unwrap();
        fs::write(&path, format!("{}\nnot json\n\n{}\n", good, good)).unwrap();

        assert_eq!(read_event_log(&path).unwrap().len(), 2);
    }
}
