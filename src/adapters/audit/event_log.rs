//! Event Log - Append-only JSONL Execution Records
//!
//! Persists execution events to daily JSONL files in the format
//! `events/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON
//! record for easy parsing, streaming, and crash recovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::events::ExecutionEvent;

/// One persisted execution event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// When the record was written.
    pub recorded_at: DateTime<Utc>,
    /// The event itself.
    pub event: ExecutionEvent,
}

impl AuditRecord {
    pub fn new(event: ExecutionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            event,
        }
    }
}

/// Append-only JSONL event logger with daily file rotation.
pub struct EventLog {
    /// Directory holding the daily files.
    events_dir: PathBuf,
}

impl EventLog {
    /// Create a new event log in the given data directory.
    ///
    /// # Errors
    /// Fails if the events directory cannot be created.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let events_dir = data_dir.as_ref().join("events");

        fs::create_dir_all(&events_dir)
            .await
            .context("Failed to create events directory")?;

        Ok(Self { events_dir })
    }

    /// Append a record to the file for its `recorded_at` day.
    ///
    /// # Errors
    /// Fails on serialization or I/O errors.
    #[instrument(skip(self, record), fields(record_id = %record.id))]
    pub async fn append(&self, record: &AuditRecord) -> Result<()> {
        let date = record.recorded_at.format("%Y-%m-%d").to_string();
        let path = self.events_dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(record)
            .context("Failed to serialize audit record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open event log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write audit record")?;

        file.flush().await.context("Failed to flush event log")?;

        Ok(())
    }

    /// Load all records from all daily files, oldest first.
    ///
    /// Malformed lines are skipped with a warning.
    ///
    /// # Errors
    /// Fails if the directory or a file cannot be read.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<AuditRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.events_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<AuditRecord>(line) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed audit record"
                            );
                        }
                    }
                }
            }
        }

        records.sort_by_key(|r| r.recorded_at);
        info!(count = records.len(), "Loaded audit records");
        Ok(records)
    }

    /// Persist events from the agent's stream until shutdown.
    ///
    /// On shutdown, events already buffered in the stream are written
    /// before returning. Dropping the shutdown sender is not a shutdown;
    /// the log then runs until the event stream closes. Write failures
    /// are logged and do not stop the loop.
    ///
    /// # Errors
    /// Currently always returns `Ok`; the signature matches other tasks.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        mut events_rx: broadcast::Receiver<ExecutionEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        info!(dir = %self.events_dir.display(), "Event log started");
        let mut shutdown_open = true;

        loop {
            tokio::select! {
                biased;
                signal = shutdown_rx.recv(), if shutdown_open => {
                    if let Err(broadcast::error::RecvError::Closed) = signal {
                        shutdown_open = false;
                        continue;
                    }
                    let drained = self.drain(&mut events_rx).await;
                    info!(drained, "Event log shutting down");
                    return Ok(());
                }
                event = events_rx.recv() => {
                    match event {
                        Ok(event) => self.persist(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(dropped = n, "Event log lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Event stream closed");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Write every event still buffered in the stream.
    async fn drain(&self, events_rx: &mut broadcast::Receiver<ExecutionEvent>) -> usize {
        let mut drained = 0;
        loop {
            match events_rx.try_recv() {
                Ok(event) => {
                    self.persist(event).await;
                    drained += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(dropped = n, "Event log lagged while draining");
                }
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => return drained,
            }
        }
    }

    async fn persist(&self, event: ExecutionEvent) {
        if let Err(e) = self.append(&AuditRecord::new(event)).await {
            error!(error = %e, "Failed to persist execution event");
        }
    }
}
