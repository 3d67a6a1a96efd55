//! Named wall-clock timers persisted to a statistics sink.
//!
//! A [`StatsRecorder`] is opened once per process, handed by `&mut` to the
//! code that times things, and closed once at exit. Each start, stop and
//! still-open-at-close event becomes one [`TimerEvent`] in the sink.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::obs::emit_timer_unclosed;

/// File under the stats directory receiving timer events.
pub const TIMERS_FILE: &str = "timers.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEventKind {
    Start,
    Stop,
    /// Span was still open when the recorder closed.
    Unclosed,
}

/// One persisted timer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEvent {
    pub session_id: Uuid,
    pub label: String,
    pub kind: TimerEventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

/// A closed timer interval.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSpan {
    pub label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Destination for timer events.
pub trait StatsSink: Send {
    fn record(&mut self, event: &TimerEvent) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Appends events as JSON lines to `<dir>/timers.jsonl`.
pub struct JsonlStatsSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlStatsSink {
    /// Open (or create) the events file under `dir`. Creates `dir` if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(TIMERS_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsSink for JsonlStatsSink {
    fn record(&mut self, event: &TimerEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink; clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatsSink {
    events: Arc<Mutex<Vec<TimerEvent>>>,
}

impl MemoryStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<TimerEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StatsSink for MemoryStatsSink {
    fn record(&mut self, event: &TimerEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

struct OpenTimer {
    start_time: DateTime<Utc>,
    started: Instant,
}

/// Process-wide timer recorder over a [`StatsSink`].
pub struct StatsRecorder {
    session_id: Uuid,
    sink: Box<dyn StatsSink>,
    open: HashMap<String, OpenTimer>,
}

impl StatsRecorder {
    /// Open a JSONL sink rooted at `stats_dir`.
    pub fn open(stats_dir: impl AsRef<Path>) -> Result<Self> {
        let sink = JsonlStatsSink::open(stats_dir)?;
        debug!(path = %sink.path().display(), "stats sink opened");
        Ok(Self::with_sink(sink))
    }

    pub fn with_sink(sink: impl StatsSink + 'static) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sink: Box::new(sink),
            open: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Labels of timers started and not yet stopped, sorted.
    pub fn open_timers(&self) -> Vec<String> {
        let mut labels: Vec<_> = self.open.keys().cloned().collect();
        labels.sort();
        labels
    }

    /// Start `label`. Restarting an open label discards its earlier start.
    pub fn start_timer(&mut self, label: &str) -> Result<()> {
        if self.open.contains_key(label) {
            warn!(label = %label, "timer restarted while open");
        }
        let start_time = Utc::now();
        self.sink.record(&TimerEvent {
            session_id: self.session_id,
            label: label.to_string(),
            kind: TimerEventKind::Start,
            timestamp: start_time,
            elapsed_ms: None,
        })?;
        self.open.insert(
            label.to_string(),
            OpenTimer {
                start_time,
                started: Instant::now(),
            },
        );
        Ok(())
    }

    /// Stop `label`, returning the closed span. `None` if it was not open.
    pub fn stop_timer(&mut self, label: &str) -> Result<Option<TimerSpan>> {
        let Some(timer) = self.open.remove(label) else {
            warn!(label = %label, "stop for timer that was never started");
            return Ok(None);
        };
        let end_time = Utc::now();
        let elapsed_ms = timer.started.elapsed().as_millis() as u64;
        self.sink.record(&TimerEvent {
            session_id: self.session_id,
            label: label.to_string(),
            kind: TimerEventKind::Stop,
            timestamp: end_time,
            elapsed_ms: Some(elapsed_ms),
        })?;
        debug!(label = %label, elapsed_ms = elapsed_ms, "timer stopped");
        Ok(Some(TimerSpan {
            label: label.to_string(),
            start_time: timer.start_time,
            end_time,
            elapsed_ms,
        }))
    }

    /// Record every still-open timer as unclosed, then flush the sink.
    pub fn close(mut self) -> Result<()> {
        let now = Utc::now();
        for label in self.open_timers() {
            emit_timer_unclosed(&label);
            let elapsed_ms = self.open[&label].started.elapsed().as_millis() as u64;
            self.sink.record(&TimerEvent {
                session_id: self.session_id,
                label,
                kind: TimerEventKind::Unclosed,
                timestamp: now,
                elapsed_ms: Some(elapsed_ms),
            })?;
        }
        self.sink.flush()
    }
}
