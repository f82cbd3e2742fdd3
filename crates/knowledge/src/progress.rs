//! Structured progress reporting for ingestion.
//!
//! Ingestion runs in phases (discover, chunk, vibes, embed, index); each phase
//! emits incremental events so a CLI can render feedback.

use std::sync::Arc;
use std::time::Instant;

/// Progress event emitted during ingestion.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Phase of the operation: "discover", "chunk", "vibes", "embed", "index"
    pub phase: &'static str,

    /// Units processed so far (files, records, texts)
    pub current: u64,

    /// Total expected work (if known)
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: &'static str,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage = total.map(|t| {
            if t > 0 {
                (current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        callback(event);
    }

    pub fn discover(&self, files: u64, dir: &str) {
        self.emit(ProgressEvent::new(
            "discover",
            files,
            None,
            format!("found {} CSV files in {}", files, dir),
        ));
    }

    pub fn chunk(&self, file_index: u64, files: u64, file: &str, chunks_so_far: usize) {
        self.emit(ProgressEvent::new(
            "chunk",
            file_index,
            Some(files),
            format!("{} ({} chunks so far)", file, chunks_so_far),
        ));
    }

    pub fn vibes(&self, records_done: u64, records: u64, city: &str) {
        self.emit(ProgressEvent::new(
            "vibes",
            records_done,
            Some(records),
            format!("tagging {} posts", city),
        ));
    }

    pub fn embed(&self, texts_done: u64, texts: u64, model: &str) {
        self.emit(ProgressEvent::new(
            "embed",
            texts_done,
            Some(texts),
            format!("model={}", model),
        ));
    }

    pub fn index(&self, vectors: u64, store_dir: &str) {
        self.emit(ProgressEvent::new(
            "index",
            vectors,
            Some(vectors),
            format!("writing {}", store_dir),
        ));
    }
}
