//! Tracking activity logger with periodic model summaries.
//!
//! While tracking is active the logger samples the target every half second,
//! appends a timestamped line to the log file and keeps a short in-memory
//! history. Every summary interval (and once more when tracking ends) the
//! whole log is sent to the language model in the background; at most one
//! summary request is in flight at a time.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use skyward_core::activity::{format_log_line, TrackEntry, TrackHistory, DEFAULT_HISTORY_CAPACITY};
use skyward_core::tracking::TrackSample;
use skyward_llm::{LlmError, Summarizer};

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub sample_interval: Duration,
    pub summary_interval: Duration,
    pub history_capacity: usize,
    pub log_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(500),
            summary_interval: Duration::from_secs(10),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            log_path: None,
        }
    }
}

pub struct ActivityLogger {
    config: LoggerConfig,
    summarizer: Summarizer,
    history: TrackHistory,
    raw_log: String,
    active: bool,
    since_sample: Duration,
    since_summary: Duration,
    summary_in_flight: bool,
    last_summary: Option<String>,
    summary_tx: mpsc::UnboundedSender<Result<String, LlmError>>,
    summary_rx: mpsc::UnboundedReceiver<Result<String, LlmError>>,
}

impl ActivityLogger {
    /// Create the logger and truncate the log file.
    pub fn new(config: LoggerConfig, summarizer: Summarizer) -> Self {
        let (summary_tx, summary_rx) = mpsc::unbounded_channel();
        let history = TrackHistory::new(config.history_capacity);
        let logger = Self {
            config,
            summarizer,
            history,
            raw_log: String::new(),
            active: false,
            since_sample: Duration::ZERO,
            since_summary: Duration::ZERO,
            summary_in_flight: false,
            last_summary: None,
            summary_tx,
            summary_rx,
        };
        logger.reset_file();
        logger
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn summary_in_flight(&self) -> bool {
        self.summary_in_flight
    }

    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    pub fn raw_log(&self) -> &str {
        &self.raw_log
    }

    pub fn last_summary(&self) -> Option<&str> {
        self.last_summary.as_deref()
    }

    pub fn begin(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        // First sample goes out on the next tick.
        self.since_sample = self.config.sample_interval;
        self.since_summary = Duration::ZERO;
        self.record("tracking started");
    }

    pub fn end(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.record("tracking stopped");
        self.request_summary();
    }

    /// Advance timers by `elapsed`, sampling `sample` when due.
    pub fn tick(&mut self, elapsed: Duration, sample: Option<&TrackSample>) {
        self.drain_summaries();
        if !self.active {
            return;
        }

        self.since_sample += elapsed;
        self.since_summary += elapsed;

        if self.since_sample >= self.config.sample_interval {
            self.since_sample = Duration::ZERO;
            if let Some(sample) = sample {
                let entry = TrackEntry::from_sample(sample, Local::now());
                let message = entry.message();
                self.history.push(entry);
                self.record(&message);
            }
        }

        if self.since_summary >= self.config.summary_interval {
            self.since_summary = Duration::ZERO;
            self.request_summary();
        }
    }

    /// Append a timestamped line to the log.
    pub fn record(&mut self, message: &str) {
        let line = format_log_line(&Local::now(), message);
        tracing::info!(target: "skyward_server::tracking_log", "{}", message);
        self.raw_log.push_str(&line);
        self.raw_log.push('\n');
        self.append_file(&line);
    }

    fn request_summary(&mut self) -> bool {
        if self.summary_in_flight {
            tracing::debug!("Summary already in flight; skipping");
            return false;
        }
        if self.raw_log.trim().is_empty() {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available; skipping summary");
            return false;
        };

        self.summary_in_flight = true;
        let text = self.raw_log.clone();
        let summarizer = self.summarizer.clone();
        let tx = self.summary_tx.clone();
        runtime.spawn(async move {
            let result = summarizer.summarize(&text).await;
            let _ = tx.send(result);
        });
        tracing::debug!("Summary requested");
        true
    }

    fn drain_summaries(&mut self) {
        while let Ok(result) = self.summary_rx.try_recv() {
            self.summary_in_flight = false;
            match result {
                Ok(summary) => {
                    self.record(&format!("=== tracking summary ===\n{}\n========================", summary));
                    self.last_summary = Some(summary);
                }
                Err(err) => {
                    tracing::warn!("Tracking summary failed: {}", err);
                    self.record(&format!("summary unavailable: {}", err));
                }
            }
        }
    }

    fn reset_file(&self) {
        let Some(path) = &self.config.log_path else {
            return;
        };
        let header = format_log_line(&Local::now(), "tracking log initialized");
        if let Err(err) = fs::write(path, format!("{}\n", header)) {
            tracing::error!("Failed to reset tracking log {}: {}", path.display(), err);
        }
    }

    fn append_file(&self, line: &str) {
        let Some(path) = &self.config.log_path else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{}", line));
        if let Err(err) = result {
            tracing::error!("Failed to write tracking log {}: {}", path.display(), err);
        }
    }
}
