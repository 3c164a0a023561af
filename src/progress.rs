//! Progress reporting for conversion jobs.
//!
//! The pipeline talks to the outside world through two plain-text channels: a
//! top-level *phase* channel ("Conversion started", "PDF created: ...") and a
//! fine-grained *sub-step* channel ("Processing image file 5 of 120: 005.jpg").
//! Hosts implement [`ProgressSink`] and marshal messages wherever they need them
//! (a UI thread, a terminal, a log file); the core has no thread affinity.
//!
//! Every message is also logged once by [`StatusReporter`] (phases at `info`, sub-steps
//! at `debug`, warnings and failures at `warn`), so [`NoopProgressSink`] is enough for
//! hosts that only want the log.
//!
//! Sinks are untrusted: [`StatusReporter`] swallows both errors and panics coming
//! out of a sink so a broken progress display can never fail a conversion.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use log::{info, warn};

/// Error type sinks may return.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of human-readable status messages.
pub trait ProgressSink: Send + Sync {
    /// Called with job-level status (phase changes, final summary, failures).
    fn report_phase(&self, message: &str) -> std::result::Result<(), SinkError>;

    /// Called with fine-grained status (per page, per source).
    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError>;
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn report_phase(&self, _message: &str) -> std::result::Result<(), SinkError> {
        Ok(())
    }

    fn report_sub_step(&self, _message: &str) -> std::result::Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps the last value of each channel, overwritten on every report.
#[derive(Debug)]
pub struct StatusBoard {
    phase: Mutex<String>,
    sub_step: Mutex<String>,
}

/// Initial value of both [`StatusBoard`] channels.
pub const NOTHING_PROCESSING: &str = "Nothing Processing";

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            phase: Mutex::new(NOTHING_PROCESSING.to_string()),
            sub_step: Mutex::new(NOTHING_PROCESSING.to_string()),
        }
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> String {
        self.phase
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn sub_step(&self) -> String {
        self.sub_step
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ProgressSink for StatusBoard {
    fn report_phase(&self, message: &str) -> std::result::Result<(), SinkError> {
        let mut phase = self.phase.lock().map_err(|e| e.to_string())?;
        *phase = message.to_string();
        Ok(())
    }

    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError> {
        let mut sub_step = self.sub_step.lock().map_err(|e| e.to_string())?;
        *sub_step = message.to_string();
        Ok(())
    }
}

/// Formats and forwards status messages to a [`ProgressSink`]. Never fails.
#[derive(Clone)]
pub struct StatusReporter {
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter").finish_non_exhaustive()
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(Arc::new(NoopProgressSink))
    }
}

impl StatusReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }

    /// Reports on either or both channels.
    pub fn report(&self, phase: Option<&str>, sub_step: Option<&str>) {
        if let Some(message) = phase {
            self.phase(message);
        }
        if let Some(message) = sub_step {
            self.sub_step(message);
        }
    }

    pub fn phase(&self, message: &str) {
        info!("{}", message);
        let sink = &self.sink;
        Self::deliver("phase", || sink.report_phase(message));
    }

    pub fn sub_step(&self, message: &str) {
        log::debug!("{}", message);
        let sink = &self.sink;
        Self::deliver("sub-step", || sink.report_sub_step(message));
    }

    /// Reports a recoverable problem on the sub-step channel and logs it as a warning.
    pub fn warn(&self, message: &str) {
        warn!("{}", message);
        let sink = &self.sink;
        Self::deliver("sub-step", || sink.report_sub_step(message));
    }

    /// Reports a job failure on the phase channel and logs it as a warning.
    pub fn failure(&self, message: &str) {
        warn!("{}", message);
        let sink = &self.sink;
        Self::deliver("phase", || sink.report_phase(message));
    }

    fn deliver<F>(channel: &str, send: F)
    where
        F: FnOnce() -> std::result::Result<(), SinkError>,
    {
        match catch_unwind(AssertUnwindSafe(send)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Progress sink rejected {} message: {}", channel, e),
            Err(_) => warn!("Progress sink panicked while handling {} message", channel),
        }
    }
}
