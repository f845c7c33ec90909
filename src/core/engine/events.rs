use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use serde::Serialize;

use super::report::ExecutionReport;

/// Progress published while an action runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    PreloadStarted {
        scripts: usize,
    },
    ScriptPreloaded {
        script: String,
        cached: bool,
    },
    ScriptPreloadFailed {
        script: String,
        error: String,
    },
    PreloadFinished {
        loaded: usize,
        failed: usize,
    },
    Connecting {
        target: String,
    },
    Connected {
        target: String,
    },
    StepStarted {
        index: usize,
        total: usize,
        title: String,
    },
    StepFinished {
        completed: usize,
        total: usize,
        title: String,
        passed: bool,
    },
    Finished {
        summary: String,
        report: Box<ExecutionReport>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

impl<F> EventSink for F
where
    F: Fn(ExecutionEvent) + Send + Sync,
{
    fn emit(&self, event: ExecutionEvent) {
        self(event)
    }
}

impl EventSink for Sender<ExecutionEvent> {
    fn emit(&self, event: ExecutionEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ExecutionEvent) {}
}

/// Asks a running engine to stop before its next step. A command already
/// running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
