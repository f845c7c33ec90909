use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::Utc;

use crate::cache::ScriptCache;
use crate::catalog::{Action, Step};
use crate::error::{Error, Result};
use crate::source::ActionProvider;
use crate::ssh::{Connector, Credentials, RemoteSession, Target};
use crate::validate::validate_step_output;

use super::events::{EventSink, ExecutionEvent, NullSink, StopHandle};
use super::report::{
    summarize, CommandOrigin, ExecutionReport, FailureDetail, PreloadFailure, PreloadReport,
    RunStatus, StepResult, StepStatus,
};
use super::state::{EngineState, FailureKind, Transition};

/// Closes the session on every exit path, unwinding included.
struct SessionGuard(Box<dyn RemoteSession>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Runs one action's steps in order against a single remote session.
#[derive(Clone)]
pub struct Engine {
    source: Arc<dyn ActionProvider>,
    connector: Arc<dyn Connector>,
    scripts: Arc<ScriptCache>,
    sink: Arc<dyn EventSink>,
    stop: StopHandle,
}

impl Engine {
    pub fn new(
        source: Arc<dyn ActionProvider>,
        connector: Arc<dyn Connector>,
        scripts: Arc<ScriptCache>,
    ) -> Self {
        Self {
            source,
            connector,
            scripts,
            sink: Arc::new(NullSink),
            stop: StopHandle::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn emit(&self, event: ExecutionEvent) {
        self.sink.emit(event);
    }

    /// Script text for `script_ref`, from the script cache or the source.
    /// Returns whether the text came from the cache.
    fn resolve_script(&self, script_ref: &str) -> Result<(String, bool)> {
        let key = (self.source.source_name(), script_ref.to_string());
        if let Some(text) = self.scripts.get(&key) {
            return Ok((text, true));
        }
        let text = self.source.load_step(script_ref)?;
        self.scripts.insert(key, text.clone());
        Ok((text, false))
    }

    /// Resolve every script the action references. Failures are counted,
    /// never fatal.
    pub fn preload(&self, action: &Action) -> PreloadReport {
        let refs = action.script_refs();
        let mut report = PreloadReport {
            total: refs.len(),
            ..Default::default()
        };
        self.emit(ExecutionEvent::PreloadStarted {
            scripts: refs.len(),
        });

        for script in refs {
            match self.resolve_script(script) {
                Ok((_, cached)) => {
                    report.loaded += 1;
                    tracing::debug!(script, cached, "preloaded script");
                    self.emit(ExecutionEvent::ScriptPreloaded {
                        script: script.to_string(),
                        cached,
                    });
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(script, error = %err, "failed to preload script");
                    self.emit(ExecutionEvent::ScriptPreloadFailed {
                        script: script.to_string(),
                        error: err.message.clone(),
                    });
                    report.failures.push(PreloadFailure {
                        script: script.to_string(),
                        error: err.message,
                    });
                }
            }
        }

        report.all_failed = report.total > 0 && report.loaded == 0;
        if report.all_failed {
            tracing::warn!(
                scripts = report.total,
                "no script could be preloaded, continuing with lazy resolution"
            );
        }

        self.emit(ExecutionEvent::PreloadFinished {
            loaded: report.loaded,
            failed: report.failed,
        });
        report
    }

    fn command_for(&self, step: &Step) -> (String, CommandOrigin) {
        if !step.is_script_ref() {
            return (step.script.clone(), CommandOrigin::Inline);
        }
        match self.resolve_script(&step.script) {
            Ok((text, _)) => (text, CommandOrigin::Script),
            Err(err) => {
                tracing::warn!(
                    script = %step.script,
                    error = %err,
                    "script unresolved, running reference as a command"
                );
                (step.script.clone(), CommandOrigin::Literal)
            }
        }
    }

    /// Preload, connect, then run every step until one fails.
    pub fn run(&self, action: &Action, target: &Target, credentials: &Credentials) -> ExecutionReport {
        let started_at = Utc::now().to_rfc3339();
        let total = action.steps.len();
        let mut steps = Vec::with_capacity(total);
        let mut failure = None;

        let mut state = EngineState::Idle.advance(Transition::Start);
        let preload = self.preload(action);
        state = state.advance(Transition::PreloadFinished);

        self.emit(ExecutionEvent::Connecting {
            target: target.to_string(),
        });

        match self.connector.connect(target, credentials) {
            Err(err) => {
                tracing::error!(target = %target, error = %err, "connection failed");
                state = state.advance(Transition::ConnectFailed);
                failure = Some(FailureDetail::connection(err));
            }
            Ok(session) => {
                let mut session = SessionGuard(session);
                self.emit(ExecutionEvent::Connected {
                    target: target.to_string(),
                });
                state = state.advance(Transition::Connected { total });

                while let EngineState::Running { index, total } = state {
                    let step = &action.steps[index];

                    if self.stop.is_stopped() {
                        tracing::info!(step = index + 1, "stop requested");
                        failure = Some(FailureDetail::stopped(index, &step.title));
                        state = state.advance(Transition::StepFailed(FailureKind::Stopped));
                        break;
                    }

                    self.emit(ExecutionEvent::StepStarted {
                        index,
                        total,
                        title: step.title.clone(),
                    });

                    let (result, step_failure) =
                        self.run_step(session.0.as_mut(), index, step, &target.host);
                    let passed = step_failure.is_none();
                    steps.push(result);

                    state = match step_failure {
                        None => state.advance(Transition::StepPassed),
                        Some(detail) => {
                            let kind = detail.kind.unwrap_or(FailureKind::Execution);
                            failure = Some(detail);
                            state.advance(Transition::StepFailed(kind))
                        }
                    };

                    self.emit(ExecutionEvent::StepFinished {
                        completed: state.succeeded(),
                        total,
                        title: step.title.clone(),
                        passed,
                    });
                }
            }
        }

        let status = match state {
            EngineState::Succeeded { .. } => RunStatus::Succeeded,
            EngineState::ConnectionError => RunStatus::ConnectionError,
            _ => RunStatus::Failed,
        };
        let succeeded = state.succeeded();
        let summary = summarize(succeeded, total, &status, failure.as_ref());

        match status {
            RunStatus::Succeeded => tracing::info!(action = %action.title, "{}", summary),
            _ => tracing::warn!(action = %action.title, "{}", summary),
        }

        let report = ExecutionReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            action: action.title.clone(),
            source: self.source.source_name(),
            target: target.to_string(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            status,
            succeeded,
            total,
            steps,
            preload,
            failure,
            summary: summary.clone(),
        };

        self.emit(ExecutionEvent::Finished {
            summary,
            report: Box::new(report.clone()),
        });
        report
    }

    fn run_step(
        &self,
        session: &mut dyn RemoteSession,
        index: usize,
        step: &Step,
        host: &str,
    ) -> (StepResult, Option<FailureDetail>) {
        let (command, origin) = self.command_for(step);
        tracing::info!(step = index + 1, title = %step.title, ?origin, "running step");

        let mut result = StepResult {
            index,
            title: step.title.clone(),
            origin,
            status: StepStatus::Failed,
            output: String::new(),
            expected: step.expected_pattern().map(str::to_string),
            exit_code: None,
        };

        let output = match session.run(&command) {
            Ok(output) => output,
            Err(err) => {
                result.output = err.message.clone();
                return (
                    result,
                    Some(FailureDetail::for_step(index, &step.title, FailureKind::Execution, err)),
                );
            }
        };

        let combined = output.combined();
        result.exit_code = Some(output.exit_code);

        if !output.success {
            result.output = combined.trim().to_string();
            let detail = FailureDetail::execution(
                index,
                &step.title,
                &command,
                host,
                output.exit_code,
                &result.output,
            );
            return (result, Some(detail));
        }

        let actual = combined.trim();
        result.output = actual.to_string();

        if validate_step_output(actual, step.expected_pattern()) {
            result.status = StepStatus::Passed;
            (result, None)
        } else {
            let detail = FailureDetail::validation(
                index,
                &step.title,
                step.expected_pattern().unwrap_or_default(),
                actual,
            );
            (result, Some(detail))
        }
    }
}

/// A run on a background thread.
pub struct RunHandle {
    thread: JoinHandle<ExecutionReport>,
    events: Receiver<ExecutionEvent>,
    stop: StopHandle,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<ExecutionEvent> {
        &self.events
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn join(self) -> Result<ExecutionReport> {
        self.thread
            .join()
            .map_err(|_| Error::internal_unexpected("execution thread panicked"))
    }
}

/// Run `action` on a background thread, publishing events over a channel.
pub fn spawn(engine: Engine, action: Action, target: Target, credentials: Credentials) -> RunHandle {
    let (tx, rx) = mpsc::channel();
    let engine = engine.with_sink(Arc::new(tx));
    let stop = engine.stop_handle();

    let thread = std::thread::spawn(move || engine.run(&action, &target, &credentials));

    RunHandle {
        thread,
        events: rx,
        stop,
    }
}
