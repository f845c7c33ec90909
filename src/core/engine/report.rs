use serde::Serialize;

use crate::error::{Error, RemoteCommandFailedDetails, Result, StepValidationDetails};

use super::state::FailureKind;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    ConnectionError,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// How the command text for a step was obtained.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandOrigin {
    Inline,
    Script,
    /// The script could not be resolved; its reference ran as a command.
    Literal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub index: usize,
    pub title: String,
    pub origin: CommandOrigin,
    pub status: StepStatus,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreloadFailure {
    pub script: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
    /// At least one script was referenced and none loaded.
    pub all_failed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PreloadFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureDetail {
    /// One-based step number; absent for connection failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    pub code: String,
    pub reason: String,
    #[serde(skip)]
    pub error: Option<Error>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub run_id: String,
    pub action: String,
    pub source: String,
    pub target: String,
    pub started_at: String,
    pub finished_at: String,
    pub status: RunStatus,
    pub succeeded: usize,
    pub total: usize,
    pub steps: Vec<StepResult>,
    pub preload: PreloadReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
    pub summary: String,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// "All N steps succeeded" or "M/N succeeded, stopped at step k: reason".
    pub fn summary_line(&self) -> String {
        summarize(self.succeeded, self.total, &self.status, self.failure.as_ref())
    }

    /// The coded error matching a failed run, for exit-code mapping.
    pub fn error(&self) -> Option<Error> {
        if self.is_success() {
            return None;
        }
        self.failure.as_ref().map(|f| {
            f.error
                .clone()
                .unwrap_or_else(|| Error::internal_unexpected(f.reason.clone()))
        })
    }

    /// The report itself for a successful run. Otherwise the run's coded error,
    /// carrying the full report under `details.report`.
    pub fn into_result(self) -> Result<Self> {
        let Some(mut err) = self.error() else {
            return Ok(self);
        };
        let report = serde_json::to_value(&self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize run report".to_string()))
        })?;
        match err.details.as_object_mut() {
            Some(details) => {
                details.insert("report".to_string(), report);
            }
            None => err.details = serde_json::json!({ "report": report }),
        }
        Err(err)
    }
}

pub(crate) fn summarize(
    succeeded: usize,
    total: usize,
    status: &RunStatus,
    failure: Option<&FailureDetail>,
) -> String {
    match (status, failure) {
        (RunStatus::Succeeded, _) => format!("All {} steps succeeded", total),
        (RunStatus::ConnectionError, Some(f)) => {
            format!("{}/{} succeeded, connection failed: {}", succeeded, total, f.reason)
        }
        (_, Some(f)) => format!(
            "{}/{} succeeded, stopped at step {}: {}",
            succeeded,
            total,
            f.step.unwrap_or(succeeded + 1),
            f.reason
        ),
        (_, None) => format!("{}/{} succeeded", succeeded, total),
    }
}

impl FailureDetail {
    pub(crate) fn connection(error: Error) -> Self {
        Self {
            step: None,
            title: None,
            kind: None,
            code: error.code.as_str().to_string(),
            reason: error.message.clone(),
            error: Some(error),
        }
    }

    pub(crate) fn execution(
        index: usize,
        title: &str,
        command: &str,
        host: &str,
        exit_code: i32,
        output: &str,
    ) -> Self {
        let error = Error::remote_command_failed(RemoteCommandFailedDetails {
            command: command.to_string(),
            exit_code,
            output: output.to_string(),
            host: host.to_string(),
        });
        Self::for_step(index, title, FailureKind::Execution, error)
    }

    pub(crate) fn validation(index: usize, title: &str, expected: &str, actual: &str) -> Self {
        let error = Error::step_validation_failed(StepValidationDetails {
            step: title.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
        Self::for_step(index, title, FailureKind::Validation, error)
    }

    pub(crate) fn stopped(index: usize, title: &str) -> Self {
        Self::for_step(index, title, FailureKind::Stopped, Error::run_stopped(index + 1))
    }

    pub(crate) fn for_step(index: usize, title: &str, kind: FailureKind, error: Error) -> Self {
        Self {
            step: Some(index + 1),
            title: Some(title.to_string()),
            kind: Some(kind),
            code: error.code.as_str().to_string(),
            reason: error.message.clone(),
            error: Some(error),
        }
    }
}
