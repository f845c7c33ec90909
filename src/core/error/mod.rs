use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    SourceInvalid,
    SourceResourceNotFound,
    ActionNotFound,
    CatalogParseError,

    UpstreamRequestFailed,

    SshConnectFailed,
    RemoteCommandFailed,
    StepValidationFailed,
    RunStopped,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SourceInvalid => "source.invalid",
            ErrorCode::SourceResourceNotFound => "source.resource_not_found",
            ErrorCode::ActionNotFound => "action.not_found",
            ErrorCode::CatalogParseError => "catalog.parse_error",

            ErrorCode::UpstreamRequestFailed => "upstream.request_failed",

            ErrorCode::SshConnectFailed => "ssh.connect_failed",
            ErrorCode::RemoteCommandFailed => "remote.command_failed",
            ErrorCode::StepValidationFailed => "step.validation_failed",
            ErrorCode::RunStopped => "run.stopped",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInvalidDetails {
    pub source: String,
    pub operation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNotFoundDetails {
    pub source: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionNotFoundDetails {
    pub action: String,
    pub source: String,
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParseDetails {
    pub source: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamDetails {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnectFailedDetails {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub output: String,
    pub host: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidationDetails {
    pub step: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
                id,
                tried,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem: problem.into(),
            }),
        )
    }

    /// A remote-only operation was requested against the local source.
    pub fn source_invalid(source: impl Into<String>, operation: impl Into<String>) -> Self {
        let source = source.into();
        let operation = operation.into();
        Self::new(
            ErrorCode::SourceInvalid,
            format!("Cannot {} for source '{}'", operation, source),
            to_details(SourceInvalidDetails { source, operation }),
        )
    }

    pub fn resource_not_found(source: impl Into<String>, path: impl Into<String>) -> Self {
        let source = source.into();
        let path = path.into();
        Self::new(
            ErrorCode::SourceResourceNotFound,
            format!("Resource '{}' not found in source '{}'", path, source),
            to_details(ResourceNotFoundDetails { source, path }),
        )
    }

    pub fn action_not_found(
        action: impl Into<String>,
        source: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        let action = action.into();
        let source = source.into();
        Self::new(
            ErrorCode::ActionNotFound,
            format!("Action '{}' not found", action),
            to_details(ActionNotFoundDetails {
                action,
                source: source.clone(),
                available,
            }),
        )
        .with_hint(format!(
            "Run 'patchkit actions --source {}' to see available actions",
            source
        ))
    }

    pub fn catalog_parse(source: impl Into<String>, error: impl Into<String>) -> Self {
        let source = source.into();
        Self::new(
            ErrorCode::CatalogParseError,
            format!("Failed to parse action catalog from '{}'", source),
            to_details(CatalogParseDetails {
                source,
                error: error.into(),
            }),
        )
    }

    pub fn upstream(message: impl Into<String>, details: UpstreamDetails) -> Self {
        let mut err = Self::new(
            ErrorCode::UpstreamRequestFailed,
            message,
            to_details(details),
        );
        err.retryable = Some(true);
        err
    }

    pub fn ssh_connect_failed(details: SshConnectFailedDetails) -> Self {
        let message = format!(
            "Cannot connect to {}@{}:{}",
            details.user, details.host, details.port
        );
        let mut err = Self::new(ErrorCode::SshConnectFailed, message, to_details(details));
        err.retryable = Some(true);
        err
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::RemoteCommandFailed,
            format!("Remote command failed with exit code {}", details.exit_code),
            to_details(details),
        )
    }

    pub fn step_validation_failed(details: StepValidationDetails) -> Self {
        Self::new(
            ErrorCode::StepValidationFailed,
            format!(
                "Step '{}' failed validation. Expected: '{}', Got: '{}'",
                details.step, details.expected, details.actual
            ),
            to_details(details),
        )
    }

    pub fn run_stopped(step: usize) -> Self {
        Self::new(
            ErrorCode::RunStopped,
            format!("Stop requested before step {}", step),
            serde_json::json!({ "step": step }),
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::SourceResourceNotFound | ErrorCode::ActionNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_invalid_names_source_and_operation() {
        let err = Error::source_invalid("local", "fetch remote file");
        assert_eq!(err.code, ErrorCode::SourceInvalid);
        assert_eq!(err.code.as_str(), "source.invalid");
        assert_eq!(err.details["source"], "local");
        assert!(err.message.contains("fetch remote file"));
    }

    #[test]
    fn upstream_errors_are_retryable() {
        let err = Error::upstream(
            "Failed to download config/actions.yaml",
            UpstreamDetails {
                url: "https://example.invalid/x".to_string(),
                status: Some(404),
                revision: Some("main".to_string()),
                path: Some("config/actions.yaml".to_string()),
                body: None,
                error: None,
            },
        );
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.details["status"], 404);
        assert!(err.details.get("body").is_none());
    }

    #[test]
    fn action_not_found_carries_hint() {
        let err = Error::action_not_found("Reboot", "local", vec!["Check".to_string()]);
        assert!(err.is_not_found());
        assert_eq!(err.hints.len(), 1);
        assert!(err.hints[0].message.contains("--source local"));
    }
}
