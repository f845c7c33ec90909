//! JSON envelope printed on stdout and the exit code for each error family.

use std::io::{self, Write};

use patchkit::error::Hint;
use patchkit::{Error, ErrorCode, Result};
use serde::Serialize;

/// `{"success": true, "data": ...}` or `{"success": false, "error": ...}`.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody<'a>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: &'a str,
    details: &'a serde_json::Value,
    #[serde(skip_serializing_if = "no_hints")]
    hints: &'a [Hint],
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

fn no_hints(hints: &&[Hint]) -> bool {
    hints.is_empty()
}

impl<'a> Envelope<'a> {
    fn new(result: &'a Result<serde_json::Value>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(ErrorBody {
                    code: err.code.as_str(),
                    message: &err.message,
                    details: &err.details,
                    hints: &err.hints,
                    retryable: err.retryable,
                }),
            },
        }
    }
}

/// Serialize a command's output, pairing it with the exit code it implies.
pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::SourceInvalid
        | ErrorCode::CatalogParseError => 2,

        ErrorCode::SourceResourceNotFound | ErrorCode::ActionNotFound => 4,

        ErrorCode::SshConnectFailed => 10,

        ErrorCode::RemoteCommandFailed => 20,
        ErrorCode::StepValidationFailed => 21,
        ErrorCode::RunStopped => 22,

        ErrorCode::UpstreamRequestFailed => 30,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

fn render(result: &Result<serde_json::Value>) -> Result<String> {
    serde_json::to_string_pretty(&Envelope::new(result))
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    let payload = render(&result)?;
    let mut out = io::stdout().lock();
    match writeln!(out, "{}", payload) {
        Ok(()) => Ok(()),
        // Reader went away (`| head`).
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(Error::internal_io(e.to_string(), Some("write stdout".to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_family() {
        assert_eq!(exit_code_for_error(ErrorCode::ActionNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::CatalogParseError), 2);
        assert_eq!(exit_code_for_error(ErrorCode::UpstreamRequestFailed), 30);
        assert_eq!(exit_code_for_error(ErrorCode::SshConnectFailed), 10);
        assert_eq!(exit_code_for_error(ErrorCode::RemoteCommandFailed), 20);
        assert_eq!(exit_code_for_error(ErrorCode::StepValidationFailed), 21);
        assert_eq!(exit_code_for_error(ErrorCode::RunStopped), 22);
        assert_eq!(exit_code_for_error(ErrorCode::InternalIoError), 1);
    }

    #[test]
    fn error_result_maps_to_error_envelope() {
        let (result, code) = map_cmd_result_to_json::<()>(Err(Error::source_invalid(
            "local",
            "fetch a remote file",
        )));
        assert_eq!(code, 2);

        let json: serde_json::Value = serde_json::from_str(&render(&result).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "source.invalid");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn success_envelope_carries_data_only() {
        let (result, code) = map_cmd_result_to_json(Ok((vec!["local"], 0)));
        assert_eq!(code, 0);

        let json: serde_json::Value = serde_json::from_str(&render(&result).unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0], "local");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_run_reports_failure_and_matching_exit_code() {
        let err = Error::run_stopped(2);
        let (result, code) = map_cmd_result_to_json::<()>(Err(err));
        assert_eq!(code, 22);

        let json: serde_json::Value = serde_json::from_str(&render(&result).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "run.stopped");
    }
}
