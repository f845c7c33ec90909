//! Step output validation.

use regex::Regex;

/// Decide whether a step's captured output satisfies its expected pattern.
///
/// An empty `expected` accepts anything. Otherwise both sides are trimmed and
/// `expected` is tried as a regular expression (unanchored search). A pattern
/// that does not compile falls back to exact comparison of the trimmed strings.
pub fn validate_output(actual: &str, expected: &str) -> bool {
    let expected = expected.trim();
    if expected.is_empty() {
        return true;
    }

    let actual = actual.trim();
    match Regex::new(expected) {
        Ok(re) => re.is_match(actual),
        Err(err) => {
            tracing::debug!(pattern = expected, error = %err, "expected pattern is not a regex, comparing literally");
            actual == expected
        }
    }
}

/// Same as [`validate_output`] for an optional pattern.
pub fn validate_step_output(actual: &str, expected: Option<&str>) -> bool {
    expected.is_none_or(|pattern| validate_output(actual, pattern))
}

/// A pattern that matches `text` literally once used as a step's `expected`.
///
/// `text` is trimmed first, like captured output. With `whole` the pattern is
/// anchored so the output must equal `text` rather than contain it.
pub fn literal_pattern(text: &str, whole: bool) -> String {
    let escaped = regex::escape(text.trim());
    if whole {
        format!("^{}$", escaped)
    } else {
        escaped
    }
}
