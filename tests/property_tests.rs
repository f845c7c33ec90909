//! Property-based tests for output validation, cache keys and source selectors.

use proptest::prelude::*;

use patchkit::cache::key_for;
use patchkit::repo::RepoIdentity;
use patchkit::source::SourceSelector;
use patchkit::validate::{literal_pattern, validate_output};

// =============================================================================
// Output validation
// =============================================================================

proptest! {
    /// Blank expectations accept any output
    #[test]
    fn blank_expected_accepts_anything(actual in ".*", blank in "[ \t\n]{0,4}") {
        prop_assert!(validate_output(&actual, &blank));
    }

    /// An escaped copy of the trimmed output always matches
    #[test]
    fn escaped_output_matches_itself(actual in "[ -~]{1,40}") {
        prop_assume!(!actual.trim().is_empty());
        let pattern = literal_pattern(&actual, false);
        let padded = format!("  {}\n", actual);
        prop_assert!(validate_output(&padded, &pattern));
    }

    /// An anchored literal pattern matches only the same trimmed text
    #[test]
    fn exact_literal_matches_only_itself(actual in "[ -~]{0,40}", other in "[ -~]{0,40}") {
        let pattern = literal_pattern(&actual, true);
        prop_assert!(validate_output(&actual, &pattern));
        prop_assert_eq!(validate_output(&other, &pattern), other.trim() == actual.trim());
    }

    /// Patterns that are not valid regexes compare trimmed strings exactly
    #[test]
    fn invalid_regex_falls_back_to_equality(body in "[a-z]{0,8}", other in "[a-z(]{0,9}") {
        let pattern = format!("({}", body);
        let padded = format!("\t{} ", pattern);
        prop_assert!(validate_output(&padded, &pattern));
        prop_assert_eq!(validate_output(&other, &pattern), other == pattern);
    }

    /// Regex search is unanchored
    #[test]
    fn pattern_found_inside_output(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}") {
        let output = format!("{}READY{}", prefix, suffix);
        prop_assert!(validate_output(&output, "READY"));
    }
}

// =============================================================================
// Cache keys
// =============================================================================

proptest! {
    /// Keys are 64 lowercase hex characters and depend only on the URL
    #[test]
    fn cache_key_is_stable_hex(url in "https://[a-z]{1,10}\\.test/[a-z0-9/._-]{0,40}") {
        let key = key_for(&url);
        prop_assert_eq!(key.len(), 64);
        prop_assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(key, key_for(&url));
    }
}

// =============================================================================
// Source selectors
// =============================================================================

fn ident() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,15}"
}

proptest! {
    /// owner/name@rev and "[owner/name] rev" resolve to the same source
    #[test]
    fn selector_forms_agree(owner in ident(), name in ident(), rev in ident()) {
        prop_assume!(rev != "local");
        let default_repo = RepoIdentity::default_repo();

        let at_form = SourceSelector::parse(&format!("{}/{}@{}", owner, name, rev), &default_repo).unwrap();
        let bracket_form = SourceSelector::parse(&format!("[{}/{}] {}", owner, name, rev), &default_repo).unwrap();

        prop_assert_eq!(&at_form, &bracket_form);
        prop_assert_eq!(at_form.identifier(), format!("{}/{}@{}", owner, name, rev));
    }

    /// Bare revisions resolve against the default repository
    #[test]
    fn bare_revision_uses_default_repo(rev in ident()) {
        prop_assume!(rev != "local");
        let default_repo = RepoIdentity::new("acme", "fixes");
        let selector = SourceSelector::parse(&rev, &default_repo).unwrap();
        prop_assert_eq!(selector.identifier(), format!("acme/fixes@{}", rev));
    }
}
