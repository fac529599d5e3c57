//! `REQUIRES:` / `UNSUPPORTED:` / `XFAIL:` evaluation against a [`RunnerConfig`].

use goldcheck_core::lang::conditions::{NEGATION, PARAM_SEPARATOR, WILDCARD};
use goldcheck_core::lang::directives::DirectiveId;
use goldcheck_syntax::ast::DirectiveSet;

use crate::config::RunnerConfig;

/// Whether a fixture should run under the current configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    Run,
    Skip(String),
}

/// Evaluate a single condition term.
pub fn evaluate_term(term: &str, config: &RunnerConfig) -> bool {
    let term = term.trim();
    if let Some(inner) = term.strip_prefix(NEGATION) {
        return !evaluate_term(inner, config);
    }
    if term == WILDCARD {
        return true;
    }
    match term.split_once(PARAM_SEPARATOR) {
        Some((key, value)) => config
            .params
            .get(key.trim())
            .is_some_and(|actual| actual == value.trim()),
        None => config.features.contains(term),
    }
}

/// Decide whether the fixture runs.
///
/// Every `REQUIRES:` term must hold, and no `UNSUPPORTED:` term may hold.
pub fn applicability(directives: &DirectiveSet, config: &RunnerConfig) -> Applicability {
    let missing: Vec<&str> = directives
        .terms(DirectiveId::Requires)
        .into_iter()
        .filter(|term| !evaluate_term(term, config))
        .collect();
    if !missing.is_empty() {
        return Applicability::Skip(format!("missing requirement(s): {}", missing.join(", ")));
    }

    if let Some(term) = directives
        .terms(DirectiveId::Unsupported)
        .into_iter()
        .find(|term| evaluate_term(term, config))
    {
        return Applicability::Skip(format!("unsupported: {term}"));
    }

    Applicability::Run
}

/// The `XFAIL:` term that holds, if any.
pub fn expected_failure<'a>(directives: &'a DirectiveSet, config: &RunnerConfig) -> Option<&'a str> {
    directives
        .terms(DirectiveId::XFail)
        .into_iter()
        .find(|term| evaluate_term(term, config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use goldcheck_syntax::ast::Fixture;
    use goldcheck_syntax::parser::scan_directives;

    fn directives(source: &str) -> DirectiveSet {
        scan_directives(&Fixture::new("t.swift", source)).unwrap()
    }

    fn config() -> RunnerConfig {
        RunnerConfig::new().with_param("OS", "macosx")
    }

    #[test]
    fn test_feature_term() {
        let config = config().with_feature("objc_interop");
        assert!(evaluate_term("objc_interop", &config));
        assert!(!evaluate_term("executable_test", &config));
    }

    #[test]
    fn test_param_term() {
        let config = config();
        assert!(evaluate_term("OS=macosx", &config));
        assert!(!evaluate_term("OS=none-eabi", &config));
        assert!(!evaluate_term("CPU=arm64", &config));
    }

    #[test]
    fn test_wildcard_and_negation() {
        let config = config();
        assert!(evaluate_term("*", &config));
        assert!(!evaluate_term("!*", &config));
        assert!(evaluate_term("!OS=none-eabi", &config));
        assert!(evaluate_term("!!OS=macosx", &config));
    }

    #[test]
    fn test_requires_missing_feature_skips() {
        let set = directives("// REQUIRES: executable_test\n// REQUIRES: objc_interop\n");
        let config = config().with_feature("executable_test");
        match applicability(&set, &config) {
            Applicability::Skip(reason) => assert!(reason.contains("objc_interop"), "{reason}"),
            Applicability::Run => panic!("expected skip"),
        }
    }

    #[test]
    fn test_requires_satisfied_runs() {
        let set = directives("// REQUIRES: executable_test, objc_interop\n");
        let config = config().with_feature("executable_test").with_feature("objc_interop");
        assert_eq!(applicability(&set, &config), Applicability::Run);
    }

    #[test]
    fn test_unsupported_os_skips() {
        let set = directives("// UNSUPPORTED: OS=none-eabi\n");
        assert_eq!(applicability(&set, &config()), Applicability::Run);

        let embedded = config().with_param("OS", "none-eabi");
        assert_eq!(
            applicability(&set, &embedded),
            Applicability::Skip("unsupported: OS=none-eabi".to_string())
        );
    }

    #[test]
    fn test_no_conditions_runs() {
        assert_eq!(applicability(&directives("// RUN: true\n"), &config()), Applicability::Run);
    }

    #[test]
    fn test_xfail() {
        assert_eq!(expected_failure(&directives("// XFAIL: *\n"), &config()), Some("*"));
        assert_eq!(expected_failure(&directives("// XFAIL: OS=linux\n"), &config()), None);
        assert_eq!(expected_failure(&directives("// RUN: true\n"), &config()), None);
    }
}
