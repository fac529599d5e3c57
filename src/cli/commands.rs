//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fmt::Write as _;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::Duration;

use goldcheck_syntax::ast::Fixture;
use goldcheck_syntax::parser::{extract_expectations, scan_directives};

use super::{CliError, CliResult, ExitCode, SharedArgs};
use crate::config::{ConfigError, RunnerConfig, discover_config_file, parse_assignment};
use crate::harness::conditions::{self, Applicability};
use crate::harness::exec::SystemExecutor;
use crate::harness::substitute::{self, SubstitutionContext};
use crate::harness::{self, Failure, Verdict, render_failure};

// ============================================================================
// Configuration
// ============================================================================

/// Build the effective configuration: defaults, then the config file, then flags.
pub fn load_config(shared: &SharedArgs) -> CliResult<RunnerConfig> {
    let mut config = match discover_config_file(shared.config.as_deref()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config file");
            RunnerConfig::load(&path).map_err(config_error)?
        }
        None => RunnerConfig::new(),
    };

    if let Some(prefix) = &shared.check_prefix {
        config = config.with_check_prefix(prefix.clone()).map_err(config_error)?;
    }
    for feature in &shared.features {
        config = config.with_feature(feature.clone());
    }
    for raw in &shared.params {
        let (key, value) = parse_assignment(raw).map_err(config_error)?;
        config = config.with_param(key, value);
    }
    for raw in &shared.substitutions {
        let (name, value) = parse_assignment(raw).map_err(config_error)?;
        config = config.with_substitution(name, value);
    }
    if let Some(command) = &shared.run_command {
        config = config.with_run_command(command.clone());
    }
    if let Some(secs) = shared.timeout {
        if secs == 0 {
            return Err(CliError::failure("Error: --timeout must be at least 1 second"));
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }

    Ok(config)
}

fn config_error(err: ConfigError) -> CliError {
    CliError::failure(format!("Error: {err}"))
}

// ============================================================================
// check
// ============================================================================

/// Run a single fixture and print its verdict.
pub fn check_fixture_file(path: &Path, config: &RunnerConfig) -> CliResult<ExitCode> {
    let report = harness::check_fixture(path, config, &SystemExecutor);
    let color = io::stderr().is_terminal();

    println!("{} {}", report.verdict.label(), path.display());
    match report.verdict {
        Verdict::Passed => Ok(ExitCode::SUCCESS),
        Verdict::Skipped(reason) => {
            println!("  {reason}");
            Ok(ExitCode::SUCCESS)
        }
        Verdict::XFailed { term, failure } => {
            println!("  expected failure (XFAIL: {term}): {failure}");
            Ok(ExitCode::SUCCESS)
        }
        Verdict::XPassed { term } => Err(CliError::failure(format!(
            "fixture passed but was expected to fail (XFAIL: {term})"
        ))),
        Verdict::Failed(failure) => Err(failure_error(&failure, color)),
    }
}

fn failure_error(failure: &Failure, color: bool) -> CliError {
    CliError::with_code(render_failure(failure, color).trim_end(), failure.exit_code())
}

// ============================================================================
// list
// ============================================================================

/// Print what the harness sees in a fixture, without running it.
pub fn list_fixture(path: &Path, config: &RunnerConfig) -> CliResult<ExitCode> {
    let fixture = harness::load_fixture(path).map_err(|f| failure_error(&f, io::stderr().is_terminal()))?;
    let (listing, problems) = render_listing(path, &fixture, config);
    print!("{listing}");
    if problems {
        Err(CliError::new("", ExitCode::FAILURE))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Render directives, applicability, the run plan and expectations of a fixture.
///
/// Returns the listing and whether any part of the fixture is malformed.
pub fn render_listing(path: &Path, fixture: &Fixture, config: &RunnerConfig) -> (String, bool) {
    let mut out = String::new();
    let mut problems = false;
    let _ = writeln!(out, "fixture: {}", fixture.name());

    let directives = match scan_directives(fixture) {
        Ok(directives) => directives,
        Err(err) => {
            let _ = writeln!(out, "directives: error: {err}");
            return (out, true);
        }
    };

    let _ = writeln!(out, "directives:");
    for directive in &directives.directives {
        let _ = writeln!(out, "  line {}: {}: {}", directive.line, directive.keyword(), directive.payload);
    }

    match conditions::applicability(&directives, config) {
        Applicability::Run => {
            let _ = writeln!(out, "applicability: run");
        }
        Applicability::Skip(reason) => {
            let _ = writeln!(out, "applicability: skip ({reason})");
        }
    }
    if let Some(term) = conditions::expected_failure(&directives, config) {
        let _ = writeln!(out, "expected failure: {term}");
    }

    let ctx = SubstitutionContext::for_fixture(path, &config.temp_root, &config.substitutions);
    let mut prefix = config.check_prefix.clone();
    match substitute::plan_runs(&directives, config, &ctx) {
        Ok(plan) => {
            let _ = writeln!(out, "plan:");
            for step in &plan.steps {
                let role = if step.checked { "checked" } else { "prep" };
                let _ = writeln!(out, "  [{role}] line {}: {}", step.line, step.command);
            }
            if let Some(selected) = plan.prefix {
                prefix = selected;
            }
        }
        Err(err) => {
            problems = true;
            let _ = writeln!(out, "plan: error: {err}");
        }
    }

    let _ = writeln!(out, "prefix: {prefix}");
    match extract_expectations(fixture, &prefix) {
        Ok(expectations) => {
            let _ = writeln!(out, "expectations:");
            for expectation in &expectations {
                let _ = writeln!(
                    out,
                    "  line {}: {}: {}",
                    expectation.line,
                    expectation.marker(&prefix),
                    expectation.text
                );
            }
        }
        Err(err) => {
            problems = true;
            let _ = writeln!(out, "expectations: error: {err}");
        }
    }

    (out, problems)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shared() -> SharedArgs {
        SharedArgs {
            config: Some("definitely/missing/goldcheck.toml".into()),
            ..SharedArgs::default()
        }
    }

    #[test]
    fn test_load_config_missing_explicit_file() {
        let err = load_config(&shared()).unwrap_err();
        assert!(err.message.contains("cannot read config file"), "{}", err.message);
    }

    #[test]
    fn test_load_config_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("goldcheck.toml");
        std::fs::write(&file, "check_prefix = \"FILE\"\nfeatures = [\"a\"]\n").unwrap();
        let args = SharedArgs {
            config: Some(file),
            check_prefix: Some("FLAG".into()),
            features: vec!["b".into()],
            params: vec!["OS=none-eabi".into()],
            substitutions: vec!["run=sh %s".into()],
            timeout: Some(3),
            ..SharedArgs::default()
        };
        let config = load_config(&args).unwrap();
        assert_eq!(config.check_prefix, "FLAG");
        assert!(config.features.contains("a") && config.features.contains("b"));
        assert_eq!(config.params["OS"], "none-eabi");
        assert_eq!(config.substitutions["run"], "sh %s");
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_load_config_rejects_bad_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("goldcheck.toml");
        std::fs::write(&file, "").unwrap();
        let args = SharedArgs {
            config: Some(file),
            params: vec!["OS".into()],
            ..SharedArgs::default()
        };
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_listing_reports_plan_error() {
        let fixture = Fixture::new("t.test", "// CHECK: x\n");
        let (listing, problems) = render_listing(Path::new("t.test"), &fixture, &RunnerConfig::new());
        assert!(problems);
        assert!(listing.contains("plan: error"), "{listing}");
        assert!(listing.contains("line 1: CHECK: x"), "{listing}");
    }
}
