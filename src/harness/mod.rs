//! Golden-output fixture harness.
//!
//! One fixture goes through a single linear pass:
//!
//! 1. read the fixture and scan its directives ([`goldcheck_syntax::parser::scan_directives`])
//! 2. evaluate `REQUIRES:` / `UNSUPPORTED:` ([`conditions`])
//! 3. plan the RUN commands ([`substitute`])
//! 4. extract the expectations for the selected prefix
//! 5. run every step ([`exec`]) and verify the checked one ([`verify`])
//! 6. map the outcome through `XFAIL:`
//!
//! Every failure is terminal for its fixture, and each fixture gets exactly one [`Verdict`].

pub mod conditions;
pub mod exec;
pub mod substitute;
pub mod verify;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use goldcheck_syntax::ast::{DirectiveSet, Fixture};
use goldcheck_syntax::diagnostics::FixtureError;
use goldcheck_syntax::parser::{extract_expectations, scan_directives};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};
use thiserror::Error;

use crate::config::RunnerConfig;
use conditions::Applicability;
use exec::{ExecutionError, Invocation, ProgramExecutor};
use substitute::{PlanError, SubstitutionContext};
use verify::{MatchDiagnostic, MatchFailure, MatchOutcome};

/// Maximum fixture size (10 MiB).
pub const MAX_SOURCE_SIZE: u64 = 10 * 1024 * 1024;

/// Process exit code for a run whose program could not be executed.
pub const EXECUTION_EXIT_CODE: i32 = 2;

/// Process exit code for malformed fixtures and mismatches.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// The single reason a fixture did not pass.
#[derive(Debug, Error, Diagnostic)]
pub enum Failure {
    #[error("cannot read fixture '{path}': {source}")]
    #[diagnostic(code(goldcheck::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fixture '{path}' is too large ({size} bytes, max {} bytes)", MAX_SOURCE_SIZE)]
    #[diagnostic(code(goldcheck::read))]
    TooLarge { path: PathBuf, size: u64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Malformed(#[from] FixtureError),

    #[error("malformed fixture: {0}")]
    #[diagnostic(code(goldcheck::malformed))]
    Plan(#[from] PlanError),

    #[error("cannot prepare scratch directory '{path}': {source}")]
    #[diagnostic(code(goldcheck::scratch))]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("RUN line {line}: {source}")]
    #[diagnostic(code(goldcheck::execution))]
    Execution {
        line: usize,
        #[source]
        source: ExecutionError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mismatch(MatchDiagnostic),
}

impl Failure {
    /// Exit code contributed by this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::Scratch { .. } | Failure::Execution { .. } => EXECUTION_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Read { .. } | Failure::TooLarge { .. } | Failure::Malformed(_) | Failure::Plan(_) => "malformed",
            Failure::Scratch { .. } | Failure::Execution { .. } => "execution",
            Failure::Mismatch(_) => "mismatch",
        }
    }

    /// The structured match failure, for mismatches.
    pub fn match_failure(&self) -> Option<&MatchFailure> {
        match self {
            Failure::Mismatch(diagnostic) => Some(&diagnostic.failure),
            _ => None,
        }
    }
}

/// Final status of one fixture.
#[derive(Debug)]
pub enum Verdict {
    Passed,
    Failed(Failure),
    Skipped(String),
    /// Failed as `XFAIL:` predicted. Carries the matching term.
    XFailed { term: String, failure: Failure },
    /// Passed although `XFAIL:` predicted a failure.
    XPassed { term: String },
}

impl Verdict {
    /// Whether the verdict counts towards a successful run.
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Passed | Verdict::Skipped(_) | Verdict::XFailed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Failed(failure) => failure.exit_code(),
            Verdict::XPassed { .. } => FAILURE_EXIT_CODE,
            _ => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Passed => "PASSED",
            Verdict::Failed(_) => "FAILED",
            Verdict::Skipped(_) => "SKIPPED",
            Verdict::XFailed { .. } => "XFAIL",
            Verdict::XPassed { .. } => "XPASS",
        }
    }
}

/// Verdict plus bookkeeping for one fixture.
#[derive(Debug)]
pub struct FixtureReport {
    pub path: PathBuf,
    pub verdict: Verdict,
    pub duration: Duration,
}

/// Read a fixture from disk.
pub fn load_fixture(path: &Path) -> Result<Fixture, Failure> {
    let metadata = fs::metadata(path).map_err(|source| Failure::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > MAX_SOURCE_SIZE {
        return Err(Failure::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
        });
    }
    let source = fs::read_to_string(path).map_err(|source| Failure::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Fixture::new(path.display().to_string(), source))
}

/// Check one fixture end to end.
#[tracing::instrument(skip_all, fields(fixture = %path.display()))]
pub fn check_fixture(path: &Path, config: &RunnerConfig, executor: &dyn ProgramExecutor) -> FixtureReport {
    let start = Instant::now();
    let verdict = match load_fixture(path) {
        Ok(fixture) => check_source(path, &fixture, config, executor),
        Err(failure) => Verdict::Failed(failure),
    };
    tracing::debug!(verdict = verdict.label(), "fixture finished");
    FixtureReport {
        path: path.to_path_buf(),
        verdict,
        duration: start.elapsed(),
    }
}

/// Check an already loaded fixture. `path` is what `%s` expands to.
pub fn check_source(path: &Path, fixture: &Fixture, config: &RunnerConfig, executor: &dyn ProgramExecutor) -> Verdict {
    let directives = match scan_directives(fixture) {
        Ok(directives) => directives,
        Err(err) => return Verdict::Failed(err.into()),
    };

    if let Applicability::Skip(reason) = conditions::applicability(&directives, config) {
        tracing::debug!(%reason, "skipping");
        return Verdict::Skipped(reason);
    }
    let xfail = conditions::expected_failure(&directives, config);

    let outcome = run_and_verify(path, fixture, &directives, config, executor);

    match (outcome, xfail) {
        (Ok(()), None) => Verdict::Passed,
        (Err(failure), None) => Verdict::Failed(failure),
        (Ok(()), Some(term)) => Verdict::XPassed { term: term.to_string() },
        (Err(failure @ Failure::Mismatch(_)), Some(term)) => Verdict::XFailed {
            term: term.to_string(),
            failure,
        },
        // Broken fixtures and broken toolchains are never "expected".
        (Err(failure), Some(_)) => Verdict::Failed(failure),
    }
}

fn run_and_verify(
    path: &Path,
    fixture: &Fixture,
    directives: &DirectiveSet,
    config: &RunnerConfig,
    executor: &dyn ProgramExecutor,
) -> Result<(), Failure> {
    let ctx = SubstitutionContext::for_fixture(path, &config.temp_root, &config.substitutions);
    let plan = substitute::plan_runs(directives, config, &ctx)?;
    let prefix = plan.prefix.as_deref().unwrap_or(&config.check_prefix);
    let expectations = extract_expectations(fixture, prefix)?;

    fs::create_dir_all(&config.temp_root).map_err(|source| Failure::Scratch {
        path: config.temp_root.clone(),
        source,
    })?;

    for step in &plan.steps {
        let invocation = Invocation::shell(&step.command).with_timeout(config.timeout);
        let result = executor
            .execute(&invocation)
            .map_err(|source| Failure::Execution { line: step.line, source })?;

        if step.checked {
            if let MatchOutcome::Failed(mut failure) = verify::verify(&expectations, &result) {
                if let MatchFailure::AbnormalExit { command, .. } = &mut failure {
                    *command = Some(step.command.clone());
                }
                return Err(Failure::Mismatch(failure.to_diagnostic(fixture, prefix, &result)));
            }
        } else if !result.status.success() {
            let failure = MatchFailure::AbnormalExit {
                status: result.status,
                command: Some(step.command.clone()),
            };
            return Err(Failure::Mismatch(failure.to_diagnostic(fixture, prefix, &result)));
        }
    }
    Ok(())
}

/// Render a failure with source context.
pub fn render_failure(failure: &Failure, color: bool) -> String {
    let theme = if color {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let mut out = String::new();
    if GraphicalReportHandler::new_themed(theme)
        .render_report(&mut out, failure)
        .is_err()
    {
        return failure.to_string();
    }
    out
}
