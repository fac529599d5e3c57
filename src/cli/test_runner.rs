//! Fixture runner (pytest-style)
//!
//! ## TestReporter Trait
//!
//! The runner uses a `TestReporter` trait to separate reporting from
//! execution. Two reporters ship: [`ConsoleReporter`] (coloured, human) and
//! [`JsonReporter`] (one JSON object per line, for CI tooling).
//!
//! ## I/O Boundaries
//!
//! Discovery and execution are abstracted via traits (`test_interfaces.rs`
//! and [`ProgramExecutor`]) so the loop can be tested without touching the
//! filesystem or spawning processes.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use super::test_interfaces::TestDiscovery;
use super::{CliError, CliResult, ExitCode};
use crate::config::RunnerConfig;
use crate::harness::exec::ProgramExecutor;
use crate::harness::{self, FixtureReport, Verdict, render_failure};

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting fixture results.
pub trait TestReporter {
    /// Called once the fixture list is known (after filtering)
    fn on_collection_complete(&mut self, fixture_count: usize);

    /// Called before a fixture runs
    fn on_test_start(&mut self, _path: &Path) {}

    /// Called when a fixture has a verdict
    fn on_test_complete(&mut self, report: &FixtureReport);

    /// Called when all fixtures have completed
    fn on_run_complete(&mut self, summary: &TestSummary);
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub xfailed: usize,
    pub xpassed: usize,
    /// Highest per-fixture exit code seen (execution failures outrank mismatches)
    pub exit_code: i32,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl TestSummary {
    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Passed => self.passed += 1,
            Verdict::Failed(_) => self.failed += 1,
            Verdict::Skipped(_) => self.skipped += 1,
            Verdict::XFailed { .. } => self.xfailed += 1,
            Verdict::XPassed { .. } => self.xpassed += 1,
        }
        self.exit_code = self.exit_code.max(verdict.exit_code());
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.xpassed == 0
    }
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Options for `goldcheck test`
#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    pub verbose: bool,
    pub stop_on_fail: bool,
    pub filter: Option<String>,
}

// ============================================================================
// Console reporter
// ============================================================================

/// Default console reporter (pytest-style)
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
    pub color: bool,
    failures: Vec<(PathBuf, String)>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: io::stdout().is_terminal(),
            failures: Vec::new(),
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, fixture_count: usize) {
        println!("{}", self.paint("1", "=================== test session starts ==================="));
        println!("collected {} fixture(s)", fixture_count);
        println!();
    }

    fn on_test_complete(&mut self, report: &FixtureReport) {
        let status = match &report.verdict {
            Verdict::Passed => self.paint("32", "PASSED"),
            Verdict::Failed(failure) => {
                self.failures
                    .push((report.path.clone(), render_failure(failure, self.color)));
                self.paint("31", "FAILED")
            }
            Verdict::Skipped(reason) => format!("{} ({})", self.paint("33", "SKIPPED"), reason),
            Verdict::XFailed { term, .. } => format!("{} ({})", self.paint("33", "XFAIL"), term),
            Verdict::XPassed { term } => {
                self.failures.push((
                    report.path.clone(),
                    format!("fixture passed but was expected to fail (XFAIL: {term})"),
                ));
                self.paint("31", "XPASS")
            }
        };

        if self.verbose {
            println!("{} {} ({}ms)", report.path.display(), status, report.duration.as_millis());
        } else {
            println!("{} {}", report.path.display(), status);
        }
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        if !self.failures.is_empty() {
            println!();
            println!("{}", self.paint("1;31", "=================== FAILURES ==================="));
            for (path, message) in &self.failures {
                println!();
                println!("{}", self.paint("1", &format!("___________ {} ___________", path.display())));
                println!();
                println!("{}", message.trim_end());
            }
        }

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("{} passed", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped));
        }
        if summary.xfailed > 0 {
            parts.push(format!("{} xfailed", summary.xfailed));
        }
        if summary.xpassed > 0 {
            parts.push(format!("{} xpassed", summary.xpassed));
        }

        let color = if summary.is_success() { "1;32" } else { "1;31" };
        println!();
        println!(
            "{}",
            self.paint(
                color,
                &format!(
                    "=================== {} in {:.2}s ===================",
                    parts.join(", "),
                    summary.duration.as_secs_f64()
                )
            )
        );
    }
}

// ============================================================================
// JSON reporter
// ============================================================================

/// One JSON object per line: a `fixture` event per fixture, then a `summary` event.
pub struct JsonReporter<W: Write> {
    out: W,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Collected {
        count: usize,
    },
    Fixture {
        path: String,
        status: &'static str,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<&'static str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Summary(&'a TestSummary),
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: &JsonEvent<'_>) {
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(err) = written {
            tracing::warn!(%err, "failed to write JSON report");
        }
    }
}

impl<W: Write> TestReporter for JsonReporter<W> {
    fn on_collection_complete(&mut self, fixture_count: usize) {
        self.emit(&JsonEvent::Collected { count: fixture_count });
    }

    fn on_test_complete(&mut self, report: &FixtureReport) {
        let (kind, reason) = match &report.verdict {
            Verdict::Passed => (None, None),
            Verdict::Failed(failure) => (Some(failure.kind()), Some(failure.to_string())),
            Verdict::Skipped(reason) => (None, Some(reason.clone())),
            Verdict::XFailed { term, failure } => (Some(failure.kind()), Some(format!("XFAIL: {term}"))),
            Verdict::XPassed { term } => (None, Some(format!("XFAIL: {term}"))),
        };
        self.emit(&JsonEvent::Fixture {
            path: report.path.display().to_string(),
            status: report.verdict.label(),
            duration_ms: report.duration.as_millis() as u64,
            kind,
            reason,
        });
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        self.emit(&JsonEvent::Summary(summary));
    }
}

// ============================================================================
// Runner loop
// ============================================================================

/// Run every fixture under `path`.
///
/// Returns the aggregate exit code: 0 when nothing failed, otherwise the highest per-fixture code.
pub fn run_tests(
    path: &Path,
    options: &TestOptions,
    config: &RunnerConfig,
    discovery: &dyn TestDiscovery,
    executor: &dyn ProgramExecutor,
    reporter: &mut dyn TestReporter,
) -> CliResult<ExitCode> {
    let start_time = Instant::now();

    let files = discovery
        .discover_fixtures(path, config)
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;

    if files.is_empty() {
        return Err(CliError::failure(format!(
            "No fixtures found in '{}'\nFixtures are files with extension: {}",
            path.display(),
            config.extensions.join(", ")
        )));
    }

    let selected: Vec<PathBuf> = files
        .into_iter()
        .filter(|file| match &options.filter {
            Some(keyword) => file.to_string_lossy().contains(keyword.as_str()),
            None => true,
        })
        .collect();

    reporter.on_collection_complete(selected.len());
    if selected.is_empty() {
        // "no fixtures collected" is not a failure
        return Ok(ExitCode::SUCCESS);
    }

    let mut summary = TestSummary::default();
    for file in &selected {
        reporter.on_test_start(file);
        let report = harness::check_fixture(file, config, executor);
        summary.record(&report.verdict);
        reporter.on_test_complete(&report);

        if options.stop_on_fail && !report.verdict.is_success() {
            tracing::debug!(fixture = %file.display(), "stopping after first failure");
            break;
        }
    }
    summary.duration = start_time.elapsed();
    reporter.on_run_complete(&summary);

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        // Summary already printed
        Err(CliError::with_code("", summary.exit_code.max(1)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::test_interfaces::TestError;
    use crate::harness::exec::{ExecutionError, ExecutionResult, Invocation};

    /// Hands out a fixed file list.
    struct ListedDiscovery(Vec<PathBuf>);

    impl TestDiscovery for ListedDiscovery {
        fn discover_fixtures(&self, _path: &Path, _config: &RunnerConfig) -> Result<Vec<PathBuf>, TestError> {
            Ok(self.0.clone())
        }
    }

    /// Echo executor: "prints" whatever follows `echo ` in the command.
    struct EchoExecutor;

    impl ProgramExecutor for EchoExecutor {
        fn execute(&self, invocation: &Invocation) -> Result<ExecutionResult, ExecutionError> {
            if invocation.display.contains("missing-tool") {
                return Err(ExecutionError::NotLaunched {
                    command: invocation.display.clone(),
                    code: 127,
                    stderr: String::new(),
                });
            }
            let text = invocation.display.strip_prefix("echo ").unwrap_or("");
            Ok(ExecutionResult::succeeded(&text.replace("\\n", "\n")))
        }
    }

    /// Records labels instead of printing.
    #[derive(Default)]
    struct RecordingReporter {
        collected: Option<usize>,
        labels: Vec<&'static str>,
        summary: Option<TestSummary>,
    }

    impl TestReporter for RecordingReporter {
        fn on_collection_complete(&mut self, fixture_count: usize) {
            self.collected = Some(fixture_count);
        }

        fn on_test_complete(&mut self, report: &FixtureReport) {
            self.labels.push(report.verdict.label());
        }

        fn on_run_complete(&mut self, summary: &TestSummary) {
            self.summary = Some(summary.clone());
        }
    }

    fn write_fixtures(dir: &Path, fixtures: &[(&str, &str)]) -> Vec<PathBuf> {
        fixtures
            .iter()
            .map(|(name, body)| {
                let path = dir.join(name);
                std::fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    fn config(dir: &Path) -> RunnerConfig {
        let mut config = RunnerConfig::new();
        config.temp_root = dir.join("scratch");
        config
    }

    #[test]
    fn test_mixed_run_exit_code_prefers_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_fixtures(
            dir.path(),
            &[
                ("a_pass.test", "// RUN: echo OK\n// CHECK: OK\n"),
                ("b_mismatch.test", "// RUN: echo KO\n// CHECK: OK\n"),
                ("c_missing.test", "// RUN: missing-tool %s\n// CHECK: OK\n"),
                ("d_skip.test", "// REQUIRES: nope\n// RUN: echo OK\n// CHECK: OK\n"),
            ],
        );
        let mut reporter = RecordingReporter::default();
        let err = run_tests(
            dir.path(),
            &TestOptions::default(),
            &config(dir.path()),
            &ListedDiscovery(files),
            &EchoExecutor,
            &mut reporter,
        )
        .unwrap_err();

        assert_eq!(err.exit_code, ExitCode(2));
        assert_eq!(reporter.collected, Some(4));
        assert_eq!(reporter.labels, vec!["PASSED", "FAILED", "FAILED", "SKIPPED"]);
        let summary = reporter.summary.unwrap();
        assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 2, 1));
    }

    #[test]
    fn test_all_pass_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_fixtures(dir.path(), &[("ok.test", "// RUN: echo OK\\nOK\n// CHECK: OK\n// CHECK: OK\n")]);
        let mut reporter = RecordingReporter::default();
        let code = run_tests(
            dir.path(),
            &TestOptions::default(),
            &config(dir.path()),
            &ListedDiscovery(files),
            &EchoExecutor,
            &mut reporter,
        )
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(reporter.labels, vec!["PASSED"]);
    }

    #[test]
    fn test_stop_on_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_fixtures(
            dir.path(),
            &[
                ("a.test", "// RUN: echo KO\n// CHECK: OK\n"),
                ("b.test", "// RUN: echo OK\n// CHECK: OK\n"),
            ],
        );
        let options = TestOptions {
            stop_on_fail: true,
            ..TestOptions::default()
        };
        let mut reporter = RecordingReporter::default();
        let err = run_tests(
            dir.path(),
            &options,
            &config(dir.path()),
            &ListedDiscovery(files),
            &EchoExecutor,
            &mut reporter,
        )
        .unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert_eq!(reporter.labels, vec!["FAILED"]);
    }

    #[test]
    fn test_keyword_filter() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_fixtures(
            dir.path(),
            &[
                ("varargs.test", "// RUN: echo OK\n// CHECK: OK\n"),
                ("other.test", "// RUN: echo KO\n// CHECK: OK\n"),
            ],
        );
        let options = TestOptions {
            filter: Some("varargs".to_string()),
            ..TestOptions::default()
        };
        let mut reporter = RecordingReporter::default();
        run_tests(
            dir.path(),
            &options,
            &config(dir.path()),
            &ListedDiscovery(files),
            &EchoExecutor,
            &mut reporter,
        )
        .unwrap();
        assert_eq!(reporter.collected, Some(1));
    }

    #[test]
    fn test_no_fixtures_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = RecordingReporter::default();
        let err = run_tests(
            dir.path(),
            &TestOptions::default(),
            &config(dir.path()),
            &ListedDiscovery(Vec::new()),
            &EchoExecutor,
            &mut reporter,
        )
        .unwrap_err();
        assert!(err.message.contains("No fixtures found"));
    }

    #[test]
    fn test_json_reporter_lines() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_fixtures(
            dir.path(),
            &[
                ("a.test", "// RUN: echo OK\n// CHECK: OK\n"),
                ("b.test", "// RUN: echo KO\n// CHECK: OK\n"),
            ],
        );
        let mut reporter = JsonReporter::new(Vec::new());
        let _ = run_tests(
            dir.path(),
            &TestOptions::default(),
            &config(dir.path()),
            &ListedDiscovery(files),
            &EchoExecutor,
            &mut reporter,
        );
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let events: Vec<serde_json::Value> = output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0]["event"], "collected");
        assert_eq!(events[0]["count"], 2);
        assert_eq!(events[1]["status"], "PASSED");
        assert!(events[1].get("kind").is_none());
        assert_eq!(events[2]["status"], "FAILED");
        assert_eq!(events[2]["kind"], "mismatch");
        assert_eq!(events[3]["event"], "summary");
        assert_eq!(events[3]["failed"], 1);
        assert_eq!(events[3]["exit_code"], 1);
    }

    #[test]
    fn test_summary_exit_code_is_max() {
        let mut summary = TestSummary::default();
        summary.record(&Verdict::Passed);
        summary.record(&Verdict::XPassed { term: "*".into() });
        assert_eq!(summary.exit_code, 1);
        assert!(!summary.is_success());
    }
}
