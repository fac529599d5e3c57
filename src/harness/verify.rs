//! Ordered golden-output verification.
//!
//! [`verify`] walks the captured stdout once with a cursor:
//!
//! - a plain check matches the first line at or after the cursor that contains its text, then moves the cursor past
//!   that line (matches never overlap);
//! - a `-NEXT` check must match exactly the line at the cursor;
//! - a `-NOT` check forbids its text on every line between the surrounding positive matches.
//!
//! The process must also have exited cleanly; that is checked first.

use goldcheck_core::lang::checks::CheckKindId;
use goldcheck_syntax::ast::{Expectation, Fixture};
use goldcheck_syntax::diagnostics::named_source;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use super::exec::{ExecutionResult, ExitState};

/// Output lines of context shown after the scan position in a failure report.
const CONTEXT_LINES: usize = 3;

/// Result of comparing expectations against one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every expectation held. `positions[i]` is the output line the i-th positive expectation matched.
    Matched { positions: Vec<usize> },
    Failed(MatchFailure),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }
}

/// Why verification failed. Output positions are 0-based line indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFailure {
    /// The program did not exit cleanly.
    AbnormalExit { status: ExitState, command: Option<String> },
    /// No line at or after `cursor` contains the expectation.
    Unmatched {
        index: usize,
        expectation: Expectation,
        cursor: usize,
    },
    /// A `-NEXT` expectation was not on line `expected_at`.
    NotAdjacent {
        index: usize,
        expectation: Expectation,
        expected_at: usize,
        found_at: Option<usize>,
    },
    /// A `-NOT` expectation appeared on `found_at`.
    Forbidden {
        index: usize,
        expectation: Expectation,
        found_at: usize,
    },
}

impl MatchFailure {
    /// The expectation at fault, if the failure concerns one.
    pub fn expectation(&self) -> Option<&Expectation> {
        match self {
            MatchFailure::AbnormalExit { .. } => None,
            MatchFailure::Unmatched { expectation, .. }
            | MatchFailure::NotAdjacent { expectation, .. }
            | MatchFailure::Forbidden { expectation, .. } => Some(expectation),
        }
    }

    /// The output line the report should centre on.
    pub fn output_position(&self) -> Option<usize> {
        match self {
            MatchFailure::AbnormalExit { .. } => None,
            MatchFailure::Unmatched { cursor, .. } => Some(*cursor),
            MatchFailure::NotAdjacent { expected_at, .. } => Some(*expected_at),
            MatchFailure::Forbidden { found_at, .. } => Some(*found_at),
        }
    }

    /// One-line summary. Line numbers are 1-based for humans.
    pub fn summary(&self, prefix: &str) -> String {
        match self {
            MatchFailure::AbnormalExit { status, command } => match command {
                Some(cmd) => format!("'{cmd}' terminated abnormally ({status})"),
                None => format!("program terminated abnormally ({status})"),
            },
            MatchFailure::Unmatched {
                index,
                expectation,
                cursor,
            } => format!(
                "expectation #{} `{}: {}` (fixture line {}) not found in output from line {} onward",
                index + 1,
                expectation.marker(prefix),
                expectation.text,
                expectation.line,
                cursor + 1
            ),
            MatchFailure::NotAdjacent {
                index,
                expectation,
                expected_at,
                found_at,
            } => {
                let found = match found_at {
                    Some(line) => format!("; it first appears on output line {}", line + 1),
                    None => String::new(),
                };
                format!(
                    "expectation #{} `{}: {}` (fixture line {}) not on output line {}{}",
                    index + 1,
                    expectation.marker(prefix),
                    expectation.text,
                    expectation.line,
                    expected_at + 1,
                    found
                )
            }
            MatchFailure::Forbidden {
                index,
                expectation,
                found_at,
            } => format!(
                "expectation #{} `{}: {}` (fixture line {}) matched forbidden output line {}",
                index + 1,
                expectation.marker(prefix),
                expectation.text,
                expectation.line,
                found_at + 1
            ),
        }
    }

    /// Build a source-annotated diagnostic for the fixture.
    pub fn to_diagnostic(&self, fixture: &Fixture, prefix: &str, result: &ExecutionResult) -> MatchDiagnostic {
        MatchDiagnostic {
            failure: self.clone(),
            message: self.summary(prefix),
            src: named_source(fixture),
            span: self.expectation().map(|e| e.span.into()),
            help: output_context(result, self.output_position()),
        }
    }
}

/// `miette` rendering of a [`MatchFailure`].
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(goldcheck::mismatch))]
pub struct MatchDiagnostic {
    pub failure: MatchFailure,
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("expected here")]
    pub span: Option<SourceSpan>,
    #[help]
    pub help: Option<String>,
}

/// Compare expectations against an execution.
///
/// Pure: the same `(expectations, result)` always yields the same outcome.
#[tracing::instrument(skip_all, fields(expectations = expectations.len(), lines = result.stdout_lines.len()))]
pub fn verify(expectations: &[Expectation], result: &ExecutionResult) -> MatchOutcome {
    if !result.status.success() {
        return MatchOutcome::Failed(MatchFailure::AbnormalExit {
            status: result.status,
            command: None,
        });
    }

    let lines = &result.stdout_lines;
    let mut cursor = 0;
    let mut positions = Vec::new();
    // `-NOT` expectations waiting for the next positive match to close their window.
    let mut pending_nots: Vec<(usize, &Expectation)> = Vec::new();

    for (index, expectation) in expectations.iter().enumerate() {
        let found = match expectation.kind {
            CheckKindId::Not => {
                pending_nots.push((index, expectation));
                continue;
            }
            CheckKindId::Check => match find_from(lines, cursor, &expectation.text) {
                Some(at) => at,
                None => {
                    return MatchOutcome::Failed(MatchFailure::Unmatched {
                        index,
                        expectation: expectation.clone(),
                        cursor,
                    });
                }
            },
            CheckKindId::Next => {
                if lines.get(cursor).is_some_and(|line| line.contains(&expectation.text)) {
                    cursor
                } else {
                    return MatchOutcome::Failed(MatchFailure::NotAdjacent {
                        index,
                        expectation: expectation.clone(),
                        expected_at: cursor,
                        found_at: find_from(lines, cursor, &expectation.text),
                    });
                }
            }
        };

        if let Some(failure) = check_forbidden(lines, cursor, found, &pending_nots) {
            return MatchOutcome::Failed(failure);
        }
        pending_nots.clear();

        tracing::trace!(index, line = found, "matched");
        positions.push(found);
        cursor = found + 1;
    }

    if let Some(failure) = check_forbidden(lines, cursor, lines.len(), &pending_nots) {
        return MatchOutcome::Failed(failure);
    }

    MatchOutcome::Matched { positions }
}

fn find_from(lines: &[String], cursor: usize, needle: &str) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(cursor)
        .find(|(_, line)| line.contains(needle))
        .map(|(at, _)| at)
}

/// Check `-NOT` expectations over output lines `[from, to)`.
fn check_forbidden(lines: &[String], from: usize, to: usize, nots: &[(usize, &Expectation)]) -> Option<MatchFailure> {
    let window = lines.get(from..to.min(lines.len())).unwrap_or(&[]);
    for (index, expectation) in nots {
        if let Some(offset) = window.iter().position(|line| line.contains(&expectation.text)) {
            return Some(MatchFailure::Forbidden {
                index: *index,
                expectation: (*expectation).clone(),
                found_at: from + offset,
            });
        }
    }
    None
}

/// Render the output around `position` (or the tail, for whole-run failures).
fn output_context(result: &ExecutionResult, position: Option<usize>) -> Option<String> {
    let lines = &result.stdout_lines;
    let mut out = String::new();
    if lines.is_empty() {
        out.push_str("the program printed nothing to stdout");
    } else {
        let (start, end) = match position {
            Some(at) => (at.saturating_sub(1), (at + CONTEXT_LINES).min(lines.len())),
            None => (lines.len().saturating_sub(CONTEXT_LINES), lines.len()),
        };
        if start >= end {
            out.push_str(&format!(
                "output ended after {} line(s); last: {:?}",
                lines.len(),
                lines[lines.len() - 1]
            ));
        } else {
            out.push_str("output:");
            for (at, line) in lines.iter().enumerate().take(end).skip(start) {
                let marker = if Some(at) == position { '>' } else { ' ' };
                out.push_str(&format!("\n{marker} {:>4} | {line}", at + 1));
            }
        }
    }
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        out.push_str("\nstderr:\n");
        out.push_str(stderr);
    }
    Some(out)
}
