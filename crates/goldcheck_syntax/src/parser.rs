//! Directive and expectation scanning.
//!
//! Fixtures are arbitrary source files in any language; directives and markers live in that language's comments.
//! Scanning is therefore purely textual:
//!
//! - A **directive** is `KEYWORD:` where everything before the keyword on its line is comment leader punctuation or
//!   whitespace (no letters or digits). `// RUN: ...`, `# REQUIRES: ...` and `; XFAIL: *` all qualify.
//! - An **expectation marker** is `PREFIX[-SUFFIX]:` anywhere on a line, as long as the prefix does not continue a
//!   longer word (`MYCHECK:` is not a `CHECK:` marker).
//!
//! Only the first marker on a line counts.

use goldcheck_core::lang::checks::{self, CheckKindId};
use goldcheck_core::lang::directives::{self, DirectiveId};

use crate::ast::{Directive, DirectiveSet, Expectation, Fixture, SourceLine, Span};
use crate::diagnostics::{FixtureError, named_source};

/// Marks a `RUN:` payload as continuing onto the next `RUN:` line.
const CONTINUATION: char = '\\';

/// Scan all directives of a fixture in source order.
///
/// ## Errors
/// - [`FixtureError::EmptyDirective`] for a condition directive with nothing after the `:`.
/// - [`FixtureError::UnterminatedContinuation`] when a continued `RUN:` is the last one in the file.
#[tracing::instrument(skip_all, fields(fixture = fixture.name()))]
pub fn scan_directives(fixture: &Fixture) -> Result<DirectiveSet, FixtureError> {
    let mut set = DirectiveSet::default();
    // A continued directive still collecting lines.
    let mut pending: Option<Directive> = None;

    for line in fixture.lines() {
        let Some((id, keyword_start, payload)) = find_directive(line.text) else {
            continue;
        };
        let span = Span::new(line.offset + keyword_start, line.offset + line.text.len());

        let (payload, continues) = split_continuation(id, payload);

        if let Some(mut open) = pending.take() {
            if open.id == id {
                join_payload(&mut open.payload, payload);
                if continues {
                    pending = Some(open);
                } else {
                    set.directives.push(open);
                }
                continue;
            }
            // A different directive interrupts the continuation.
            return Err(FixtureError::UnterminatedContinuation {
                directive: open.keyword(),
                line: open.line,
                src: named_source(fixture),
                span: open.span.into(),
            });
        }

        if payload.is_empty() && !continues {
            return Err(FixtureError::EmptyDirective {
                directive: directives::as_str(id),
                line: line.number,
                src: named_source(fixture),
                span: span.into(),
            });
        }

        let directive = Directive {
            id,
            payload: payload.to_string(),
            line: line.number,
            span,
        };
        if continues {
            pending = Some(directive);
        } else {
            set.directives.push(directive);
        }
    }

    if let Some(open) = pending {
        return Err(FixtureError::UnterminatedContinuation {
            directive: open.keyword(),
            line: open.line,
            src: named_source(fixture),
            span: open.span.into(),
        });
    }

    tracing::debug!(count = set.directives.len(), "scanned directives");
    Ok(set)
}

/// Extract the expectation markers for `prefix`, in source order.
///
/// ## Errors
/// - [`FixtureError::NoExpectations`] when the fixture has no marker for `prefix`.
/// - [`FixtureError::EmptyExpectation`] for a marker with an empty payload.
/// - [`FixtureError::LeadingNext`] when the first positive marker is a `-NEXT` marker.
#[tracing::instrument(skip_all, fields(fixture = fixture.name(), prefix = prefix))]
pub fn extract_expectations(fixture: &Fixture, prefix: &str) -> Result<Vec<Expectation>, FixtureError> {
    let mut expectations = Vec::new();

    for line in fixture.lines() {
        let Some((kind, text_start, text)) = find_marker(line.text, prefix) else {
            continue;
        };
        let span = Span::new(line.offset + text_start, line.offset + text_start + text.len());

        if text.is_empty() {
            return Err(FixtureError::EmptyExpectation {
                marker: checks::spelling(prefix, kind),
                line: line.number,
                src: named_source(fixture),
                span: marker_span(&line, text_start).into(),
            });
        }

        expectations.push(Expectation {
            kind,
            text: text.to_string(),
            line: line.number,
            span,
        });
    }

    if expectations.is_empty() {
        return Err(FixtureError::NoExpectations {
            name: fixture.name().to_string(),
            prefix: prefix.to_string(),
        });
    }

    if let Some(first) = expectations.iter().find(|e| e.is_positive()) {
        if first.kind == CheckKindId::Next {
            return Err(FixtureError::LeadingNext {
                marker: first.marker(prefix),
                line: first.line,
                src: named_source(fixture),
                span: first.span.into(),
            });
        }
    }

    tracing::debug!(count = expectations.len(), "extracted expectations");
    Ok(expectations)
}

/// Locate a directive keyword at the start of a comment line.
///
/// Returns the directive, the byte offset of the keyword, and the trimmed payload.
fn find_directive(text: &str) -> Option<(DirectiveId, usize, &str)> {
    let start = text.find(|c: char| c.is_alphanumeric())?;
    let rest = &text[start..];
    let colon = rest.find(':')?;
    let id = directives::from_str(&rest[..colon])?;
    Some((id, start, rest[colon + 1..].trim()))
}

/// Locate the first `PREFIX[-SUFFIX]:` marker on a line.
///
/// Returns the kind, the byte offset of the payload, and the trimmed payload.
fn find_marker<'a>(text: &'a str, prefix: &str) -> Option<(CheckKindId, usize, &'a str)> {
    if prefix.is_empty() {
        return None;
    }
    for (idx, _) in text.match_indices(prefix) {
        if text[..idx].chars().next_back().is_some_and(is_word_char) {
            continue;
        }
        let after = &text[idx + prefix.len()..];
        let Some(colon) = after.find(':') else {
            continue;
        };
        let Some(kind) = checks::from_suffix(&after[..colon]) else {
            continue;
        };
        let raw = &after[colon + 1..];
        let text_start = idx + prefix.len() + colon + 1 + (raw.len() - raw.trim_start().len());
        return Some((kind, text_start, raw.trim()));
    }
    None
}

/// Characters that extend a prefix into a different word.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Strip a trailing continuation marker, if the directive supports one.
fn split_continuation(id: DirectiveId, payload: &str) -> (&str, bool) {
    if !directives::continues(id) {
        return (payload, false);
    }
    match payload.strip_suffix(CONTINUATION) {
        Some(stripped) => (stripped.trim_end(), true),
        None => (payload, false),
    }
}

fn join_payload(into: &mut String, next: &str) {
    if next.is_empty() {
        return;
    }
    if !into.is_empty() {
        into.push(' ');
    }
    into.push_str(next);
}

/// Point at the `:` of an empty marker so the label has something to underline.
fn marker_span(line: &SourceLine<'_>, text_start: usize) -> Span {
    let colon = line.text[..text_start].rfind(':').unwrap_or(text_start);
    Span::new(line.offset + colon, line.offset + colon + 1)
}
