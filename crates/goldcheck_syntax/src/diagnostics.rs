//! Fixture errors with source context.
//!
//! Every variant is a [`MalformedFixture`](FixtureError) reason: there is nothing meaningful to run or verify.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::{Fixture, Span};

/// Why a fixture cannot be checked.
#[derive(Debug, Error, Diagnostic)]
pub enum FixtureError {
    #[error("no `{prefix}:` expectation markers found in {name}")]
    #[diagnostic(
        code(goldcheck::malformed::no_expectations),
        help("add at least one `// CHECK: <expected output>` line, or select another prefix with --check-prefix")
    )]
    NoExpectations { name: String, prefix: String },

    #[error("`{marker}:` on line {line} has nothing to match")]
    #[diagnostic(code(goldcheck::malformed::empty_expectation))]
    EmptyExpectation {
        marker: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("empty payload")]
        span: SourceSpan,
    },

    #[error("`{marker}:` on line {line} has no earlier match to follow")]
    #[diagnostic(
        code(goldcheck::malformed::leading_next),
        help("the first positive expectation must be a plain check")
    )]
    LeadingNext {
        marker: String,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("first positive expectation")]
        span: SourceSpan,
    },

    #[error("`{directive}:` on line {line} is empty")]
    #[diagnostic(code(goldcheck::malformed::empty_directive))]
    EmptyDirective {
        directive: &'static str,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("payload expected here")]
        span: SourceSpan,
    },

    #[error("`{directive}:` on line {line} ends with `\\` but no `{directive}:` line follows")]
    #[diagnostic(code(goldcheck::malformed::unterminated_continuation))]
    UnterminatedContinuation {
        directive: &'static str,
        line: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("continued here")]
        span: SourceSpan,
    },
}

/// Build the `miette` source handle for a fixture.
pub fn named_source(fixture: &Fixture) -> NamedSource<String> {
    NamedSource::new(fixture.name(), fixture.source().to_string())
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.len()).into()
    }
}
