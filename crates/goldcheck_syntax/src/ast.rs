//! Scanned fixture structure.

use goldcheck_core::lang::checks::{self, CheckKindId};
use goldcheck_core::lang::directives::{self, DirectiveId};

/// Byte range into a fixture's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fixture file: a name (usually its path) and its full text.
///
/// The text is immutable once the fixture is constructed; every scan borrows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    name: String,
    source: String,
}

/// One physical line of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first character of the line.
    pub offset: usize,
    /// Line text without the terminator (`\n` or `\r\n`).
    pub text: &'a str,
}

impl Fixture {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Iterate over the physical lines, keeping byte offsets so spans can point back into the source.
    pub fn lines(&self) -> impl Iterator<Item = SourceLine<'_>> {
        let mut offset = 0;
        self.source.split_inclusive('\n').enumerate().map(move |(idx, raw)| {
            let line = SourceLine {
                number: idx + 1,
                offset,
                text: raw.trim_end_matches('\n').trim_end_matches('\r'),
            };
            offset += raw.len();
            line
        })
    }
}

/// A `KEYWORD: payload` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub id: DirectiveId,
    /// Trimmed payload. For continued `RUN:` lines this is the joined payload.
    pub payload: String,
    /// Line of the keyword (the first line for continued directives).
    pub line: usize,
    /// Span of the keyword through the end of the first line's payload.
    pub span: Span,
}

impl Directive {
    pub fn keyword(&self) -> &'static str {
        directives::as_str(self.id)
    }
}

/// An expectation marker, e.g. `// CHECK: OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub kind: CheckKindId,
    /// Literal payload to look for in the output (trimmed).
    pub text: String,
    /// 1-based fixture line.
    pub line: usize,
    /// Span of the payload in the fixture.
    pub span: Span,
}

impl Expectation {
    /// Marker spelling for diagnostics, e.g. `CHECK-NEXT`.
    pub fn marker(&self, prefix: &str) -> String {
        checks::spelling(prefix, self.kind)
    }

    pub fn is_positive(&self) -> bool {
        checks::is_positive(self.kind)
    }
}

/// All directives of a fixture, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    pub directives: Vec<Directive>,
}

impl DirectiveSet {
    pub fn of_kind(&self, id: DirectiveId) -> impl Iterator<Item = &Directive> {
        self.directives.iter().filter(move |d| d.id == id)
    }

    pub fn runs(&self) -> impl Iterator<Item = &Directive> {
        self.of_kind(DirectiveId::Run)
    }

    /// Individual condition terms across every directive of `id` (comma-separated payloads, flattened).
    pub fn terms(&self, id: DirectiveId) -> Vec<&str> {
        self.of_kind(id)
            .flat_map(|d| d.payload.split(goldcheck_core::lang::conditions::TERM_SEPARATOR))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}
