//! Define the directive vocabulary recognized inside fixture comments.
//!
//! A directive is a `KEYWORD:` token followed by a payload, e.g. `// RUN: %target-run %s`. This module records the
//! canonical spellings and which directives continue onto the next line.
//!
//! ## Notes
//! - Lookup via [`from_str`] is **case-sensitive**: `run:` is not a directive.
//! - Expectation markers (`CHECK:` and friends) are not directives; their prefix is configurable and lives in
//!   [`crate::lang::checks`].
//!
//! ## Examples
//! ```rust
//! use goldcheck_core::lang::directives::{self, DirectiveId};
//!
//! assert_eq!(directives::from_str("REQUIRES"), Some(DirectiveId::Requires));
//! assert!(directives::continues(DirectiveId::Run));
//! ```

/// Stable identifier for every directive keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveId {
    /// Shell pipeline that builds and runs the fixture; a trailing checker stage is handled in-process.
    Run,
    /// Terms that must all hold, otherwise the fixture is skipped.
    Requires,
    /// Terms of which any one holding skips the fixture.
    Unsupported,
    /// Terms of which any one holding makes a mismatch the expected outcome.
    XFail,
}

/// Metadata for a directive.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveInfo {
    pub id: DirectiveId,
    pub canonical: &'static str,
    /// Whether a trailing `\` joins the payload with the next directive of the same kind.
    pub continues: bool,
}

/// Registry of all directives.
pub const DIRECTIVES: &[DirectiveInfo] = &[
    DirectiveInfo {
        id: DirectiveId::Run,
        canonical: "RUN",
        continues: true,
    },
    DirectiveInfo {
        id: DirectiveId::Requires,
        canonical: "REQUIRES",
        continues: false,
    },
    DirectiveInfo {
        id: DirectiveId::Unsupported,
        canonical: "UNSUPPORTED",
        continues: false,
    },
    DirectiveInfo {
        id: DirectiveId::XFail,
        canonical: "XFAIL",
        continues: false,
    },
];

/// Canonical spelling (without the trailing `:`).
pub fn as_str(id: DirectiveId) -> &'static str {
    info_for(id).canonical
}

/// Whether payloads of this directive may continue onto the next line with a trailing `\`.
pub fn continues(id: DirectiveId) -> bool {
    info_for(id).continues
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: DirectiveId) -> &'static DirectiveInfo {
    DIRECTIVES
        .iter()
        .find(|d| d.id == id)
        .expect("INVARIANT: every DirectiveId has a registry entry")
}

/// Lookup by spelling.
///
/// ## Returns
/// - `Some(DirectiveId)` if `s` is the canonical spelling of a directive.
/// - `None` otherwise.
pub fn from_str(s: &str) -> Option<DirectiveId> {
    DIRECTIVES.iter().find(|d| d.canonical == s).map(|d| d.id)
}
