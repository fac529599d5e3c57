//! Spellings used inside `REQUIRES:` / `UNSUPPORTED:` / `XFAIL:` payloads.
//!
//! A payload is a list of terms separated by [`TERM_SEPARATOR`]. Each term is one of:
//! - `feature`: holds when the feature is enabled,
//! - `KEY=VALUE`: holds when target parameter `KEY` equals `VALUE`,
//! - [`WILDCARD`]: always holds,
//! - [`NEGATION`]`term`: holds when `term` does not.

/// Separates terms inside a condition payload.
pub const TERM_SEPARATOR: char = ',';

/// Separates a parameter name from the value it is compared with.
pub const PARAM_SEPARATOR: char = '=';

/// Negates the term it prefixes.
pub const NEGATION: char = '!';

/// A term that always holds.
pub const WILDCARD: &str = "*";

/// Target parameter every configuration defines (the host operating system unless overridden).
pub const OS_PARAM: &str = "OS";
