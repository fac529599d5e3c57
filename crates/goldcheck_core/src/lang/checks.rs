//! Define the expectation-marker kinds.
//!
//! A marker is spelled `<PREFIX><SUFFIX>:` where the prefix is configurable (default [`DEFAULT_PREFIX`]) and the
//! suffix selects the kind: none for a plain ordered check, `-NEXT` for an adjacent-line check, `-NOT` for a negative
//! check.
//!
//! ## Examples
//! ```rust
//! use goldcheck_core::lang::checks::{self, CheckKindId};
//!
//! assert_eq!(checks::from_suffix(""), Some(CheckKindId::Check));
//! assert_eq!(checks::from_suffix("-NEXT"), Some(CheckKindId::Next));
//! assert_eq!(checks::spelling("CHECK", CheckKindId::Not), "CHECK-NOT");
//! ```

/// The prefix used when neither configuration nor the RUN line selects one.
pub const DEFAULT_PREFIX: &str = "CHECK";

/// Stable identifier for every marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKindId {
    /// Found on some line at or after the cursor.
    Check,
    /// Found on exactly the line at the cursor.
    Next,
    /// Absent from every line between the surrounding positive matches.
    Not,
}

/// Metadata for a marker kind.
#[derive(Debug, Clone, Copy)]
pub struct CheckKindInfo {
    pub id: CheckKindId,
    /// Appended to the prefix; empty for the plain kind.
    pub suffix: &'static str,
    /// Whether a match moves the cursor.
    pub positive: bool,
}

/// Registry of all marker kinds.
pub const CHECK_KINDS: &[CheckKindInfo] = &[
    CheckKindInfo {
        id: CheckKindId::Check,
        suffix: "",
        positive: true,
    },
    CheckKindInfo {
        id: CheckKindId::Next,
        suffix: "-NEXT",
        positive: true,
    },
    CheckKindInfo {
        id: CheckKindId::Not,
        suffix: "-NOT",
        positive: false,
    },
];

/// Suffix for a kind.
pub fn suffix(id: CheckKindId) -> &'static str {
    info_for(id).suffix
}

/// Whether the kind consumes an output line.
pub fn is_positive(id: CheckKindId) -> bool {
    info_for(id).positive
}

/// Full marker spelling for a prefix, without the trailing `:`.
pub fn spelling(prefix: &str, id: CheckKindId) -> String {
    format!("{prefix}{}", suffix(id))
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: CheckKindId) -> &'static CheckKindInfo {
    CHECK_KINDS
        .iter()
        .find(|c| c.id == id)
        .expect("INVARIANT: every CheckKindId has a registry entry")
}

/// Lookup by suffix (the text between the prefix and the `:`).
pub fn from_suffix(s: &str) -> Option<CheckKindId> {
    CHECK_KINDS.iter().find(|c| c.suffix == s).map(|c| c.id)
}
