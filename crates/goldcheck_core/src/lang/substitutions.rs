//! Define the built-in `%` substitutions available in `RUN:` lines.
//!
//! User-defined substitutions (from configuration) share the same `%name` syntax; built-ins win on a name clash.
//!
//! ## Examples
//! ```rust
//! use goldcheck_core::lang::substitutions::{self, SubstitutionId};
//!
//! assert_eq!(substitutions::from_str("s"), Some(SubstitutionId::SourcePath));
//! assert_eq!(substitutions::from_str("S"), Some(SubstitutionId::SourceDir));
//! ```

/// Introduces a substitution token.
pub const SIGIL: char = '%';

/// Stable identifier for every built-in substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstitutionId {
    /// `%s`: path of the fixture being run.
    SourcePath,
    /// `%S`: directory containing the fixture.
    SourceDir,
    /// `%t`: scratch path unique to the fixture.
    TempPath,
    /// `%%`: a literal `%`.
    Percent,
}

/// Metadata for a built-in substitution.
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionInfo {
    pub id: SubstitutionId,
    /// Name without the leading sigil.
    pub name: &'static str,
}

/// Registry of all built-in substitutions.
pub const SUBSTITUTIONS: &[SubstitutionInfo] = &[
    SubstitutionInfo {
        id: SubstitutionId::SourcePath,
        name: "s",
    },
    SubstitutionInfo {
        id: SubstitutionId::SourceDir,
        name: "S",
    },
    SubstitutionInfo {
        id: SubstitutionId::TempPath,
        name: "t",
    },
    SubstitutionInfo {
        id: SubstitutionId::Percent,
        name: "%",
    },
];

/// Name (without sigil).
pub fn as_str(id: SubstitutionId) -> &'static str {
    info_for(id).name
}

/// Full metadata.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: SubstitutionId) -> &'static SubstitutionInfo {
    SUBSTITUTIONS
        .iter()
        .find(|s| s.id == id)
        .expect("INVARIANT: every SubstitutionId has a registry entry")
}

/// Lookup by name (without sigil). Case-sensitive: `s` and `S` differ.
pub fn from_str(s: &str) -> Option<SubstitutionId> {
    SUBSTITUTIONS.iter().find(|info| info.name == s).map(|info| info.id)
}
