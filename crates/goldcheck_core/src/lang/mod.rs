//! Fixture vocabulary registries.
//!
//! Callers work with stable IDs (`DirectiveId`, `CheckKindId`, `SubstitutionId`) and look up spellings and behavior via
//! the registry tables, instead of scattering string literals across the scanner and runner.
//!
//! ## Examples
//! ```rust
//! use goldcheck_core::lang::directives::{self, DirectiveId};
//!
//! assert_eq!(directives::from_str("RUN"), Some(DirectiveId::Run));
//! assert_eq!(directives::as_str(DirectiveId::Run), "RUN");
//! ```

pub mod checks;
pub mod conditions;
pub mod directives;
pub mod substitutions;
