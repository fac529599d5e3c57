//! Fixture scanner for goldcheck: directives, expectation markers, diagnostics.
//!
//! This crate reads fixture *text*. It never spawns processes or touches the filesystem, so the runner, the fuzz
//! target and editor tooling can all share it.
//!
//! ## Notes
//! - Vocabulary (directive keywords, marker suffixes) comes from `goldcheck_core::lang` registries.
//! - Errors are [`diagnostics::FixtureError`] values that render with source context through `miette`.
//!
//! ## Examples
//! ```rust
//! use goldcheck_syntax::ast::Fixture;
//! use goldcheck_syntax::parser;
//!
//! let fixture = Fixture::new("demo.swift", "print(\"OK\")\n// CHECK: OK\n");
//! let expectations = parser::extract_expectations(&fixture, "CHECK").unwrap();
//! assert_eq!(expectations[0].text, "OK");
//! ```

pub mod ast;
pub mod diagnostics;
pub mod parser;
