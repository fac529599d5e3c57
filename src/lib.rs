#![forbid(unsafe_code)]
//! goldcheck: a golden-output test runner for compiler fixtures
//!
//! A fixture is a source file that carries, in its comments, the commands that build and run it (`RUN:`), the
//! conditions under which it applies (`REQUIRES:`, `UNSUPPORTED:`, `XFAIL:`) and the output it must print
//! (`CHECK:` lines). This crate extracts those, runs the program, and checks that the expected lines appear in
//! order in its stdout.
//!
//! Directive and marker scanning lives in `goldcheck_syntax`; the vocabulary registries live in `goldcheck_core`.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use `.expect("INVARIANT: reason")` with a
//!   clear explanation.

pub mod cli;
pub mod config;
pub mod harness;
pub mod version;

pub use config::RunnerConfig;
pub use harness::exec::{ExecutionResult, ProgramExecutor, SystemExecutor};
pub use harness::verify::{MatchOutcome, verify};
pub use harness::{FixtureReport, Verdict, check_fixture};
