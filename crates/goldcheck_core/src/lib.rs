//! Provide the canonical fixture vocabulary for the goldcheck runner.
//!
//! Both the fixture scanner (`goldcheck_syntax`) and the runner (`goldcheck`) need to agree on how directives,
//! expectation markers, condition terms and `%` substitutions are spelled. This crate is the single source of truth for
//! those spellings.
//!
//! ## Notes
//!
//! - This is a vocabulary crate: **no IO**, no global state, no dependencies.
//! - Enforcement (what a well-formed directive looks like) lives in `goldcheck_syntax`; this crate only answers
//!   "what is this word".

pub mod lang;
