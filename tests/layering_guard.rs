//! Layering guardrails for the workspace crates.
//!
//! `goldcheck_core` is the shared vocabulary and must stay dependency-free. `goldcheck_syntax` only scans text, so it
//! must not pick up process, CLI, or configuration crates; those belong to the root `goldcheck` crate.

/// Dependency names listed in the `[dependencies]` table of a manifest.
fn main_dependencies(manifest: &str) -> Vec<String> {
    let mut in_dependencies = false;
    let mut names = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }
        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some((name, _)) = line_no_comment.split_once('=') {
            names.push(name.trim().to_string());
        }
    }
    names
}

#[test]
fn core_has_no_dependencies() {
    let deps = main_dependencies(include_str!("../crates/goldcheck_core/Cargo.toml"));
    assert!(deps.is_empty(), "goldcheck_core must not depend on anything, found {deps:?}");
}

#[test]
fn syntax_does_not_depend_on_runner_concerns() {
    let deps = main_dependencies(include_str!("../crates/goldcheck_syntax/Cargo.toml"));
    for forbidden in ["goldcheck", "clap", "serde", "serde_json", "toml", "tracing-subscriber"] {
        assert!(
            !deps.iter().any(|d| d == forbidden),
            "`{forbidden}` must not appear in goldcheck_syntax [dependencies]"
        );
    }
    assert!(deps.iter().any(|d| d == "goldcheck_core"));
}
