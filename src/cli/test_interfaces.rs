//! Test runner I/O boundary interfaces
//!
//! Discovery (filesystem scan) sits behind [`TestDiscovery`] and execution behind
//! [`crate::harness::exec::ProgramExecutor`], so the runner loop can be driven with canned inputs.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::RunnerConfig;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// Errors that occur while collecting fixtures
#[derive(Debug, Error)]
pub enum TestError {
    #[error("path '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("failed to read directory '{path}': {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// Find the fixtures to run under a path.
pub trait TestDiscovery {
    /// A file path is a single fixture (whatever its extension). A directory is walked recursively and filtered by
    /// the configured extensions. Results are sorted.
    fn discover_fixtures(&self, path: &Path, config: &RunnerConfig) -> Result<Vec<PathBuf>, TestError>;
}

/// Filesystem-based discovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTestDiscovery;

impl TestDiscovery for DefaultTestDiscovery {
    fn discover_fixtures(&self, path: &Path, config: &RunnerConfig) -> Result<Vec<PathBuf>, TestError> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }
        if !path.is_dir() {
            return Err(TestError::NotFound(path.to_path_buf()));
        }
        let mut files = Vec::new();
        walk(path, config, &mut files)?;
        files.sort();
        tracing::debug!(count = files.len(), root = %path.display(), "discovered fixtures");
        Ok(files)
    }
}

fn walk(dir: &Path, config: &RunnerConfig, files: &mut Vec<PathBuf>) -> Result<(), TestError> {
    let entries = fs::read_dir(dir).map_err(|source| TestError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let entry_path = entry.path();
        let name = entry_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        // `file_type` does not follow symlinks, so linked directories (and link cycles) are never entered.
        let file_type = entry.file_type().map_err(|source| TestError::ReadDir {
            path: entry_path.clone(),
            source,
        })?;
        if file_type.is_dir() {
            if !name.starts_with('.') && !SKIPPED_DIRS.contains(&name) {
                walk(&entry_path, config, files)?;
            }
        } else if file_type.is_symlink() && entry_path.is_dir() {
            tracing::debug!(path = %entry_path.display(), "not following directory symlink");
        } else if !name.starts_with('.') && config.is_fixture_path(&entry_path) {
            files.push(entry_path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_walks_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Interpreter")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("Interpreter/varargs.swift"), "// CHECK: OK\n").unwrap();
        fs::write(root.join("Interpreter/notes.md"), "# notes\n").unwrap();
        fs::write(root.join("a.test"), "// CHECK: a\n").unwrap();
        fs::write(root.join(".git/hidden.swift"), "").unwrap();
        fs::write(root.join("target/built.swift"), "").unwrap();

        let files = DefaultTestDiscovery
            .discover_fixtures(root, &RunnerConfig::default())
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["Interpreter/varargs.swift", "a.test"]);
    }

    #[test]
    fn test_single_file_is_taken_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fixture.unusual");
        fs::write(&file, "").unwrap();
        let files = DefaultTestDiscovery
            .discover_fixtures(&file, &RunnerConfig::default())
            .unwrap();
        assert_eq!(files, vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Interpreter")).unwrap();
        fs::write(root.join("Interpreter/varargs.swift"), "// CHECK: OK\n").unwrap();
        std::os::unix::fs::symlink(root, root.join("Interpreter/loop")).unwrap();

        let files = DefaultTestDiscovery
            .discover_fixtures(root, &RunnerConfig::default())
            .unwrap();
        assert_eq!(files, vec![root.join("Interpreter/varargs.swift")]);
    }

    #[test]
    fn test_missing_path() {
        let err = DefaultTestDiscovery
            .discover_fixtures(Path::new("no/such/dir"), &RunnerConfig::default())
            .unwrap_err();
        assert!(matches!(err, TestError::NotFound(_)));
    }
}
