//! Runner configuration
//!
//! Values come from three layers, lowest precedence first:
//!
//! 1. [`RunnerConfig::default`]
//! 2. a `goldcheck.toml` file (see [`discover_config_file`])
//! 3. command-line flags, applied by the CLI through the `with_*` builders
//!
//! ## File format
//!
//! ```toml
//! check_prefix = "CHECK"
//! checker = "FileCheck"
//! extensions = ["swift"]
//! features = ["executable_test", "objc_interop"]
//! run_command = "swift %s"
//! timeout_secs = 60
//!
//! [params]
//! OS = "macosx"
//!
//! [substitutions]
//! target-run-simple-swift = "swiftc %s -o %t && %t"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use goldcheck_core::lang::checks::DEFAULT_PREFIX;
use goldcheck_core::lang::conditions::{OS_PARAM, PARAM_SEPARATOR};
use serde::Deserialize;
use thiserror::Error;

/// File name looked up in the working directory when no config path is given.
pub const CONFIG_FILE_NAME: &str = "goldcheck.toml";

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "GOLDCHECK_CONFIG";

/// Errors raised while assembling a [`RunnerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("expected NAME=VALUE, got '{0}'")]
    InvalidAssignment(String),

    #[error("check prefix '{0}' must be non-empty and contain only letters, digits, '_' or '-'")]
    InvalidPrefix(String),
}

/// Effective settings for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Expectation marker prefix (`CHECK` → `CHECK:`, `CHECK-NEXT:`, `CHECK-NOT:`)
    pub check_prefix: String,
    /// Name of the substitution that introduces the checker stage of a RUN pipeline
    pub checker: String,
    /// File extensions treated as fixtures during directory discovery
    pub extensions: Vec<String>,
    /// Enabled features, matched by `REQUIRES:` / `UNSUPPORTED:` / `XFAIL:` terms
    pub features: BTreeSet<String>,
    /// Target parameters, matched by `KEY=VALUE` terms
    pub params: BTreeMap<String, String>,
    /// User `%name` substitutions for RUN lines
    pub substitutions: BTreeMap<String, String>,
    /// Command used for fixtures without a RUN line (`%s` is the fixture path)
    pub run_command: Option<String>,
    /// Wall-clock bound per executed command
    pub timeout: Option<Duration>,
    /// Directory under which `%t` scratch paths are allocated
    pub temp_root: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let mut params = BTreeMap::new();
        params.insert(OS_PARAM.to_string(), env::consts::OS.to_string());
        Self {
            check_prefix: DEFAULT_PREFIX.to_string(),
            checker: "FileCheck".to_string(),
            extensions: vec!["swift".to_string(), "test".to_string(), "txt".to_string()],
            features: BTreeSet::new(),
            params,
            substitutions: BTreeMap::new(),
            run_command: None,
            timeout: None,
            temp_root: PathBuf::from("target/goldcheck"),
        }
    }
}

/// On-disk shape of `goldcheck.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub check_prefix: Option<String>,
    pub checker: Option<String>,
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub substitutions: BTreeMap<String, String>,
    pub run_command: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temp_root: Option<PathBuf>,
}

impl RunnerConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults overlaid with the given config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::parse_file(path, &text)?;
        Self::new().merge_file(file)
    }

    /// Parse config text; `path` is only used for error messages.
    pub fn parse_file(path: &Path, text: &str) -> Result<ConfigFile, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay a parsed config file. Maps and feature sets are extended; scalars are replaced.
    pub fn merge_file(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        if let Some(prefix) = file.check_prefix {
            self = self.with_check_prefix(prefix)?;
        }
        if let Some(checker) = file.checker {
            self.checker = checker;
        }
        if let Some(extensions) = file.extensions {
            self.extensions = extensions;
        }
        for feature in file.features {
            self = self.with_feature(feature);
        }
        self.params.extend(file.params);
        self.substitutions.extend(file.substitutions);
        if file.run_command.is_some() {
            self.run_command = file.run_command;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(root) = file.temp_root {
            self.temp_root = root;
        }
        Ok(self)
    }

    /// Set the expectation prefix
    pub fn with_check_prefix(mut self, prefix: impl Into<String>) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        if !is_valid_prefix(&prefix) {
            return Err(ConfigError::InvalidPrefix(prefix));
        }
        self.check_prefix = prefix;
        Ok(self)
    }

    /// Enable a feature
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        let feature = feature.into();
        let trimmed = feature.trim();
        if trimmed.is_empty() {
            tracing::warn!("ignoring empty feature name");
            return self;
        }
        self.features.insert(trimmed.to_string());
        self
    }

    /// Set a target parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Define a `%name` substitution
    pub fn with_substitution(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(name.into(), value.into());
        self
    }

    /// Set the command for fixtures without a RUN line
    pub fn with_run_command(mut self, command: impl Into<String>) -> Self {
        self.run_command = Some(command.into());
        self
    }

    /// Bound every executed command by a wall-clock timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether a path has one of the configured fixture extensions
    pub fn is_fixture_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// Find the config file to load.
///
/// Lookup order: the explicit path, then `$GOLDCHECK_CONFIG`, then `./goldcheck.toml` if it exists.
/// An explicit path or environment value is returned even if the file is missing, so loading reports it.
pub fn discover_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let local = Path::new(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local.to_path_buf());
    }
    None
}

/// Split a `NAME=VALUE` command-line assignment. The value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), ConfigError> {
    match raw.split_once(PARAM_SEPARATOR) {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => Err(ConfigError::InvalidAssignment(raw.to_string())),
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
