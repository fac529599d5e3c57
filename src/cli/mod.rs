//! CLI module for the goldcheck fixture runner
//!
//! This module provides the command-line interface for the harness.
//!
//! ## Commands
//!
//! - `check <fixture>` - Run one fixture
//! - `test [path]` - Run every fixture under a path (pytest-style)
//! - `list <fixture>` - Show the parsed directives, run plan and expectations
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `test_runner` - Fixture loop and reporters
//! - `test_interfaces` - Discovery boundary
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::harness::exec::SystemExecutor;
use crate::harness::{EXECUTION_EXIT_CODE, FAILURE_EXIT_CODE};
use crate::version::GOLDCHECK_VERSION;
use test_interfaces::DefaultTestDiscovery;
use test_runner::{ConsoleReporter, JsonReporter, TestOptions, TestReporter};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    /// Mismatch, malformed fixture, or bad usage.
    pub const FAILURE: ExitCode = ExitCode(FAILURE_EXIT_CODE);
    /// The program under test could not be executed.
    pub const EXECUTION: ExitCode = ExitCode(EXECUTION_EXIT_CODE);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Create an error with a custom exit code.
    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self::new(message, ExitCode(code))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Golden-output test runner for compiler fixtures
#[derive(Parser, Debug)]
#[command(name = "goldcheck")]
#[command(version = GOLDCHECK_VERSION)]
#[command(about = "Run fixtures and check their output against embedded CHECK lines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct SharedArgs {
    /// Config file (default: $GOLDCHECK_CONFIG, then ./goldcheck.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Expectation prefix (default: CHECK)
    #[arg(long = "check-prefix", value_name = "PREFIX")]
    pub check_prefix: Option<String>,

    /// Enable a feature for REQUIRES/UNSUPPORTED/XFAIL (repeatable)
    #[arg(long = "feature", value_name = "NAME")]
    pub features: Vec<String>,

    /// Set a target parameter, e.g. OS=none-eabi (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Define a %NAME substitution for RUN lines (repeatable)
    #[arg(long = "subst", value_name = "NAME=VALUE")]
    pub substitutions: Vec<String>,

    /// Kill a RUN command after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Command for fixtures without a RUN line (%s is the fixture)
    #[arg(long = "run-command", value_name = "CMD")]
    pub run_command: Option<String>,
}

/// Report format for `goldcheck test`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single fixture
    Check {
        /// Fixture file
        #[arg(value_name = "FIXTURE")]
        fixture: PathBuf,
        #[command(flatten)]
        shared: SharedArgs,
    },

    /// Run every fixture under a path (pytest-style)
    Test {
        /// Fixture file or directory
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Only run fixtures whose path contains this keyword
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
        format: OutputFormat,
        #[command(flatten)]
        shared: SharedArgs,
    },

    /// Show how a fixture is interpreted, without running it (debug)
    List {
        /// Fixture file
        #[arg(value_name = "FIXTURE")]
        fixture: PathBuf,
        #[command(flatten)]
        shared: SharedArgs,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit 1 like every other failure; help and version exit 0.
            let _ = e.print();
            let code = if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            process::exit(code.0);
        }
    };

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Check { fixture, shared } => {
            let config = commands::load_config(&shared)?;
            commands::check_fixture_file(&fixture, &config)
        }
        Command::Test {
            path,
            verbose,
            stop_on_fail,
            filter,
            format,
            shared,
        } => {
            let config = commands::load_config(&shared)?;
            let options = TestOptions {
                verbose,
                stop_on_fail,
                filter,
            };
            let mut reporter: Box<dyn TestReporter> = match format {
                OutputFormat::Console => Box::new(ConsoleReporter::new(verbose)),
                OutputFormat::Json => Box::new(JsonReporter::stdout()),
            };
            test_runner::run_tests(
                &path,
                &options,
                &config,
                &DefaultTestDiscovery,
                &SystemExecutor,
                reporter.as_mut(),
            )
        }
        Command::List { fixture, shared } => {
            let config = commands::load_config(&shared)?;
            commands::list_fixture(&fixture, &config)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
