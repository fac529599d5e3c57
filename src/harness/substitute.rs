//! RUN-line planning: checker-stage removal and `%name` substitution.
//!
//! A fixture's RUN lines become a [`RunPlan`]: an ordered list of shell commands, exactly one of which produces the
//! output that is verified. The checker stage (`| %FileCheck %s ...`) is stripped from that command because
//! verification happens in-process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use goldcheck_core::lang::substitutions::{self, SIGIL, SubstitutionId, SUBSTITUTIONS};
use goldcheck_syntax::ast::DirectiveSet;
use thiserror::Error;

use crate::config::RunnerConfig;

/// Flag spellings that select the expectation prefix inside a checker stage.
const PREFIX_FLAGS: &[&str] = &["--check-prefix", "-check-prefix"];

/// Why a fixture's RUN lines cannot be turned into a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("RUN lines {first} and {second} both pipe into the checker; only one output can be verified")]
    MultipleCheckedRuns { first: usize, second: usize },

    #[error("fixture has no RUN line and no default run command is configured")]
    NoRunCommand,

    #[error("RUN line {line} has a checker stage but no command producing output")]
    CheckerOnly { line: usize },

    #[error("RUN line {line}: '{flag}' needs a prefix")]
    MissingPrefixValue { line: usize, flag: String },
}

/// Values for the built-in substitutions of one fixture.
#[derive(Debug, Clone)]
pub struct SubstitutionContext<'a> {
    pub source: PathBuf,
    pub source_dir: PathBuf,
    pub temp: PathBuf,
    pub user: &'a BTreeMap<String, String>,
}

impl<'a> SubstitutionContext<'a> {
    /// Context for `fixture`, with `%t` allocated under `temp_root`.
    pub fn for_fixture(fixture: &Path, temp_root: &Path, user: &'a BTreeMap<String, String>) -> Self {
        let source_dir = match fixture.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            source: fixture.to_path_buf(),
            source_dir,
            temp: temp_root.join(format!("{}.tmp", sanitize(fixture))),
            user,
        }
    }

    fn builtin(&self, id: SubstitutionId) -> String {
        match id {
            SubstitutionId::SourcePath => shell_word(&self.source),
            SubstitutionId::SourceDir => shell_word(&self.source_dir),
            SubstitutionId::TempPath => shell_word(&self.temp),
            SubstitutionId::Percent => SIGIL.to_string(),
        }
    }
}

/// One command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStep {
    /// Fully substituted shell command.
    pub command: String,
    /// Whether this step's stdout is verified.
    pub checked: bool,
    /// Fixture line of the RUN directive (0 for the configured default command).
    pub line: usize,
}

/// The commands for a fixture, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub steps: Vec<RunStep>,
    /// Prefix selected by the checker stage, overriding the configured one.
    pub prefix: Option<String>,
}

impl RunPlan {
    pub fn checked_step(&self) -> Option<&RunStep> {
        self.steps.iter().find(|step| step.checked)
    }
}

/// Build the run plan for a fixture.
///
/// ## Errors
/// See [`PlanError`].
pub fn plan_runs(
    directives: &DirectiveSet,
    config: &RunnerConfig,
    ctx: &SubstitutionContext<'_>,
) -> Result<RunPlan, PlanError> {
    let mut steps = Vec::new();
    let mut prefix = None;
    let mut checked_line: Option<usize> = None;

    for run in directives.runs() {
        let (command, checker) = match split_checker_stage(&run.payload, &config.checker) {
            Some((lhs, stage)) => (lhs, Some(stage)),
            None => (run.payload.as_str(), None),
        };

        let checked = match checker {
            Some(stage) => {
                if let Some(first) = checked_line {
                    return Err(PlanError::MultipleCheckedRuns {
                        first,
                        second: run.line,
                    });
                }
                if command.is_empty() {
                    return Err(PlanError::CheckerOnly { line: run.line });
                }
                checked_line = Some(run.line);
                prefix = check_prefix_of(stage, run.line)?;
                true
            }
            None => false,
        };

        steps.push(RunStep {
            command: expand(command, ctx),
            checked,
            line: run.line,
        });
    }

    if steps.is_empty() {
        let Some(default) = &config.run_command else {
            return Err(PlanError::NoRunCommand);
        };
        steps.push(RunStep {
            command: expand(default, ctx),
            checked: true,
            line: 0,
        });
    } else if checked_line.is_none() {
        if let Some(last) = steps.last_mut() {
            last.checked = true;
        }
    }

    tracing::debug!(steps = steps.len(), prefix = ?prefix, "planned runs");
    Ok(RunPlan { steps, prefix })
}

/// Replace `%name` tokens. At each sigil the longest matching name wins; built-ins shadow user names. User values
/// may themselves use built-ins. Unknown `%` sequences are left as written.
pub fn expand(command: &str, ctx: &SubstitutionContext<'_>) -> String {
    expand_with(command, ctx, true)
}

fn expand_with(command: &str, ctx: &SubstitutionContext<'_>, allow_user: bool) -> String {
    let mut names: Vec<(&str, Option<SubstitutionId>)> = SUBSTITUTIONS.iter().map(|s| (s.name, Some(s.id))).collect();
    if allow_user {
        names.extend(
            ctx.user
                .keys()
                .filter(|name| !name.is_empty() && substitutions::from_str(name).is_none())
                .map(|name| (name.as_str(), None)),
        );
    }
    // Longest first, so `%target-run` is not read as `%t` followed by `arget-run`.
    names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = String::with_capacity(command.len());
    let mut rest = command;
    while let Some(at) = rest.find(SIGIL) {
        out.push_str(&rest[..at]);
        let after = &rest[at + SIGIL.len_utf8()..];
        match names.iter().find(|(name, _)| after.starts_with(name)) {
            Some((name, Some(id))) => {
                out.push_str(&ctx.builtin(*id));
                rest = &after[name.len()..];
            }
            Some((name, None)) => {
                let value = ctx.user.get(*name).map(String::as_str).unwrap_or_default();
                out.push_str(&expand_with(value, ctx, false));
                rest = &after[name.len()..];
            }
            None => {
                out.push(SIGIL);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Split off a final `| %checker ...` stage. Returns the producing command and the stage, both trimmed.
pub fn split_checker_stage<'a>(command: &'a str, checker: &str) -> Option<(&'a str, &'a str)> {
    let (lhs, rhs) = split_last_pipe(command)?;
    let program = rhs.split_whitespace().next()?;
    let program = program.strip_prefix(SIGIL).unwrap_or(program);
    (program == checker).then_some((lhs, rhs))
}

/// Split at the last unquoted single `|` (a `||` is not a pipe).
pub fn split_last_pipe(command: &str) -> Option<(&str, &str)> {
    let bytes = command.as_bytes();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut last = None;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if !in_single => escaped = true,
            b'\'' if !in_double => in_single = !in_single,
            b'"' if !in_single => in_double = !in_double,
            b'|' if !in_single && !in_double => {
                let doubled = bytes.get(i + 1) == Some(&b'|') || (i > 0 && bytes[i - 1] == b'|');
                if !doubled {
                    last = Some(i);
                }
            }
            _ => {}
        }
    }

    last.map(|i| (command[..i].trim(), command[i + 1..].trim()))
}

/// Read `--check-prefix=P` / `--check-prefix P` from a checker stage.
fn check_prefix_of(stage: &str, line: usize) -> Result<Option<String>, PlanError> {
    let mut words = stage.split_whitespace();
    let mut prefix = None;
    while let Some(word) = words.next() {
        for flag in PREFIX_FLAGS {
            if let Some(value) = word.strip_prefix(flag) {
                if let Some(value) = value.strip_prefix('=') {
                    prefix = Some(unquote(value).to_string());
                } else if value.is_empty() {
                    match words.next() {
                        Some(value) => prefix = Some(unquote(value).to_string()),
                        None => {
                            return Err(PlanError::MissingPrefixValue {
                                line,
                                flag: flag.to_string(),
                            });
                        }
                    }
                } else {
                    continue;
                }
                break;
            }
        }
    }
    Ok(prefix)
}

fn unquote(word: &str) -> &str {
    word.trim_matches(|c| c == '"' || c == '\'')
}

/// Flatten a fixture path into a single file name.
fn sanitize(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// Render a path as one shell word, quoting only when needed.
fn shell_word(path: &Path) -> String {
    let text = path.to_string_lossy();
    let plain = text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:,@".contains(c) || (cfg!(windows) && c == '\\'));
    if plain && !text.is_empty() {
        return text.into_owned();
    }
    if cfg!(windows) {
        format!("\"{text}\"")
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use goldcheck_syntax::ast::Fixture;
    use goldcheck_syntax::parser::scan_directives;

    fn directives(source: &str) -> DirectiveSet {
        scan_directives(&Fixture::new("t.swift", source)).unwrap()
    }

    fn ctx(user: &BTreeMap<String, String>) -> SubstitutionContext<'_> {
        SubstitutionContext::for_fixture(Path::new("test/Interpreter/varargs.swift"), Path::new("/tmp/gc"), user)
    }

    // ========================================
    // Substitution
    // ========================================

    #[cfg(unix)]
    #[test]
    fn test_builtins() {
        let user = BTreeMap::new();
        let ctx = ctx(&user);
        assert_eq!(expand("cat %s", &ctx), "cat test/Interpreter/varargs.swift");
        assert_eq!(expand("ls %S", &ctx), "ls test/Interpreter");
        assert_eq!(expand("echo 100%%", &ctx), "echo 100%");
        assert_eq!(
            expand("cc -o %t", &ctx),
            "cc -o /tmp/gc/test_Interpreter_varargs.swift.tmp"
        );
    }

    #[test]
    fn test_longest_name_wins() {
        let mut user = BTreeMap::new();
        user.insert("target-run".to_string(), "RUN".to_string());
        user.insert("target-run-simple-swift".to_string(), "sh %s".to_string());
        let ctx = ctx(&user);
        assert_eq!(expand("%target-run-simple-swift", &ctx), "sh test/Interpreter/varargs.swift");
        assert_eq!(expand("%target-run x", &ctx), "RUN x");
    }

    #[test]
    fn test_builtin_shadows_user() {
        let mut user = BTreeMap::new();
        user.insert("s".to_string(), "shadowed".to_string());
        let ctx = ctx(&user);
        assert_eq!(expand("%s", &ctx), "test/Interpreter/varargs.swift");
    }

    #[test]
    fn test_unknown_sigil_left_alone() {
        let user = BTreeMap::new();
        assert_eq!(expand("printf '%d' 1; echo %", &ctx(&user)), "printf '%d' 1; echo %");
    }

    #[test]
    fn test_paths_with_spaces_are_quoted() {
        let user = BTreeMap::new();
        let ctx = SubstitutionContext::for_fixture(Path::new("my tests/a.swift"), Path::new("out"), &user);
        if cfg!(windows) {
            assert_eq!(expand("%s", &ctx), "\"my tests/a.swift\"");
        } else {
            assert_eq!(expand("%s", &ctx), "'my tests/a.swift'");
        }
    }

    #[test]
    fn test_bare_file_name_has_dot_dir() {
        let user = BTreeMap::new();
        let ctx = SubstitutionContext::for_fixture(Path::new("a.swift"), Path::new("out"), &user);
        assert_eq!(expand("%S", &ctx), ".");
    }

    // ========================================
    // Pipes
    // ========================================

    #[test]
    fn test_split_last_pipe() {
        assert_eq!(split_last_pipe("a | b | c"), Some(("a | b", "c")));
        assert_eq!(split_last_pipe("a || b"), None);
        assert_eq!(split_last_pipe("echo 'x|y'"), None);
        assert_eq!(split_last_pipe("echo \"x|y\" | cat"), Some(("echo \"x|y\"", "cat")));
        assert_eq!(split_last_pipe("echo x \\| y"), None);
    }

    #[test]
    fn test_split_checker_stage() {
        assert_eq!(
            split_checker_stage("%target-run-simple-swift | %FileCheck %s", "FileCheck"),
            Some(("%target-run-simple-swift", "%FileCheck %s"))
        );
        assert_eq!(split_checker_stage("run | FileCheck %s", "FileCheck"), Some(("run", "FileCheck %s")));
        assert_eq!(split_checker_stage("run | sort", "FileCheck"), None);
        assert_eq!(split_checker_stage("run", "FileCheck"), None);
    }

    #[test]
    fn test_check_prefix_flag_forms() {
        assert_eq!(check_prefix_of("%FileCheck %s --check-prefix=OBJC", 1).unwrap(), Some("OBJC".into()));
        assert_eq!(check_prefix_of("%FileCheck %s -check-prefix OBJC", 1).unwrap(), Some("OBJC".into()));
        assert_eq!(check_prefix_of("%FileCheck %s --check-prefix='Q'", 1).unwrap(), Some("Q".into()));
        assert_eq!(check_prefix_of("%FileCheck %s", 1).unwrap(), None);
        assert!(matches!(
            check_prefix_of("%FileCheck %s --check-prefix", 4),
            Err(PlanError::MissingPrefixValue { line: 4, .. })
        ));
    }

    // ========================================
    // Plans
    // ========================================

    #[test]
    fn test_varargs_plan() {
        let mut user = BTreeMap::new();
        user.insert("target-run-simple-swift".to_string(), "swift %s".to_string());
        let config = RunnerConfig::new();
        let set = directives("// RUN: %target-run-simple-swift | %FileCheck %s\n");
        let plan = plan_runs(&set, &config, &ctx(&user)).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].command, "swift test/Interpreter/varargs.swift");
        assert!(plan.steps[0].checked);
        assert_eq!(plan.prefix, None);
    }

    #[test]
    fn test_prep_steps_and_checked_step() {
        let user = BTreeMap::new();
        let set = directives(
            "// RUN: mkdir -p %t\n// RUN: cc %s -o %t/a.out\n// RUN: %t/a.out | %FileCheck %s --check-prefix=EXE\n",
        );
        let plan = plan_runs(&set, &RunnerConfig::new(), &ctx(&user)).unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps.iter().filter(|s| s.checked).count(), 1);
        assert_eq!(plan.checked_step().unwrap().line, 3);
        assert_eq!(plan.prefix.as_deref(), Some("EXE"));
    }

    #[test]
    fn test_last_run_checked_without_checker_stage() {
        let user = BTreeMap::new();
        let set = directives("// RUN: true\n// RUN: cat %s\n");
        let plan = plan_runs(&set, &RunnerConfig::new(), &ctx(&user)).unwrap();
        assert!(!plan.steps[0].checked);
        assert!(plan.steps[1].checked);
    }

    #[test]
    fn test_two_checker_stages_rejected() {
        let user = BTreeMap::new();
        let set = directives("// RUN: a | %FileCheck %s\n// RUN: b | %FileCheck %s\n");
        assert_eq!(
            plan_runs(&set, &RunnerConfig::new(), &ctx(&user)),
            Err(PlanError::MultipleCheckedRuns { first: 1, second: 2 })
        );
    }

    #[test]
    fn test_default_run_command() {
        let user = BTreeMap::new();
        let set = directives("// CHECK: x\n");
        assert_eq!(
            plan_runs(&set, &RunnerConfig::new(), &ctx(&user)),
            Err(PlanError::NoRunCommand)
        );

        let config = RunnerConfig::new().with_run_command("python3 %s");
        let plan = plan_runs(&set, &config, &ctx(&user)).unwrap();
        assert_eq!(plan.steps[0].command, "python3 test/Interpreter/varargs.swift");
        assert_eq!(plan.steps[0].line, 0);
        assert!(plan.steps[0].checked);
    }

    #[test]
    fn test_checker_only_rejected() {
        let user = BTreeMap::new();
        let set = directives("// RUN: | %FileCheck %s\n");
        assert_eq!(
            plan_runs(&set, &RunnerConfig::new(), &ctx(&user)),
            Err(PlanError::CheckerOnly { line: 1 })
        );
    }
}
