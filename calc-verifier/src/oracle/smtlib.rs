//! External SMT-LIB2 solver backend.
//!
//! The script is piped to the solver's stdin followed by `(check-sat)` and
//! `(get-model)`. The child is killed when the check future is dropped, so
//! an outer `tokio::time::timeout` also stops the solver.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CheckResult, Model, Oracle, Script};
use crate::error::OracleError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Executable looked up on `PATH` when `path` is unset
    pub program: String,
    pub path: Option<PathBuf>,
    /// Arguments that make the solver read SMT-LIB2 from stdin
    pub args: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            program: "z3".to_string(),
            path: None,
            args: vec!["-in".to_string(), "-smt2".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SmtLibOracle {
    config: SolverConfig,
}

impl SmtLibOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Resolves the solver executable.
    pub fn locate(&self) -> Result<PathBuf, OracleError> {
        if let Some(path) = &self.config.path {
            return Ok(path.clone());
        }
        which::which(&self.config.program).map_err(|e| {
            OracleError::Unavailable(format!("`{}` not found on PATH: {}", self.config.program, e))
        })
    }

    /// Interprets solver stdout.
    pub fn parse_output(stdout: &str) -> Result<CheckResult, OracleError> {
        let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());

        let Some(first) = lines.next() else {
            return Err(OracleError::Protocol("empty solver output".to_string()));
        };

        match first {
            "unsat" => Ok(CheckResult::Unsat),
            "unknown" => Ok(CheckResult::Unknown("solver returned unknown".to_string())),
            "sat" => {
                let rest: Vec<&str> = lines.collect();
                Ok(CheckResult::Sat(parse_model(&rest.join("\n"))))
            }
            other if other.starts_with("(error") => Err(OracleError::Protocol(other.to_string())),
            other => Err(OracleError::Protocol(format!("unexpected response `{}`", other))),
        }
    }
}

#[async_trait]
impl Oracle for SmtLibOracle {
    fn name(&self) -> &str {
        &self.config.program
    }

    async fn check(&self, script: &Script) -> Result<CheckResult, OracleError> {
        let program = self.locate()?;
        debug!(solver = %program.display(), args = ?self.config.args, "spawning solver");

        let mut child = Command::new(&program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut input = script.to_smtlib();
        input.push_str("(check-sat)\n(get-model)\n(exit)\n");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OracleError::Protocol("solver stdin unavailable".to_string()))?;
        stdin.write_all(input.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(solver = %program.display(), stderr = %stderr.trim(), "solver wrote to stderr");
        }

        Self::parse_output(&stdout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl std::fmt::Display for SExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SExp::Atom(atom) => f.write_str(atom),
            SExp::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

// Reads every complete s-expression in `text`; unbalanced tails are dropped.
fn parse_sexps(text: &str) -> Vec<SExp> {
    let mut stack: Vec<Vec<SExp>> = vec![Vec::new()];
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => stack.push(Vec::new()),
            ')' => {
                if stack.len() > 1 {
                    if let Some(list) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.push(SExp::List(list));
                        }
                    }
                }
            }
            ';' => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            c if c.is_whitespace() => {}
            '|' | '"' => {
                let mut atom = String::from(c);
                for next in chars.by_ref() {
                    atom.push(next);
                    if next == c {
                        break;
                    }
                }
                if let Some(top) = stack.last_mut() {
                    top.push(SExp::Atom(atom));
                }
            }
            c => {
                let mut atom = String::from(c);
                while let Some(next) =
                    chars.next_if(|&n| !n.is_whitespace() && n != '(' && n != ')')
                {
                    atom.push(next);
                }
                if let Some(top) = stack.last_mut() {
                    top.push(SExp::Atom(atom));
                }
            }
        }
    }

    stack.into_iter().next().unwrap_or_default()
}

// Collects nullary `(define-fun name () Sort value)` entries at any depth.
fn parse_model(text: &str) -> Model {
    fn visit(sexp: &SExp, model: &mut Model) {
        let SExp::List(items) = sexp else {
            return;
        };
        match items.as_slice() {
            [SExp::Atom(head), SExp::Atom(name), SExp::List(params), _sort, value]
                if head == "define-fun" && params.is_empty() =>
            {
                model.insert(name.trim_matches('|'), value.to_string());
            }
            _ => {
                for item in items {
                    visit(item, model);
                }
            }
        }
    }

    let mut model = Model::new();
    for sexp in parse_sexps(text) {
        visit(&sexp, &mut model);
    }
    model
}
