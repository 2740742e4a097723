use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::oracle::smtlib::SolverConfig;
use crate::oracle::{CongruenceOracle, Oracle, SmtLibOracle};
use crate::validation::{MAX_EXPRESSION_DEPTH, MAX_STATEMENTS};

pub const ENV_ORACLE: &str = "CALC_TV_ORACLE";
pub const ENV_SOLVER: &str = "CALC_TV_SOLVER";
pub const ENV_SOLVER_ARGS: &str = "CALC_TV_SOLVER_ARGS";
pub const ENV_TIMEOUT_MS: &str = "CALC_TV_TIMEOUT_MS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    #[default]
    Congruence,
    SmtLib,
}

impl std::str::FromStr for OracleKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "congruence" | "cc" => Ok(OracleKind::Congruence),
            "smtlib" | "smt_lib" | "smt-lib" => Ok(OracleKind::SmtLib),
            other => bail!("unknown oracle `{}` (expected `congruence` or `smtlib`)", other),
        }
    }
}

/// Settings for a translation validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub oracle: OracleKind,
    pub oracle_timeout_ms: u64,
    pub cache_verdicts: bool,
    pub max_statements: usize,
    pub max_expression_depth: usize,
    pub solver: SolverConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            oracle: OracleKind::default(),
            oracle_timeout_ms: 10_000,
            cache_verdicts: true,
            max_statements: MAX_STATEMENTS,
            max_expression_depth: MAX_EXPRESSION_DEPTH,
            solver: SolverConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Reads a JSON config file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Defaults overridden by `CALC_TV_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(oracle) = lookup(ENV_ORACLE) {
            self.oracle = oracle.parse()?;
        }

        if let Some(solver) = lookup(ENV_SOLVER) {
            // a path selects the binary directly, a bare name goes through PATH
            if solver.contains(std::path::MAIN_SEPARATOR) {
                self.solver.path = Some(PathBuf::from(&solver));
            } else {
                self.solver.program = solver;
                self.solver.path = None;
            }
        }

        if let Some(args) = lookup(ENV_SOLVER_ARGS) {
            self.solver.args = args.split_whitespace().map(String::from).collect();
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.oracle_timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be milliseconds, got `{}`", ENV_TIMEOUT_MS, timeout))?;
        }

        Ok(self)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn build_oracle(&self) -> Box<dyn Oracle> {
        debug!(oracle = ?self.oracle, "building oracle");
        match self.oracle {
            OracleKind::Congruence => Box::new(CongruenceOracle::new()),
            OracleKind::SmtLib => Box::new(SmtLibOracle::with_config(self.solver.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn loads_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "oracle": "smt_lib", "oracle_timeout_ms": 250 }}"#).unwrap();

        let config = ValidatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.oracle, OracleKind::SmtLib);
        assert_eq!(config.oracle_timeout(), Duration::from_millis(250));
        assert!(config.cache_verdicts);
        assert_eq!(config.max_expression_depth, MAX_EXPRESSION_DEPTH);
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{ oracle: ").unwrap();
        let err = ValidatorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }

    #[test]
    fn environment_overrides() {
        let config = ValidatorConfig::default()
            .with_overrides(vars(&[
                (ENV_ORACLE, "smtlib"),
                (ENV_SOLVER, "cvc5"),
                (ENV_SOLVER_ARGS, "--lang smt2 --incremental"),
                (ENV_TIMEOUT_MS, "1500"),
            ]))
            .unwrap();

        assert_eq!(config.oracle, OracleKind::SmtLib);
        assert_eq!(config.solver.program, "cvc5");
        assert_eq!(config.solver.args, ["--lang", "smt2", "--incremental"]);
        assert_eq!(config.oracle_timeout_ms, 1500);
        assert_eq!(config.build_oracle().name(), "cvc5");
    }

    #[test]
    fn solver_path_override() {
        let path = format!("{0}opt{0}z3", std::path::MAIN_SEPARATOR);
        let config = ValidatorConfig::default()
            .with_overrides(vars(&[(ENV_SOLVER, path.as_str())]))
            .unwrap();
        assert_eq!(config.solver.path, Some(PathBuf::from(path)));
        assert_eq!(config.solver.program, "z3");
    }

    #[test]
    fn invalid_overrides_fail() {
        assert!(ValidatorConfig::default()
            .with_overrides(vars(&[(ENV_TIMEOUT_MS, "soon")]))
            .is_err());
        assert!(ValidatorConfig::default()
            .with_overrides(vars(&[(ENV_ORACLE, "oracle-of-delphi")]))
            .is_err());
    }

    #[test]
    fn default_oracle_is_in_process() {
        assert_eq!(ValidatorConfig::default().build_oracle().name(), "congruence");
    }
}
