//! Translation validation of the Calc to Tac lowering.
//!
//! Both functions are converted to SSA and encoded into one
//! [`EncodingContext`]. With `r_src` and `r_tgt` the constants of their SSA
//! return names, the oracle is asked whether
//!
//! ```text
//! Not(Implies(And(C_src ++ C_tgt), r_src == r_tgt))
//! ```
//!
//! is satisfiable. `unsat` certifies the lowering, `sat` comes with a
//! counter-model and `unknown` (or a timeout) is inconclusive.
//!
//! # Limitations
//!
//! Operators are uninterpreted functions, so the check is sound but not
//! complete with respect to integer arithmetic. It proves that the lowering
//! preserves the expression structure. It knows nothing about
//! associativity, commutativity or distributivity: a compiler that rewrote
//! `a + b` into `b + a` would be rejected even though the result is the same
//! number, and a bug that only shows up through such identities cannot be
//! told apart from a correct rewrite that relies on them.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::compiler::fresh::FreshNames;
use crate::compiler::ssa::{calc_prefix, calc_to_ssa, tac_prefix, tac_to_ssa};
use crate::compiler::{calc, tac, CalcCompiler};
use crate::config::ValidatorConfig;
use crate::encoder::EncodingContext;
use crate::error::{CompileError, ValidationError};
use crate::oracle::{CheckResult, Model, Oracle, Script};
use crate::smt::Formula;
use crate::validation::FunctionValidator;

/// The satisfiability question for one source/target pair.
#[derive(Debug, Clone)]
pub struct Query {
    pub function: String,
    pub script: Script,
    pub source_return: String,
    pub target_return: String,
    pub constraints: usize,
}

impl Query {
    pub fn build(source: &calc::Function, target: &tac::Function) -> Result<Self, CompileError> {
        if source.params != target.params {
            return Err(CompileError::malformed(
                &source.name,
                format!(
                    "parameters ({}) differ from target parameters ({})",
                    source.params.join(", "),
                    target.params.join(", ")
                ),
            ));
        }
        check_disjoint(source, target)?;

        let source_ssa = calc_to_ssa(source)?;
        let target_ssa = tac_to_ssa(target)?;
        let source_return = source_ssa
            .return_var()
            .ok_or_else(|| CompileError::InvalidReturnShape(source_ssa.ret.to_string()))?
            .to_string();
        let target_return = target_ssa.ret.clone();

        let mut ctx = EncodingContext::new();
        let mut constraints = ctx.encode_calc(&source_ssa);
        constraints.extend(ctx.encode_tac(&target_ssa));
        let count = constraints.len();

        let r_src = ctx.constant(&source_return);
        let r_tgt = ctx.constant(&target_return);
        ctx.assert(Formula::not(Formula::implies(
            Formula::And(constraints),
            r_src.eq(&r_tgt),
        )));

        debug!(
            function = %source.name,
            constraints = count,
            %source_return,
            %target_return,
            "built validation query"
        );

        Ok(Self {
            function: source.name.clone(),
            script: ctx.into_script(),
            source_return,
            target_return,
            constraints: count,
        })
    }

    /// Hex SHA-256 of the SMT-LIB rendering.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.script.to_smtlib().as_bytes());
        hex::encode(hasher.finalize())
    }
}

// Names of one side must not fall in the other side's SSA namespace.
fn check_disjoint(source: &calc::Function, target: &tac::Function) -> Result<(), CompileError> {
    let calc_names = FreshNames::new(calc_prefix(&source.name));
    let tac_names = FreshNames::new(tac_prefix(&target.name));

    let mut target_idents: Vec<&str> = target.params.iter().map(String::as_str).collect();
    for stm in &target.body {
        target_idents.push(stm.target());
        target_idents.extend(stm.value().reads());
    }
    target_idents.push(&target.ret);

    let mut source_idents: Vec<&str> = source.params.iter().map(String::as_str).collect();
    for stm in &source.body {
        match stm {
            calc::Stm::Assign { target, value } => {
                source_idents.push(target);
                source_idents.extend(value.reads());
            }
        }
    }
    source_idents.extend(source.ret.reads());

    let clash = target_idents
        .into_iter()
        .find(|name| calc_names.owns(name))
        .map(|name| (name, &calc_names))
        .or_else(|| {
            source_idents
                .into_iter()
                .find(|name| tac_names.owns(name))
                .map(|name| (name, &tac_names))
        });

    match clash {
        Some((name, fresh)) => Err(CompileError::ReservedName {
            name: name.to_string(),
            prefix: fresh.prefix().to_string(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail { model: Model },
    Inconclusive { reason: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Turns anything but a pass into an error for `function`.
    pub fn ensure_pass(&self, function: &str) -> Result<(), ValidationError> {
        match self {
            Verdict::Pass => Ok(()),
            Verdict::Fail { model } => Err(ValidationError::NotEquivalent {
                function: function.to_string(),
                counterexample: model.to_string(),
            }),
            Verdict::Inconclusive { reason } => Err(ValidationError::OracleUnknown {
                function: function.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

impl From<CheckResult> for Verdict {
    fn from(result: CheckResult) -> Self {
        match result {
            CheckResult::Unsat => Verdict::Pass,
            CheckResult::Sat(model) => Verdict::Fail { model },
            CheckResult::Unknown(reason) => Verdict::Inconclusive { reason },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub function: String,
    pub verdict: Verdict,
    pub source_return: String,
    pub target_return: String,
    pub constraints: usize,
    pub oracle: String,
    pub query_hash: String,
    pub cached: bool,
}

impl ValidationReport {
    pub fn is_pass(&self) -> bool {
        self.verdict.is_pass()
    }

    pub fn ensure_pass(&self) -> Result<(), ValidationError> {
        self.verdict.ensure_pass(&self.function)
    }
}

pub struct TranslationValidator<O> {
    oracle: O,
    compiler: CalcCompiler,
    timeout: Duration,
    cache_verdicts: bool,
    verdicts: HashMap<String, Verdict>,
}

impl TranslationValidator<Box<dyn Oracle>> {
    /// Validator with the oracle selected by `config`.
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::with_config(config.build_oracle(), config)
    }
}

impl<O: Oracle> TranslationValidator<O> {
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, &ValidatorConfig::default())
    }

    pub fn with_config(oracle: O, config: &ValidatorConfig) -> Self {
        Self {
            oracle,
            compiler: CalcCompiler::with_validator(
                FunctionValidator::new(config.max_statements).with_max_depth(config.max_expression_depth),
            ),
            timeout: config.oracle_timeout(),
            cache_verdicts: config.cache_verdicts,
            verdicts: HashMap::new(),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn cached_verdicts(&self) -> usize {
        self.verdicts.len()
    }

    /// Checks that `target` computes the same result as `source` for every
    /// interpretation of the operators.
    pub async fn validate(
        &mut self,
        source: &calc::Function,
        target: &tac::Function,
    ) -> Result<ValidationReport, ValidationError> {
        self.compiler.validator().check_expression_depth(source)?;
        let query = Query::build(source, target)?;
        let query_hash = query.fingerprint();

        let (verdict, cached) = match self.verdicts.get(&query_hash) {
            Some(verdict) if self.cache_verdicts => {
                debug!(function = %query.function, hash = %query_hash, "verdict cache hit");
                (verdict.clone(), true)
            }
            _ => (self.check(&query).await?, false),
        };

        if !cached && self.cache_verdicts && !matches!(verdict, Verdict::Inconclusive { .. }) {
            self.verdicts.insert(query_hash.clone(), verdict.clone());
        }

        match &verdict {
            Verdict::Pass => info!(function = %query.function, "translation validated"),
            Verdict::Fail { model } => {
                warn!(function = %query.function, %model, "translation not equivalent")
            }
            Verdict::Inconclusive { reason } => {
                warn!(function = %query.function, %reason, "translation validation inconclusive")
            }
        }

        Ok(ValidationReport {
            function: query.function,
            verdict,
            source_return: query.source_return,
            target_return: query.target_return,
            constraints: query.constraints,
            oracle: self.oracle.name().to_string(),
            query_hash,
            cached,
        })
    }

    async fn check(&self, query: &Query) -> Result<Verdict, ValidationError> {
        match tokio::time::timeout(self.timeout, self.oracle.check(&query.script)).await {
            Ok(result) => Ok(Verdict::from(result?)),
            Err(_) => Ok(Verdict::Inconclusive {
                reason: format!(
                    "{} did not answer within {} ms",
                    self.oracle.name(),
                    self.timeout.as_millis()
                ),
            }),
        }
    }

    /// Lowers `source` and validates the result against it.
    pub async fn compile_and_validate(
        &mut self,
        source: &calc::Function,
    ) -> Result<(tac::Function, ValidationReport), ValidationError> {
        let target = self.compiler.compile(source)?;
        let report = self.validate(source, &target).await?;
        Ok((target, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ir::Operator;
    use crate::oracle::CongruenceOracle;

    #[test]
    fn query_shape() {
        let query = Query::build(&calc::sample_function(), &tac::sample_function()).unwrap();
        assert_eq!(query.source_return, "_calc_f_2");
        assert_eq!(query.target_return, "_tac_f_4");
        assert_eq!(query.constraints, 8);
        assert_eq!(query.script.assertions().len(), 1);
        assert!(query.script.assertions()[0]
            .to_string()
            .ends_with("), _calc_f_2 == _tac_f_4))"));
        assert_eq!(query.fingerprint().len(), 64);
    }

    #[test]
    fn parameter_mismatch_is_rejected() {
        let mut target = tac::sample_function();
        target.params.swap(0, 1);
        assert!(matches!(
            Query::build(&calc::sample_function(), &target),
            Err(CompileError::Malformed { .. })
        ));
    }

    #[test]
    fn target_may_not_use_source_ssa_names() {
        let target = tac::Function::new(
            "f",
            &["s1", "s2", "t1", "t2"],
            vec![tac::Stm::assign("_calc_f_0", tac::Exp::binop("s1", "t1", Operator::Add))],
            "_calc_f_0",
        );
        assert!(matches!(
            Query::build(&calc::sample_function(), &target),
            Err(CompileError::ReservedName { .. })
        ));
    }

    #[test]
    fn verdict_errors() {
        assert!(Verdict::Pass.ensure_pass("f").is_ok());
        assert!(matches!(
            Verdict::Fail { model: Model::new() }.ensure_pass("f"),
            Err(ValidationError::NotEquivalent { .. })
        ));
        assert!(matches!(
            Verdict::Inconclusive { reason: "timeout".into() }.ensure_pass("f"),
            Err(ValidationError::OracleUnknown { .. })
        ));
    }

    #[test]
    fn verdict_serializes_with_status_tag() {
        let json = serde_json::to_value(Verdict::Inconclusive { reason: "gave up".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "inconclusive", "reason": "gave up" }));
        assert_eq!(serde_json::to_value(Verdict::Pass).unwrap(), serde_json::json!({ "status": "pass" }));
    }

    #[tokio::test]
    async fn verdicts_are_cached() {
        let mut validator = TranslationValidator::new(CongruenceOracle::new());
        let first = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();
        let second = validator
            .validate(&calc::sample_function(), &tac::sample_function())
            .await
            .unwrap();

        assert!(first.is_pass() && !first.cached);
        assert!(second.is_pass() && second.cached);
        assert_eq!(first.query_hash, second.query_hash);
        assert_eq!(validator.cached_verdicts(), 1);
    }
}
