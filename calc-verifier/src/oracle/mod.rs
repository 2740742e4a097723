//! Decision procedures for the validity query.
//!
//! An oracle receives a [`Script`] (declarations plus assertions) and
//! answers whether the conjunction of its assertions is satisfiable.
//! Two backends ship with the crate:
//!
//! - [`CongruenceOracle`]: in-process congruence closure, complete for the
//!   conjunctive equality queries translation validation produces.
//! - [`SmtLibOracle`]: any SMT-LIB2 solver (z3, cvc5, ...) run as a child
//!   process.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::smt::{quoted, Formula, FunctionSymbol, Sort, Term};

pub mod congruence;
pub mod smtlib;

pub use congruence::CongruenceOracle;
pub use smtlib::SmtLibOracle;

/// Declarations and assertions for one satisfiability check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    sorts: Vec<Sort>,
    functions: Vec<FunctionSymbol>,
    constants: Vec<Term>,
    assertions: Vec<Formula>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an uninterpreted sort; repeated names return the same sort.
    pub fn declare_sort(&mut self, name: &str) -> Sort {
        if let Some(sort) = self.sorts.iter().find(|s| s.name() == name) {
            return sort.clone();
        }
        let sort = Sort::new(name);
        self.sorts.push(sort.clone());
        sort
    }

    pub fn declare_function(&mut self, name: &str, domain: &[Sort], range: &Sort) -> FunctionSymbol {
        if let Some(func) = self.functions.iter().find(|f| f.name() == name) {
            return func.clone();
        }
        let func = FunctionSymbol::new(name, domain.to_vec(), range.clone());
        self.functions.push(func.clone());
        func
    }

    pub fn declare_constant(&mut self, name: &str, sort: &Sort) -> Term {
        let term = Term::Const {
            name: name.to_string(),
            sort: sort.clone(),
        };
        if !self.constants.contains(&term) {
            self.constants.push(term.clone());
        }
        term
    }

    pub fn assert(&mut self, formula: Formula) {
        self.assertions.push(formula);
    }

    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }

    pub fn functions(&self) -> &[FunctionSymbol] {
        &self.functions
    }

    pub fn constants(&self) -> &[Term] {
        &self.constants
    }

    pub fn assertions(&self) -> &[Formula] {
        &self.assertions
    }

    /// SMT-LIB2 text: options, logic, declarations and assertions. Every
    /// symbol is written `|quoted|`. Solver commands (`check-sat`, `get-model`) are left to the caller.
    pub fn to_smtlib(&self) -> String {
        let mut out = String::new();
        out.push_str("(set-option :produce-models true)\n");
        out.push_str("(set-logic QF_UF)\n");

        for sort in &self.sorts {
            out.push_str(&format!("(declare-sort {} 0)\n", quoted(sort.name())));
        }
        for func in &self.functions {
            let domain: Vec<String> = func.domain().iter().map(|s| quoted(s.name())).collect();
            out.push_str(&format!(
                "(declare-fun {} ({}) {})\n",
                quoted(func.name()),
                domain.join(" "),
                quoted(func.range().name())
            ));
        }
        for constant in &self.constants {
            if let Term::Const { name, sort } = constant {
                out.push_str(&format!("(declare-const {} {})\n", quoted(name), quoted(sort.name())));
            }
        }
        for assertion in &self.assertions {
            out.push_str("(assert ");
            assertion.write_smtlib(&mut out);
            out.push_str(")\n");
        }

        out
    }
}

/// Constant assignments of a satisfying interpretation.
///
/// Values are the oracle's names for elements of the uninterpreted sort,
/// e.g. `S!val!0`. Two constants are equal in the model exactly when their
/// values are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    values: BTreeMap<String, String>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Sat(Model),
    Unsat,
    Unknown(String),
}

#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, script: &Script) -> Result<CheckResult, OracleError>;
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn check(&self, script: &Script) -> Result<CheckResult, OracleError> {
        (**self).check(script).await
    }
}
