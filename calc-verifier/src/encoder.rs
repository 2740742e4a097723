//! Equality constraints for SSA functions.
//!
//! Every assignment `x = e` becomes `x == [[e]]`, where variables are
//! constants of one uninterpreted sort and each operator is an uninterpreted
//! binary function. A single [`EncodingContext`] is shared by the source and
//! target of one validation run so both sides speak about the same symbols.

use std::collections::{BTreeMap, HashMap};

use crate::compiler::ir::Operator;
use crate::compiler::{calc, tac};
use crate::oracle::Script;
use crate::smt::{Formula, FunctionSymbol, Sort, Term};

/// Name of the value sort.
pub const VALUE_SORT: &str = "S";

/// `f_add`, `f_sub`, ... (a bare `div` would shadow the SMT-LIB builtin)
pub fn operator_symbol(op: Operator) -> String {
    format!("f_{}", op.mnemonic())
}

pub struct EncodingContext {
    script: Script,
    sort: Sort,
    operators: BTreeMap<Operator, FunctionSymbol>,
    constants: HashMap<String, Term>,
}

impl Default for EncodingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingContext {
    pub fn new() -> Self {
        let mut script = Script::new();
        let sort = script.declare_sort(VALUE_SORT);
        let operators = Operator::ALL
            .iter()
            .map(|&op| {
                let domain = [sort.clone(), sort.clone()];
                (op, script.declare_function(&operator_symbol(op), &domain, &sort))
            })
            .collect();

        Self {
            script,
            sort,
            operators,
            constants: HashMap::new(),
        }
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn operator(&self, op: Operator) -> &FunctionSymbol {
        // every operator is declared in `new`
        &self.operators[&op]
    }

    /// The constant standing for `name`, declared on first use.
    pub fn constant(&mut self, name: &str) -> Term {
        if let Some(term) = self.constants.get(name) {
            return term.clone();
        }
        let term = self.script.declare_constant(name, &self.sort);
        self.constants.insert(name.to_string(), term.clone());
        term
    }

    fn apply(&self, op: Operator, left: Term, right: Term) -> Term {
        self.operator(op).apply(vec![left, right])
    }

    pub fn encode_calc_exp(&mut self, exp: &calc::Exp) -> Term {
        match exp {
            calc::Exp::Var(name) => self.constant(name),
            calc::Exp::BinOp { left, right, op } => {
                let l = self.encode_calc_exp(left);
                let r = self.encode_calc_exp(right);
                self.apply(*op, l, r)
            }
        }
    }

    pub fn encode_tac_exp(&mut self, exp: &tac::Exp) -> Term {
        match exp {
            tac::Exp::Var(name) => self.constant(name),
            tac::Exp::BinOp { left, right, op } => {
                let l = self.constant(left);
                let r = self.constant(right);
                self.apply(*op, l, r)
            }
        }
    }

    /// One constraint per statement of an SSA Calc function, in order.
    pub fn encode_calc(&mut self, f: &calc::Function) -> Vec<Formula> {
        f.body
            .iter()
            .map(|stm| match stm {
                calc::Stm::Assign { target, value } => {
                    let lhs = self.constant(target);
                    let rhs = self.encode_calc_exp(value);
                    Formula::Eq(lhs, rhs)
                }
            })
            .collect()
    }

    /// One constraint per statement of an SSA Tac function, in order.
    pub fn encode_tac(&mut self, f: &tac::Function) -> Vec<Formula> {
        f.body
            .iter()
            .map(|stm| match stm {
                tac::Stm::Assign { target, value } => {
                    let lhs = self.constant(target);
                    let rhs = self.encode_tac_exp(value);
                    Formula::Eq(lhs, rhs)
                }
            })
            .collect()
    }

    pub fn assert(&mut self, formula: Formula) {
        self.script.assert(formula);
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn into_script(self) -> Script {
        self.script
    }
}
