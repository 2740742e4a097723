//! Reference evaluator over `i64`.
//!
//! Gives Calc and Tac one concrete meaning so lowering can be checked
//! against real arithmetic, complementing the uninterpreted proof.

use std::collections::HashMap;

use thiserror::Error;

use super::ir::Operator;
use super::{calc, tac};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("`{function}` takes {expected} arguments, got {got}")]
    Arity {
        function: String,
        expected: usize,
        got: usize,
    },

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("division by zero: {0} / 0")]
    DivisionByZero(i64),

    #[error("overflow in {left} {op} {right}")]
    Overflow { left: i64, op: Operator, right: i64 },
}

/// Applies `op` with checked arithmetic; division truncates toward zero.
pub fn apply(op: Operator, left: i64, right: i64) -> Result<i64, EvalError> {
    if op == Operator::Div && right == 0 {
        return Err(EvalError::DivisionByZero(left));
    }
    let result = match op {
        Operator::Add => left.checked_add(right),
        Operator::Sub => left.checked_sub(right),
        Operator::Mul => left.checked_mul(right),
        Operator::Div => left.checked_div(right),
    };
    result.ok_or(EvalError::Overflow { left, op, right })
}

struct Env {
    values: HashMap<String, i64>,
}

impl Env {
    fn bind_params(function: &str, params: &[String], args: &[i64]) -> Result<Self, EvalError> {
        if params.len() != args.len() {
            return Err(EvalError::Arity {
                function: function.to_string(),
                expected: params.len(),
                got: args.len(),
            });
        }
        Ok(Self {
            values: params.iter().cloned().zip(args.iter().copied()).collect(),
        })
    }

    fn get(&self, name: &str) -> Result<i64, EvalError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    fn set(&mut self, name: &str, value: i64) {
        self.values.insert(name.to_string(), value);
    }
}

fn eval_calc_exp(exp: &calc::Exp, env: &Env) -> Result<i64, EvalError> {
    match exp {
        calc::Exp::Var(name) => env.get(name),
        calc::Exp::BinOp { left, right, op } => {
            let l = eval_calc_exp(left, env)?;
            let r = eval_calc_exp(right, env)?;
            apply(*op, l, r)
        }
    }
}

pub fn eval_calc(f: &calc::Function, args: &[i64]) -> Result<i64, EvalError> {
    let mut env = Env::bind_params(&f.name, &f.params, args)?;
    for stm in &f.body {
        match stm {
            calc::Stm::Assign { target, value } => {
                let v = eval_calc_exp(value, &env)?;
                env.set(target, v);
            }
        }
    }
    eval_calc_exp(&f.ret, &env)
}

pub fn eval_tac(f: &tac::Function, args: &[i64]) -> Result<i64, EvalError> {
    let mut env = Env::bind_params(&f.name, &f.params, args)?;
    for stm in &f.body {
        match stm {
            tac::Stm::Assign { target, value } => {
                let v = match value {
                    tac::Exp::Var(name) => env.get(name)?,
                    tac::Exp::BinOp { left, right, op } => apply(*op, env.get(left)?, env.get(right)?)?,
                };
                env.set(target, v);
            }
        }
    }
    env.get(&f.ret)
}
