use tracing::debug;

use super::fresh::FreshNames;
use super::ir::Operator;
use super::{calc, tac};
use crate::error::CompileError;

pub fn tmp_prefix(function: &str) -> String {
    format!("_tmp_{}", function)
}

// A flattened sub-expression: the name holding its value and the statements
// that compute it.
struct Flattened {
    name: String,
    stms: Vec<tac::Stm>,
}

/// Calc to Tac lowering for one function.
///
/// Owns the temporary-name generator, so an instance must not be reused for
/// a second function.
pub(crate) struct CalcLowering {
    function: String,
    fresh: FreshNames,
}

impl CalcLowering {
    pub fn new(function: &str) -> Self {
        Self {
            function: function.to_string(),
            fresh: FreshNames::new(tmp_prefix(function)),
        }
    }

    pub fn lower_function(mut self, f: &calc::Function) -> Result<tac::Function, CompileError> {
        // the return must be a variable; checked before any work is done
        let Some(ret_var) = f.return_var() else {
            return Err(CompileError::InvalidReturnShape(f.ret.to_string()));
        };
        self.check_reserved(f)?;

        let mut body = Vec::new();
        for stm in &f.body {
            body.extend(self.lower_stm(stm));
        }

        // bind the result so the return names the last statement's target
        let ret = self.fresh.next_name();
        body.push(tac::Stm::assign(ret.clone(), tac::Exp::var(ret_var)));

        debug!(
            function = %self.function,
            statements = body.len(),
            temporaries = self.fresh.issued(),
            "lowered calc function"
        );

        Ok(tac::Function {
            name: f.name.clone(),
            params: f.params.clone(),
            body,
            ret,
        })
    }

    fn check_reserved(&self, f: &calc::Function) -> Result<(), CompileError> {
        let reads = f.body.iter().flat_map(|stm| match stm {
            calc::Stm::Assign { value, .. } => value.reads(),
        });
        let names = f
            .params
            .iter()
            .map(String::as_str)
            .chain(f.body.iter().map(calc::Stm::target))
            .chain(reads);

        for name in names {
            if self.fresh.owns(name) {
                return Err(CompileError::ReservedName {
                    name: name.to_string(),
                    prefix: self.fresh.prefix().to_string(),
                });
            }
        }
        Ok(())
    }

    fn lower_stm(&mut self, stm: &calc::Stm) -> Vec<tac::Stm> {
        match stm {
            calc::Stm::Assign { target, value } => match value {
                calc::Exp::Var(name) => {
                    vec![tac::Stm::assign(target.clone(), tac::Exp::var(name.clone()))]
                }
                // the outermost operation writes the source target directly
                calc::Exp::BinOp { left, right, op } => {
                    let Flattened { stms, .. } =
                        self.lower_binop(left, right, *op, Some(target.clone()));
                    stms
                }
            },
        }
    }

    fn lower_exp(&mut self, exp: &calc::Exp) -> Flattened {
        match exp {
            calc::Exp::Var(name) => Flattened {
                name: name.clone(),
                stms: Vec::new(),
            },
            calc::Exp::BinOp { left, right, op } => self.lower_binop(left, right, *op, None),
        }
    }

    fn lower_binop(
        &mut self,
        left: &calc::Exp,
        right: &calc::Exp,
        op: Operator,
        target: Option<String>,
    ) -> Flattened {
        let left = self.lower_exp(left);
        let right = self.lower_exp(right);
        let target = target.unwrap_or_else(|| self.fresh.next_name());

        let mut stms = left.stms;
        stms.extend(right.stms);
        stms.push(tac::Stm::assign(
            target.clone(),
            tac::Exp::binop(left.name, right.name, op),
        ));

        Flattened { name: target, stms }
    }
}
