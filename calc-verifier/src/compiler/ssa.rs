//! Static single assignment conversion for both grammars.
//!
//! Each write gets a fresh name and every read is redirected to the name
//! current at that point. Parameters start out mapped to themselves.
//!
//! Calc and Tac differ at the return: Calc's return expression is bound to
//! one extra synthetic assignment so the result always has a single defining
//! name, while Tac's return is already a name and is only looked up.

use std::collections::HashMap;

use tracing::debug;

use super::fresh::FreshNames;
use super::{calc, tac};
use crate::error::CompileError;

pub fn calc_prefix(function: &str) -> String {
    format!("_calc_{}", function)
}

pub fn tac_prefix(function: &str) -> String {
    format!("_tac_{}", function)
}

// variable -> current SSA name, owned by a single conversion
struct RenameTable<'f> {
    function: &'f str,
    names: HashMap<String, String>,
}

impl<'f> RenameTable<'f> {
    fn seeded(function: &'f str, params: &[String]) -> Self {
        Self {
            function,
            names: params.iter().map(|p| (p.clone(), p.clone())).collect(),
        }
    }

    fn lookup(&self, name: &str) -> Result<String, CompileError> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::undefined(self.function, name))
    }

    fn bind(&mut self, name: &str, fresh: String) {
        self.names.insert(name.to_string(), fresh);
    }
}

fn check_reserved<'a>(
    fresh: &FreshNames,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), CompileError> {
    for name in names {
        if fresh.owns(name) {
            return Err(CompileError::ReservedName {
                name: name.to_string(),
                prefix: fresh.prefix().to_string(),
            });
        }
    }
    Ok(())
}

fn rename_calc_exp(exp: &calc::Exp, table: &RenameTable<'_>) -> Result<calc::Exp, CompileError> {
    match exp {
        calc::Exp::Var(name) => Ok(calc::Exp::Var(table.lookup(name)?)),
        calc::Exp::BinOp { left, right, op } => Ok(calc::Exp::binop(
            rename_calc_exp(left, table)?,
            rename_calc_exp(right, table)?,
            *op,
        )),
    }
}

fn rename_tac_exp(exp: &tac::Exp, table: &RenameTable<'_>) -> Result<tac::Exp, CompileError> {
    match exp {
        tac::Exp::Var(name) => Ok(tac::Exp::Var(table.lookup(name)?)),
        tac::Exp::BinOp { left, right, op } => Ok(tac::Exp::BinOp {
            left: table.lookup(left)?,
            right: table.lookup(right)?,
            op: *op,
        }),
    }
}

/// Converts a Calc function to SSA form, ending in a synthetic assignment of
/// the return expression.
pub fn calc_to_ssa(f: &calc::Function) -> Result<calc::Function, CompileError> {
    let mut fresh = FreshNames::new(calc_prefix(&f.name));
    check_reserved(
        &fresh,
        f.params
            .iter()
            .map(String::as_str)
            .chain(f.body.iter().map(calc::Stm::target)),
    )?;

    let mut table = RenameTable::seeded(&f.name, &f.params);
    let mut body = Vec::with_capacity(f.body.len() + 1);

    for stm in &f.body {
        match stm {
            calc::Stm::Assign { target, value } => {
                let value = rename_calc_exp(value, &table)?;
                let name = fresh.next_name();
                table.bind(target, name.clone());
                body.push(calc::Stm::Assign { target: name, value });
            }
        }
    }

    let ret_value = rename_calc_exp(&f.ret, &table)?;
    let ret_name = fresh.next_name();
    body.push(calc::Stm::assign(ret_name.clone(), ret_value));

    debug!(function = %f.name, statements = body.len(), "calc ssa");
    Ok(calc::Function {
        name: f.name.clone(),
        params: f.params.clone(),
        body,
        ret: calc::Exp::Var(ret_name),
    })
}

/// Converts a Tac function to SSA form. The return name is only renamed.
pub fn tac_to_ssa(f: &tac::Function) -> Result<tac::Function, CompileError> {
    let mut fresh = FreshNames::new(tac_prefix(&f.name));
    check_reserved(
        &fresh,
        f.params
            .iter()
            .map(String::as_str)
            .chain(f.body.iter().map(tac::Stm::target)),
    )?;

    let mut table = RenameTable::seeded(&f.name, &f.params);
    let mut body = Vec::with_capacity(f.body.len());

    for stm in &f.body {
        match stm {
            tac::Stm::Assign { target, value } => {
                let value = rename_tac_exp(value, &table)?;
                let name = fresh.next_name();
                table.bind(target, name.clone());
                body.push(tac::Stm::Assign { target: name, value });
            }
        }
    }

    let ret = table.lookup(&f.ret)?;

    debug!(function = %f.name, statements = body.len(), "tac ssa");
    Ok(tac::Function {
        name: f.name.clone(),
        params: f.params.clone(),
        body,
        ret,
    })
}
