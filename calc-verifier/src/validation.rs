use std::collections::HashSet;

use crate::compiler::calc;
use crate::compiler::ir::is_identifier;
use crate::error::CompileError;

/// Default cap on the number of statements in one function body.
pub const MAX_STATEMENTS: usize = 10_000;

/// Default cap on the operator nesting of a single expression. The compiler
/// passes recurse once per level.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Structural checks on Calc input before it reaches the compiler
pub struct FunctionValidator {
    max_statements: usize,
    max_expression_depth: usize,
}

impl Default for FunctionValidator {
    fn default() -> Self {
        Self::new(MAX_STATEMENTS)
    }
}

impl FunctionValidator {
    pub fn new(max_statements: usize) -> Self {
        Self {
            max_statements,
            max_expression_depth: MAX_EXPRESSION_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_expression_depth: usize) -> Self {
        self.max_expression_depth = max_expression_depth;
        self
    }

    pub fn max_expression_depth(&self) -> usize {
        self.max_expression_depth
    }

    /// Rejects any statement or return expression nested deeper than the limit.
    pub fn check_expression_depth(&self, f: &calc::Function) -> Result<(), CompileError> {
        let values = f.body.iter().map(calc::Stm::value);
        for exp in values.chain(std::iter::once(&f.ret)) {
            let depth = exp.depth();
            if depth > self.max_expression_depth {
                return Err(CompileError::malformed(
                    &f.name,
                    format!(
                        "expression depth {} exceeds limit of {}",
                        depth, self.max_expression_depth
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Validate a Calc function is well formed
    pub fn validate_calc(&self, f: &calc::Function) -> Result<(), CompileError> {
        if !is_identifier(&f.name) {
            return Err(CompileError::malformed(&f.name, "function name is not an identifier"));
        }

        if f.body.len() > self.max_statements {
            return Err(CompileError::malformed(
                &f.name,
                format!("{} statements exceeds limit of {}", f.body.len(), self.max_statements),
            ));
        }

        self.check_expression_depth(f)?;
        Self::check_params(f)?;
        Self::check_definitions(f)?;

        Ok(())
    }

    fn check_params(f: &calc::Function) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for param in &f.params {
            if !is_identifier(param) {
                return Err(CompileError::malformed(
                    &f.name,
                    format!("parameter `{}` is not an identifier", param),
                ));
            }
            if !seen.insert(param.as_str()) {
                return Err(CompileError::malformed(
                    &f.name,
                    format!("duplicate parameter `{}`", param),
                ));
            }
        }
        Ok(())
    }

    /// Every read must follow a parameter binding or an earlier assignment
    fn check_definitions(f: &calc::Function) -> Result<(), CompileError> {
        let mut defined: HashSet<&str> = f.params.iter().map(String::as_str).collect();

        for stm in &f.body {
            match stm {
                calc::Stm::Assign { target, value } => {
                    for name in value.reads() {
                        if !defined.contains(name) {
                            return Err(CompileError::undefined(&f.name, name));
                        }
                    }
                    if !is_identifier(target) {
                        return Err(CompileError::malformed(
                            &f.name,
                            format!("assignment target `{}` is not an identifier", target),
                        ));
                    }
                    defined.insert(target.as_str());
                }
            }
        }

        for name in f.ret.reads() {
            if !defined.contains(name) {
                return Err(CompileError::undefined(&f.name, name));
            }
        }

        Ok(())
    }
}
