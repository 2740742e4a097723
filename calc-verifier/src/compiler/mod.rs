use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

pub mod calc;
pub mod fresh;
pub mod interp;
pub mod ir;
pub mod lowering;
pub mod parser;
pub mod ssa;
pub mod tac;

use crate::error::CompileError;
use crate::validation::FunctionValidator;
use lowering::CalcLowering;

/// Calc to Tac compiler front: validates, lowers, and memoizes results by
/// the SHA-256 of the printed source.
pub struct CalcCompiler {
    validator: FunctionValidator,
    cache: HashMap<String, Arc<tac::Function>>,
}

impl Default for CalcCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl CalcCompiler {
    pub fn new() -> Self {
        Self::with_validator(FunctionValidator::default())
    }

    pub fn with_validator(validator: FunctionValidator) -> Self {
        Self {
            validator,
            cache: HashMap::with_capacity(64),
        }
    }

    pub fn compile(&mut self, f: &calc::Function) -> Result<tac::Function, CompileError> {
        self.validator.validate_calc(f)?;

        let key = source_hash(f);
        if let Some(cached) = self.cache.get(&key) {
            debug!(function = %f.name, "compile cache hit");
            return Ok((**cached).clone());
        }

        let lowered = CalcLowering::new(&f.name).lower_function(f)?;

        self.cache.insert(key, Arc::new(lowered.clone()));
        Ok(lowered)
    }

    /// Parses Calc text and compiles it.
    pub fn compile_source(&mut self, source: &str) -> Result<tac::Function, CompileError> {
        let f = parser::parse_calc_with_depth(source, self.validator.max_expression_depth())?;
        self.compile(&f)
    }

    pub fn validator(&self) -> &FunctionValidator {
        &self.validator
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Hex SHA-256 of the printed form of a Calc function.
pub fn source_hash(f: &calc::Function) -> String {
    let mut hasher = Sha256::new();
    hasher.update(f.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
