//! Calc to Tac lowering with per-function translation validation.
//!
//! The compiler turns nested arithmetic (Calc) into three-address code (Tac).
//! Each lowering can be checked by encoding both functions as equalities over
//! uninterpreted functions and asking an [`oracle`] whether their return
//! values can differ.

pub mod compiler;
pub mod config;
pub mod encoder;
pub mod error;
pub mod oracle;
pub mod smt;
pub mod validation;
pub mod verifier;

mod tests;

pub use compiler::parser::{parse_calc, parse_tac};
pub use compiler::{calc, tac, CalcCompiler};
pub use config::{OracleKind, ValidatorConfig};
pub use encoder::EncodingContext;
pub use error::{CompileError, OracleError, ValidationError};
pub use oracle::{CheckResult, CongruenceOracle, Model, Oracle, Script, SmtLibOracle};
pub use verifier::{TranslationValidator, ValidationReport, Verdict};
