use thiserror::Error;

/// Errors raised by the front end and the compiler passes.
///
/// All of them describe a malformed input function; none is transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("undefined variable `{name}` in function `{function}`")]
    UndefinedVariable { function: String, name: String },

    #[error("unsupported binary operator `{0}`")]
    UnsupportedOperator(String),

    #[error("lowering requires a variable return expression, got `{0}`")]
    InvalidReturnShape(String),

    #[error("identifier `{name}` collides with generated names `{prefix}_N`")]
    ReservedName { name: String, prefix: String },

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("function `{function}` is malformed: {reason}")]
    Malformed { function: String, reason: String },
}

impl CompileError {
    pub(crate) fn undefined(function: &str, name: &str) -> Self {
        CompileError::UndefinedVariable {
            function: function.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn malformed(function: &str, reason: impl Into<String>) -> Self {
        CompileError::Malformed {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while talking to a decision procedure.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("solver unavailable: {0}")]
    Unavailable(String),

    #[error("solver i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected solver output: {0}")]
    Protocol(String),

    #[error("oracle task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Errors surfaced by translation validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("oracle could not decide equivalence of `{function}`: {reason}")]
    OracleUnknown { function: String, reason: String },

    #[error("lowering of `{function}` is not equivalent: {counterexample}")]
    NotEquivalent {
        function: String,
        counterexample: String,
    },
}
