use std::fmt;

use tickscript_api::{EvalError, EvalErrorKind};

/// Failures surfaced by the host's entry points
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The app's module could not be found or its code could not be read
    LoadFailure { module: String, reason: String },
    /// A runtime or syntax error raised by the evaluator
    Evaluation(EvalError),
    /// A host-level protocol was violated (malformed config, missing package)
    InternalContract(String),
    /// A numeric domain error
    Arithmetic(String),
    /// A user-facing invocation failure (bad arguments, unknown function)
    Invocation(String),
    /// A hook was invoked with arguments its function does not accept
    InvalidCallback(InvalidCallback),
    /// Script execution is halted
    Paused,
}

impl ScriptError {
    /// The message reported to actors, without any intro
    pub fn message(&self) -> String {
        match self {
            ScriptError::Evaluation(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// The evaluator failure carrying source position and call stack, if any
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            ScriptError::Evaluation(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, ScriptError::Arithmetic(_))
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::LoadFailure { module, reason } => {
                write!(f, "Unable to load {} app - {}", module, reason)
            }
            ScriptError::Evaluation(e) => write!(f, "{}", e),
            ScriptError::InternalContract(msg) => write!(f, "{}", msg),
            ScriptError::Arithmetic(msg) => write!(f, "{}", msg),
            ScriptError::Invocation(msg) => write!(f, "{}", msg),
            ScriptError::InvalidCallback(e) => write!(f, "{}", e),
            ScriptError::Paused => write!(f, "SCRIPTS PAUSED"),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<EvalError> for ScriptError {
    fn from(e: EvalError) -> Self {
        match e.kind {
            EvalErrorKind::Arithmetic => ScriptError::Arithmetic(e.message),
            EvalErrorKind::Runtime | EvalErrorKind::Internal => ScriptError::Evaluation(e),
        }
    }
}

impl From<InvalidCallback> for ScriptError {
    fn from(e: InvalidCallback) -> Self {
        ScriptError::InvalidCallback(e)
    }
}

/// A hook's function rejected the arguments the runtime supplied
///
/// Never shown to an actor. The call site decides whether to ignore or log it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCallback {
    pub function: String,
    pub reason: String,
}

impl fmt::Display for InvalidCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid callback {}: {}", self.function, self.reason)
    }
}

impl std::error::Error for InvalidCallback {}
