use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// What kind of failure the evaluator raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Runtime or syntax error in user code
    Runtime,
    /// A host protocol was violated while user code was running
    Internal,
    /// Numeric domain error the evaluator did not guard
    Arithmetic,
}

/// The source text an error points into
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    /// Module name, `None` for code typed directly into the console
    pub module: Option<String>,
    pub code: Rc<str>,
}

/// One function frame of an error's call stack
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub function: String,
    pub token: Option<Token>,
}

/// Failure raised by the evaluator
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub message: String,
    pub source: Option<SourceRef>,
    pub token: Option<Token>,
    pub stack: Vec<StackFrame>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            token: None,
            stack: Vec::new(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Runtime, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Arithmetic, message)
    }

    pub fn at(mut self, source: SourceRef, token: Token) -> Self {
        self.source = Some(source);
        self.token = Some(token);
        self
    }

    pub fn with_frame(mut self, function: impl Into<String>, token: Option<Token>) -> Self {
        self.stack.push(StackFrame {
            function: function.into(),
            token,
        });
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EvalError {}
