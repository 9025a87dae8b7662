use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// A user-defined function produced by the evaluator
///
/// The host reads the name, the declared arguments and the defining module.
/// The body is opaque and only the evaluator that created it knows how to
/// downcast and run it.
#[derive(Clone)]
pub struct FunctionValue {
    name: String,
    module: Option<String>,
    arguments: Vec<String>,
    token: Option<Token>,
    body: Rc<dyn Any>,
}

impl FunctionValue {
    pub fn new(
        name: impl Into<String>,
        module: Option<String>,
        arguments: Vec<String>,
        body: Rc<dyn Any>,
    ) -> Self {
        Self {
            name: name.into(),
            module,
            arguments,
            token: None,
            body,
        }
    }

    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn arity(&self) -> usize {
        self.arguments.len()
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn body(&self) -> &Rc<dyn Any> {
        &self.body
    }

    /// `name(a, b)` form used in diagnostics
    pub fn pretty(&self) -> String {
        format!("{}({})", self.name, self.arguments.join(", "))
    }

    /// Name qualified by the defining module, used in stack traces
    pub fn full_name(&self) -> String {
        match &self.module {
            Some(module) => format!("{}.{}", module, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
