use crate::error::EvalError;

/// Token kinds produced by the tokenizer's flat pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Variable,
    StringParam,
    Literal,
    HexLiteral,
    Operator,
    UnaryOperator,
    Function,
    OpenParen,
    Comma,
    CloseParen,
    Marker,
}

/// A token with its position in the source text
///
/// `pos` is the absolute character offset, `lineno` and `linepos` are both
/// zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub surface: String,
    pub pos: usize,
    pub lineno: usize,
    pub linepos: usize,
}

impl Token {
    pub fn new(kind: TokenKind, surface: impl Into<String>) -> Self {
        Self {
            kind,
            surface: surface.into(),
            pos: 0,
            lineno: 0,
            linepos: 0,
        }
    }

    pub fn at(mut self, pos: usize, lineno: usize, linepos: usize) -> Self {
        self.pos = pos;
        self.lineno = lineno;
        self.linepos = linepos;
        self
    }
}

/// The tokenizer collaborator
///
/// Only the flat pass is needed by the host, for binding arguments supplied
/// as raw text by command integrations.
pub trait Tokenizer {
    fn simple_pass(&self, input: &str) -> Result<Vec<Token>, EvalError>;
}
