//! Contracts shared between the tickscript host runtime and its collaborators
//!
//! The expression evaluator, the tokenizer and the game world live outside the
//! host. This crate holds the types that cross those boundaries so that both
//! sides can depend on it without depending on each other.

pub mod actor;
pub mod argument;
pub mod error;
pub mod events;
pub mod function;
pub mod module;
pub mod token;
pub mod value;

pub use actor::{Actor, BlockPos, Message, Tone};
pub use argument::CommandArgument;
pub use error::{EvalError, EvalErrorKind, SourceRef, StackFrame};
pub use events::Event;
pub use function::FunctionValue;
pub use module::Module;
pub use token::{Token, TokenKind, Tokenizer};
pub use value::{LazyValue, Value};
