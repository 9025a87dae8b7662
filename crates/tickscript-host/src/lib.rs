//! Host runtime for script applications on a tick-driven game server
//!
//! A [`ScriptServer`] owns one root [`Host`] per loaded app (plus an unnamed
//! host for code that belongs to no app). Apps scoped per player get a child
//! host per user so that one player's state never leaks into another's.
//! Apps are invoked through [`ScriptServer::call`],
//! [`ScriptServer::call_legacy`] and [`ScriptServer::call_udf`]; failures
//! are reported to the actor bound to the host.
//!
//! The expression evaluator, tokenizer, game world and blob storage are
//! collaborators behind the [`Evaluator`], [`Tokenizer`], [`World`] and
//! [`StateStore`] traits.

pub mod app_config;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod invoke;
mod legacy;
pub mod modules;
mod resources;
pub mod server;
pub mod sink;
pub mod state;
pub mod store;
pub mod world;

pub use tickscript_api as api;
pub use tickscript_api::Tokenizer;

pub use config::{ConfigLoadError, HostSettings};
pub use context::{Context, Evaluator};
pub use dispatch::{EventBinding, EventDispatch};
pub use error::{InvalidCallback, ScriptError};
pub use host::{HookKind, Host, HostId};
pub use modules::{DirModuleSource, MemoryModuleSource, ModuleSource};
pub use server::ScriptServer;
pub use sink::ReportSink;
pub use state::ExecutionState;
pub use store::{FileStore, MemoryStore, ResourceKey, ResourceKind, StateBlob, StateStore};
pub use world::{NullWorld, World};
