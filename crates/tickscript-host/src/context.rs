use std::rc::Rc;

use tickscript_api::{
    Actor, BlockPos, EvalError, FunctionValue, LazyValue, Module, Value,
};

use crate::host::{Host, HostId};
use crate::server::ScriptServer;
use crate::store::StateBlob;

/// The expression evaluator collaborator
///
/// The host never looks inside function bodies. It asks the evaluator to run
/// a module as a program, or to call a function with bound arguments, and the
/// evaluator reports definitions back through the [`Context`].
pub trait Evaluator {
    /// Evaluate a module's code as a program under the context's host
    fn run_module(&self, ctx: &mut Context<'_>, module: &Module) -> Result<Value, EvalError>;

    /// Call a function body with non-strict argument bindings
    fn call_function(
        &self,
        ctx: &mut Context<'_>,
        function: &FunctionValue,
        args: Vec<LazyValue>,
    ) -> Result<Value, EvalError>;

    /// Check that a callback accepts `args`. Evaluators with default values
    /// or typed parameters override this; the default is an arity check.
    fn check_callback_args(&self, function: &FunctionValue, args: &[Value]) -> Result<(), String> {
        if args.len() == function.arity() {
            Ok(())
        } else {
            Err(format!(
                "{} takes {} arguments, not {}",
                function.pretty(),
                function.arity(),
                args.len()
            ))
        }
    }
}

/// One evaluation: the server, the host the code runs under, the actor that
/// asked for it and the origin position
pub struct Context<'a> {
    pub(crate) server: &'a mut ScriptServer,
    host: HostId,
    actor: Actor,
    origin: BlockPos,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        server: &'a mut ScriptServer,
        host: HostId,
        actor: Actor,
        origin: BlockPos,
    ) -> Self {
        Self {
            server,
            host,
            actor,
            origin,
        }
    }

    pub fn host_id(&self) -> HostId {
        self.host
    }

    pub fn host(&self) -> Option<&Host> {
        self.server.host(self.host)
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    pub fn is_stopped(&self) -> bool {
        self.server.is_stopped()
    }

    // ===== Definitions =====

    /// Record a top-level function definition. Definitions in the main module
    /// may be hooks; a malformed config hook fails the definition.
    pub fn define_function(&mut self, function: FunctionValue) -> Result<(), EvalError> {
        self.server
            .add_user_defined_function(self.host, function)
            .map_err(|e| EvalError::internal(e.to_string()))
    }

    pub fn delete_function(&mut self, module: Option<&str>, name: &str) {
        self.server.delete_function(self.host, module, name);
    }

    pub fn function(&self, name: &str) -> Option<FunctionValue> {
        self.host().and_then(|h| h.function(name)).cloned()
    }

    pub fn global_variable(&self, name: &str) -> Option<LazyValue> {
        self.host().and_then(|h| h.global_variable(name))
    }

    pub fn set_global_variable(&mut self, module: Option<&str>, name: &str, value: LazyValue) {
        if let Some(host) = self.server.hosts.get_mut(&self.host) {
            host.set_global_variable(module, name, value);
        }
    }

    /// Run a library's code under this host, once
    pub fn import_module(&mut self, name: &str) -> Result<(), EvalError> {
        let module = self
            .server
            .modules
            .module(name, true)
            .filter(|m| m.code().is_some())
            .ok_or_else(|| EvalError::internal(format!("Unable to locate package: {}", name)))?;

        let Some(host) = self.server.hosts.get_mut(&self.host) else {
            return Err(EvalError::internal("host is gone"));
        };
        if !host.mark_imported(module.name()) {
            return Ok(());
        }

        let evaluator = Rc::clone(&self.server.evaluator);
        evaluator.run_module(self, &module).map(|_| ())
    }

    // ===== Persistence =====

    pub fn read_global_state(&self) -> Result<Option<StateBlob>, EvalError> {
        self.read_file_tag(None, false)
    }

    /// Replace the app's global state; false when this host has none
    pub fn write_global_state(&mut self, blob: Option<StateBlob>) -> Result<bool, EvalError> {
        self.server
            .write_global_state(self.host, blob)
            .map_err(io_error)
    }

    pub fn read_file_tag(
        &self,
        file: Option<&str>,
        shared: bool,
    ) -> Result<Option<StateBlob>, EvalError> {
        self.server
            .read_file_tag(self.host, file, shared)
            .map_err(io_error)
    }

    pub fn write_tag_file(
        &mut self,
        tag: StateBlob,
        file: Option<&str>,
        shared: bool,
    ) -> Result<bool, EvalError> {
        self.server
            .write_tag_file(self.host, tag, file, shared)
            .map_err(io_error)
    }

    pub fn append_log_file(
        &mut self,
        resource: &str,
        shared: bool,
        type_name: &str,
        lines: &[String],
    ) -> Result<bool, EvalError> {
        self.server
            .append_log_file(self.host, resource, shared, type_name, lines)
            .map_err(io_error)
    }

    pub fn read_text_resource(
        &self,
        resource: &str,
        shared: bool,
    ) -> Result<Option<Vec<String>>, EvalError> {
        self.server
            .read_text_resource(self.host, resource, shared)
            .map_err(io_error)
    }

    pub fn remove_resource_file(
        &mut self,
        resource: &str,
        shared: bool,
        type_name: &str,
    ) -> Result<bool, EvalError> {
        self.server
            .remove_resource_file(self.host, resource, shared, type_name)
            .map_err(io_error)
    }
}

fn io_error(e: anyhow::Error) -> EvalError {
    EvalError::runtime(format!("{:#}", e))
}
