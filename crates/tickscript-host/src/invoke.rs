//! The three ways into a user-defined function
//!
//! - [`ScriptServer::call`]: typed values, from command frameworks
//! - [`ScriptServer::call_legacy`]: a raw argument string, from text commands
//! - [`ScriptServer::call_udf`]: hooks invoked by the runtime itself
//!
//! All of them stop before touching arguments when execution is paused, and
//! they are the only place evaluator failures are translated for reporting.

use std::rc::Rc;

use tickscript_api::{Actor, BlockPos, FunctionValue, LazyValue, Value};

use crate::context::Context;
use crate::error::{InvalidCallback, ScriptError};
use crate::host::HostId;
use crate::legacy;
use crate::server::ScriptServer;

/// Placeholder for a missing parameter or value in arity reports
const MISSING: &str = "??";

/// Describe an arity mismatch, pairing each declared parameter with the
/// value supplied for it
pub fn arity_mismatch(function: &str, params: &[String], supplied: &[LazyValue]) -> String {
    let mut error = format!(
        "Fail: stored function {} takes {} arguments, not {}:\n",
        function,
        params.len(),
        supplied.len()
    );
    for i in 0..params.len().max(supplied.len()) {
        let param = params.get(i).map_or(MISSING, String::as_str);
        let value = supplied
            .get(i)
            .map_or_else(|| MISSING.to_string(), |v| v.eval().as_string());
        error.push_str(&format!("{} => {}\n", param, value));
    }
    error
}

fn check_arity(display: &str, function: &FunctionValue, argv: &[LazyValue]) -> Result<(), ScriptError> {
    if argv.len() == function.arity() {
        Ok(())
    } else {
        Err(ScriptError::Invocation(arity_mismatch(
            display,
            function.arguments(),
            argv,
        )))
    }
}

fn command_intro(error: &ScriptError) -> &'static str {
    if error.is_arithmetic() {
        "Math doesn't compute"
    } else {
        "Error while running custom command"
    }
}

impl ScriptServer {
    /// Call a function with already materialized values
    pub fn call(
        &mut self,
        host: HostId,
        actor: &Actor,
        function: &FunctionValue,
        args: Vec<Value>,
    ) -> Result<Value, ScriptError> {
        if self.state.stop_all {
            return Err(ScriptError::Paused);
        }
        let argv = LazyValue::lazify(args);
        check_arity(&function.pretty(), function, &argv)?;
        self.evaluate(host, actor, BlockPos::ORIGIN, function, argv)
    }

    /// Call a function by name with arguments given as text
    ///
    /// `coords` are passed first, as numbers, followed by one argument per
    /// token of `arg`.
    pub fn call_legacy(
        &mut self,
        host: HostId,
        actor: &Actor,
        call: &str,
        coords: &[i32],
        arg: &str,
    ) -> Result<Value, ScriptError> {
        if self.state.stop_all {
            return Err(ScriptError::Paused);
        }
        let Some(function) = self.host(host).and_then(|h| h.function(call)).cloned() else {
            return Err(ScriptError::Invocation(format!("Fail: function {} is undefined", call)));
        };

        let tokens = self.tokenizer.simple_pass(arg)?;
        let argv = {
            let host_ref = self.host(host);
            legacy::bind_arguments(coords, &tokens, |name| {
                host_ref.and_then(|h| h.global_variable(name))
            })?
        };
        check_arity(call, &function, &argv)?;
        self.evaluate(host, actor, BlockPos::ORIGIN, &function, argv)
    }

    /// Invoke a hook
    ///
    /// Arguments go through the function's own contract check; a rejection is
    /// an [`InvalidCallback`] for the caller to handle. Evaluation failures
    /// are reported and yield `null`, and a paused server yields `null`
    /// without evaluating.
    pub fn call_udf(
        &mut self,
        host: HostId,
        origin: BlockPos,
        actor: &Actor,
        function: &FunctionValue,
        args: Vec<Value>,
    ) -> Result<Value, InvalidCallback> {
        if self.state.stop_all {
            return Ok(Value::Null);
        }
        self.evaluator
            .check_callback_args(function, &args)
            .map_err(|reason| InvalidCallback {
                function: function.name().to_string(),
                reason,
            })?;

        match self.evaluate(host, actor, origin, function, LazyValue::lazify(args)) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.handle_error_with_stack(host, "Callback failed", &e);
                Ok(Value::Null)
            }
        }
    }

    /// [`call`](Self::call), reporting failures to the host's sink
    pub fn handle_command(
        &mut self,
        host: HostId,
        actor: &Actor,
        function: &FunctionValue,
        args: Vec<Value>,
    ) -> Value {
        self.call(host, actor, function, args)
            .unwrap_or_else(|e| {
                self.handle_error_with_stack(host, command_intro(&e), &e);
                Value::Null
            })
    }

    /// [`call_legacy`](Self::call_legacy), reporting failures to the host's
    /// sink
    pub fn handle_command_legacy(
        &mut self,
        host: HostId,
        actor: &Actor,
        call: &str,
        coords: &[i32],
        arg: &str,
    ) -> Value {
        self.call_legacy(host, actor, call, coords, arg)
            .unwrap_or_else(|e| {
                self.handle_error_with_stack(host, command_intro(&e), &e);
                Value::Null
            })
    }

    fn evaluate(
        &mut self,
        host: HostId,
        actor: &Actor,
        origin: BlockPos,
        function: &FunctionValue,
        argv: Vec<LazyValue>,
    ) -> Result<Value, ScriptError> {
        if !self.hosts.contains_key(&host) {
            return Err(ScriptError::InternalContract(format!("unknown host {:?}", host)));
        }
        let evaluator = Rc::clone(&self.evaluator);
        let mut ctx = Context::new(self, host, actor.clone(), origin);
        evaluator
            .call_function(&mut ctx, function, argv)
            .map_err(ScriptError::from)
    }
}
