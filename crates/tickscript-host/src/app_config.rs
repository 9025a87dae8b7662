//! Hooks recognized when an app's main module defines functions
//!
//! `__config` is called once, as soon as it is defined, so the rest of the
//! module loads with the app's scope and argument types in place.
//! `__on_<event>` subscribes the host to a built-in event.

use std::collections::BTreeMap;
use tracing::debug;

use tickscript_api::{BlockPos, CommandArgument, FunctionValue, Value};

use crate::error::ScriptError;
use crate::host::{HookKind, HostId, CONFIG_HOOK};
use crate::server::ScriptServer;

/// Value of `scope` selecting one host per player
pub const PLAYER_SCOPE: &str = "player";

fn invalid_config() -> ScriptError {
    ScriptError::InternalContract("Invalid app config (via '__config()' function)".to_string())
}

impl ScriptServer {
    /// Record a function definition and act on main-module hooks
    pub fn add_user_defined_function(
        &mut self,
        id: HostId,
        function: FunctionValue,
    ) -> Result<(), ScriptError> {
        let Some(host) = self.hosts.get_mut(&id) else {
            return Err(ScriptError::InternalContract(format!("unknown host {:?}", id)));
        };
        let name = function.name().to_string();
        let module = function.module().map(str::to_string);
        host.insert_function(module.as_deref(), function);

        // imports never configure the app or subscribe it to events
        if !host.is_main_module(module.as_deref()) {
            return Ok(());
        }

        match HookKind::classify(&name) {
            HookKind::Event(event) => self.events.bind(event, id, &name),
            HookKind::Config => {
                if host.is_root() {
                    self.read_config(id)?;
                }
            }
            HookKind::Close | HookKind::Reserved | HookKind::Plain => {}
        }
        Ok(())
    }

    /// Remove a function definition, dropping its event binding if it had one
    pub fn delete_function(&mut self, id: HostId, module: Option<&str>, name: &str) {
        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        host.remove_function(module, name);
        if let HookKind::Event(event) = HookKind::classify(name) {
            self.events.unbind(event, id, name);
        }
    }

    /// Run the config hook and apply its result
    ///
    /// The result must be a map. `scope` defaults to `"player"`,
    /// `stay_loaded` to false, and every entry of `arguments` must itself be a
    /// map describing a command argument type. Nothing is applied unless the
    /// whole config is valid.
    fn read_config(&mut self, id: HostId) -> Result<(), ScriptError> {
        let Some(hook) = self
            .hosts
            .get(&id)
            .and_then(|h| h.function(CONFIG_HOOK))
            .cloned()
        else {
            return Ok(());
        };

        let actor = self.world.server_actor();
        let result = self
            .call_udf(id, BlockPos::ORIGIN, &actor, &hook, Vec::new())
            .map_err(|_| invalid_config())?;
        let Value::Map(config) = result else {
            return Err(invalid_config());
        };

        let per_user = config
            .get("scope")
            .map_or_else(|| PLAYER_SCOPE.to_string(), Value::as_string)
            .eq_ignore_ascii_case(PLAYER_SCOPE);
        let stay_loaded = config.get("stay_loaded").is_some_and(Value::as_bool);
        let arg_types = match config.get("arguments") {
            Some(arguments) => build_arg_types(arguments)?,
            None => BTreeMap::new(),
        };

        let Some(host) = self.hosts.get_mut(&id) else {
            return Err(invalid_config());
        };
        debug!(
            target: "scripting",
            "Config of {:?}: per_user={} stay_loaded={} arguments={}",
            host.name(),
            per_user,
            stay_loaded,
            arg_types.len()
        );
        host.set_per_user(per_user);
        host.persistence_required = stay_loaded;
        host.arg_types.extend(arg_types);
        host.config = config;
        Ok(())
    }
}

fn build_arg_types(
    arguments: &Value,
) -> Result<BTreeMap<String, CommandArgument>, ScriptError> {
    let Value::Map(arguments) = arguments else {
        return Err(ScriptError::InternalContract(
            "'arguments' element in config should be a map".to_string(),
        ));
    };
    let mut arg_types = BTreeMap::new();
    for (argument, spec) in arguments {
        let Value::Map(spec) = spec else {
            return Err(ScriptError::InternalContract(format!(
                "Spec for '{}' should be a map",
                argument
            )));
        };
        let compiled = CommandArgument::build_from_config(argument, spec)
            .map_err(ScriptError::InternalContract)?;
        arg_types.insert(argument.clone(), compiled);
    }
    Ok(arg_types)
}
