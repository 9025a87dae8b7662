use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use tickscript_api::{Actor, CommandArgument, Event, FunctionValue, LazyValue, Module, Value};

use crate::sink::ReportSink;
use crate::state::ExecutionState;
use crate::store::{ResourceKey, StateBlob, StateStore};

/// Functions and variables with this prefix are reserved for the runtime
pub const RESERVED_PREFIX: &str = "__";
/// Config hook, called once while the app's main module loads
pub const CONFIG_HOOK: &str = "__config";
/// Close hook, called when the host is torn down
pub const CLOSE_HOOK: &str = "__on_close";
/// Prefix of event hooks, followed by a built-in event name
pub const EVENT_HOOK_PREFIX: &str = "__on_";

/// Index of a host in the server's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub(crate) usize);

/// What the runtime makes of a function name, decided once at definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Config,
    Event(Event),
    Close,
    /// Reserved name with no meaning yet
    Reserved,
    Plain,
}

impl HookKind {
    pub fn classify(name: &str) -> Self {
        if !name.starts_with(RESERVED_PREFIX) {
            return HookKind::Plain;
        }
        if name == CONFIG_HOOK {
            return HookKind::Config;
        }
        if name == CLOSE_HOOK {
            return HookKind::Close;
        }
        name.strip_prefix(EVENT_HOOK_PREFIX)
            .and_then(Event::from_name)
            .map_or(HookKind::Reserved, HookKind::Event)
    }
}

/// Definitions made by one module inside a host
#[derive(Debug, Default)]
pub(crate) struct ModuleData {
    functions: BTreeMap<String, FunctionValue>,
    globals: BTreeMap<String, LazyValue>,
}

/// The runtime identity under which one instance of an app's code executes
///
/// A root host is created per loaded app. Apps scoped per player get one
/// child host per user, created lazily and linked back by `parent`. Only
/// roots hold global state; children delegate to their parent.
pub struct Host {
    id: HostId,
    module: Option<Module>,
    parent: Option<HostId>,
    user: Option<String>,
    per_user: bool,
    pub(crate) user_hosts: BTreeMap<String, HostId>,
    pub(crate) config: BTreeMap<String, Value>,
    pub(crate) arg_types: BTreeMap<String, CommandArgument>,
    global_state: Option<StateBlob>,
    save_timeout: u32,
    pub(crate) persistence_required: bool,
    error_sink: Option<ReportSink>,
    module_data: BTreeMap<String, ModuleData>,
    imported: BTreeSet<String>,
}

impl Host {
    /// Create a root host, loading the app's persisted global state
    pub(crate) fn new_root(
        id: HostId,
        module: Option<Module>,
        per_user: bool,
        store: &dyn StateStore,
    ) -> Self {
        let global_state = module
            .as_ref()
            .and_then(|m| load_state(m.name(), store));
        Self {
            id,
            // the unnamed host belongs to no app and is never recreated from source
            persistence_required: module.is_none(),
            module,
            parent: None,
            user: None,
            per_user,
            user_hosts: BTreeMap::new(),
            config: BTreeMap::new(),
            arg_types: BTreeMap::new(),
            global_state,
            save_timeout: 0,
            error_sink: None,
            module_data: BTreeMap::new(),
            imported: BTreeSet::new(),
        }
    }

    /// Structural copy for one user: same module, config, argument types and
    /// persistence flag, with empty definitions
    pub(crate) fn duplicate_for(&self, id: HostId, user: &str) -> Self {
        Self {
            id,
            module: self.module.clone(),
            parent: Some(self.id),
            user: Some(user.to_string()),
            per_user: false,
            user_hosts: BTreeMap::new(),
            config: self.config.clone(),
            arg_types: self.arg_types.clone(),
            global_state: None,
            save_timeout: 0,
            persistence_required: self.persistence_required,
            error_sink: None,
            module_data: BTreeMap::new(),
            imported: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    /// App name, `None` for the unnamed host
    pub fn name(&self) -> Option<&str> {
        self.module.as_ref().map(|m| m.name())
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn parent(&self) -> Option<HostId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The user a child host serves
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_per_user(&self) -> bool {
        self.per_user
    }

    pub(crate) fn set_per_user(&mut self, per_user: bool) {
        self.per_user = per_user;
    }

    pub fn user_host(&self, user: &str) -> Option<HostId> {
        self.user_hosts.get(user).copied()
    }

    pub fn user_hosts(&self) -> impl Iterator<Item = (&str, HostId)> {
        self.user_hosts.iter().map(|(user, id)| (user.as_str(), *id))
    }

    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.config
    }

    pub fn arg_types(&self) -> &BTreeMap<String, CommandArgument> {
        &self.arg_types
    }

    pub fn persistence_required(&self) -> bool {
        self.persistence_required
    }

    pub fn save_timeout(&self) -> u32 {
        self.save_timeout
    }

    /// In-memory global state. Always `None` on child hosts.
    pub fn global_state(&self) -> Option<&StateBlob> {
        self.global_state.as_ref()
    }

    // ===== Definitions =====

    /// Key of the main module's definitions
    pub(crate) fn main_key(&self) -> String {
        module_key(self.name())
    }

    /// Whether `module` is this host's main module (not an import)
    pub(crate) fn is_main_module(&self, module: Option<&str>) -> bool {
        module_key(module) == self.main_key()
    }

    /// Look up a function defined by the main module
    pub fn function(&self, name: &str) -> Option<&FunctionValue> {
        self.module_data
            .get(&self.main_key())
            .and_then(|data| data.functions.get(name))
    }

    pub fn function_names(&self) -> Vec<String> {
        self.module_data
            .get(&self.main_key())
            .map(|data| data.functions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn insert_function(&mut self, module: Option<&str>, function: FunctionValue) {
        self.module_data
            .entry(module_key(module))
            .or_default()
            .functions
            .insert(function.name().to_string(), function);
    }

    pub(crate) fn remove_function(&mut self, module: Option<&str>, name: &str) -> bool {
        self.module_data
            .get_mut(&module_key(module))
            .is_some_and(|data| data.functions.remove(name).is_some())
    }

    /// Look up a global variable of the main module
    pub fn global_variable(&self, name: &str) -> Option<LazyValue> {
        self.module_data
            .get(&self.main_key())
            .and_then(|data| data.globals.get(name))
            .cloned()
    }

    pub(crate) fn set_global_variable(&mut self, module: Option<&str>, name: &str, value: LazyValue) {
        self.module_data
            .entry(module_key(module))
            .or_default()
            .globals
            .insert(name.to_string(), value);
    }

    /// Record an import, returning false if the module was already imported
    pub(crate) fn mark_imported(&mut self, module: &str) -> bool {
        self.imported.insert(module.to_string())
    }

    // ===== Error sink =====

    pub fn error_sink(&self) -> Option<&ReportSink> {
        self.error_sink.as_ref()
    }

    pub(crate) fn set_error_sink(&mut self, actor: Actor) {
        self.error_sink = Some(ReportSink::new(actor));
    }

    /// Bind the sink to `actor` unless one is already bound
    pub(crate) fn bind_error_sink(&mut self, actor: &Actor) {
        if self.error_sink.is_none() {
            self.set_error_sink(actor.clone());
        }
    }

    pub(crate) fn reset_error_sink(&mut self) {
        self.error_sink = None;
    }

    // ===== Persistence =====

    /// Replace global state, flushing at once unless a save is pending
    pub(crate) fn store_global_state(
        &mut self,
        blob: Option<StateBlob>,
        state: &ExecutionState,
        store: &mut dyn StateStore,
    ) -> anyhow::Result<()> {
        debug_assert!(self.is_root(), "only root hosts hold global state");
        self.global_state = blob;
        if self.save_timeout == 0 {
            self.dump_state(store)?;
            self.save_timeout = state.save_debounce_ticks;
        }
        Ok(())
    }

    /// Advance the save debounce by one tick, flushing when it runs out
    pub(crate) fn tick(&mut self, store: &mut dyn StateStore) {
        if self.save_timeout > 0 {
            self.save_timeout -= 1;
            if self.save_timeout == 0 {
                if let Err(e) = self.dump_state(store) {
                    warn!(target: "scripting", "Failed to save state of {}: {:#}", self.main_key(), e);
                }
            }
        }
    }

    /// Flush a pending save regardless of the debounce counter
    pub(crate) fn flush_pending(&mut self, store: &mut dyn StateStore) {
        if self.save_timeout > 0 {
            self.save_timeout = 0;
            if let Err(e) = self.dump_state(store) {
                warn!(target: "scripting", "Failed to save state of {}: {:#}", self.main_key(), e);
            }
        }
    }

    fn dump_state(&self, store: &mut dyn StateStore) -> anyhow::Result<()> {
        let Some(name) = self.name() else {
            return Ok(());
        };
        let key = ResourceKey::global_state(name);
        match &self.global_state {
            Some(blob) => store.write(&key, blob),
            None => store.delete(&key).map(|_| ()),
        }?;
        debug!(target: "scripting", "Saved global state of {}", name);
        Ok(())
    }
}

fn module_key(module: Option<&str>) -> String {
    module.unwrap_or_default().to_string()
}

fn load_state(module: &str, store: &dyn StateStore) -> Option<StateBlob> {
    match store.read(&ResourceKey::global_state(module)) {
        Ok(state) => state,
        Err(e) => {
            warn!(target: "scripting", "Failed to load state of {}: {:#}", module, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_classify_hooks() {
        assert_eq!(HookKind::classify("__config"), HookKind::Config);
        assert_eq!(HookKind::classify("__on_close"), HookKind::Close);
        assert_eq!(
            HookKind::classify("__on_player_jumps"),
            HookKind::Event(Event::PlayerJumps)
        );
        assert_eq!(HookKind::classify("__on_made_up"), HookKind::Reserved);
        assert_eq!(HookKind::classify("__helper"), HookKind::Reserved);
        assert_eq!(HookKind::classify("on_tick"), HookKind::Plain);
        assert_eq!(HookKind::classify("main"), HookKind::Plain);
    }

    #[test]
    fn test_root_loads_state() {
        let mut store = MemoryStore::new();
        store
            .write(&ResourceKey::global_state("camera"), b"saved")
            .unwrap();
        let host = Host::new_root(HostId(1), Some(Module::new("camera", Some(""))), false, &store);
        assert_eq!(host.global_state(), Some(&b"saved".to_vec()));
        assert!(!host.persistence_required());
    }

    #[test]
    fn test_duplicate_is_single_user_child() {
        let store = MemoryStore::new();
        let mut root = Host::new_root(HostId(1), Some(Module::new("camera", Some(""))), true, &store);
        root.config.insert("scope".to_string(), Value::from("player"));
        root.persistence_required = true;

        let child = root.duplicate_for(HostId(2), "alice");
        assert_eq!(child.parent(), Some(HostId(1)));
        assert!(!child.is_per_user());
        assert_eq!(child.user(), Some("alice"));
        assert_eq!(child.config(), root.config());
        assert!(child.persistence_required());
        assert!(child.global_state().is_none());
    }

    #[test]
    fn test_debounced_flush() {
        let mut store = MemoryStore::new();
        let state = ExecutionState::new(3);
        let mut host = Host::new_root(HostId(1), Some(Module::new("camera", Some(""))), false, &store);

        host.store_global_state(Some(b"a".to_vec()), &state, &mut store)
            .unwrap();
        assert_eq!(store.write_count(), 1);
        host.store_global_state(Some(b"b".to_vec()), &state, &mut store)
            .unwrap();
        assert_eq!(store.write_count(), 1);

        host.tick(&mut store);
        host.tick(&mut store);
        assert_eq!(store.write_count(), 1);
        host.tick(&mut store);
        assert_eq!(store.write_count(), 2);
        assert_eq!(
            store.read(&ResourceKey::global_state("camera")).unwrap(),
            Some(b"b".to_vec())
        );
    }
}
