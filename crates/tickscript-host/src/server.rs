use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

use tickscript_api::{Actor, BlockPos, Event, EvalError, Module, Tokenizer, Value};

use crate::config::HostSettings;
use crate::context::{Context, Evaluator};
use crate::dispatch::EventDispatch;
use crate::error::ScriptError;
use crate::host::{Host, HostId, CLOSE_HOOK};
use crate::modules::{DirModuleSource, ModuleSource};
use crate::sink::{headline, ReportSink};
use crate::state::ExecutionState;
use crate::store::{FileStore, MemoryStore, StateStore};
use crate::world::{marker_tag, NullWorld, World};

/// Owns every host, the module source, the event dispatch table and the
/// collaborators evaluation needs
///
/// All operations run on the server tick thread. Hosts are kept in an arena
/// and addressed by [`HostId`]; children refer to their root by id.
pub struct ScriptServer {
    pub(crate) hosts: BTreeMap<HostId, Host>,
    next_id: usize,
    apps: BTreeMap<String, HostId>,
    global_host: HostId,
    pub(crate) events: EventDispatch,
    pub(crate) state: ExecutionState,
    pub(crate) evaluator: Rc<dyn Evaluator>,
    pub(crate) tokenizer: Rc<dyn Tokenizer>,
    pub(crate) modules: Box<dyn ModuleSource>,
    pub(crate) store: Box<dyn StateStore>,
    pub(crate) world: Box<dyn World>,
    settings: HostSettings,
}

impl ScriptServer {
    /// Create a server with an in-memory store and an empty world
    pub fn new(
        evaluator: Rc<dyn Evaluator>,
        tokenizer: Rc<dyn Tokenizer>,
        modules: Box<dyn ModuleSource>,
    ) -> Self {
        let store: Box<dyn StateStore> = Box::new(MemoryStore::new());
        let global_host = HostId(0);
        let mut hosts = BTreeMap::new();
        hosts.insert(global_host, Host::new_root(global_host, None, false, &*store));

        Self {
            hosts,
            next_id: 1,
            apps: BTreeMap::new(),
            global_host,
            events: EventDispatch::new(),
            state: ExecutionState::default(),
            evaluator,
            tokenizer,
            modules,
            store,
            world: Box::new(NullWorld),
            settings: HostSettings::default(),
        }
    }

    /// Create a server reading apps from and saving state to the directories
    /// named in `settings`
    pub fn from_settings(
        settings: HostSettings,
        evaluator: Rc<dyn Evaluator>,
        tokenizer: Rc<dyn Tokenizer>,
    ) -> Self {
        let modules = Box::new(DirModuleSource::new(settings.apps_dir()));
        let store = Box::new(FileStore::new(settings.data_dir()));
        Self::new(evaluator, tokenizer, modules)
            .with_store(store)
            .with_settings(settings)
    }

    pub fn with_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_world(mut self, world: Box<dyn World>) -> Self {
        self.world = world;
        self
    }

    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.state.save_debounce_ticks = settings.save_debounce_ticks;
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn events(&self) -> &EventDispatch {
        &self.events
    }

    // ===== Pause =====

    /// Halt or resume all script invocation
    pub fn set_stop_all(&mut self, stop: bool) {
        if self.state.stop_all != stop {
            info!(target: "scripting", "Script execution {}", if stop { "paused" } else { "resumed" });
        }
        self.state.stop_all = stop;
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stop_all
    }

    // ===== Arena =====

    pub fn host(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    /// The unnamed host used for code that belongs to no app
    pub fn global_host(&self) -> HostId {
        self.global_host
    }

    pub fn app(&self, name: &str) -> Option<HostId> {
        self.apps.get(name).copied()
    }

    pub fn app_names(&self) -> Vec<String> {
        self.apps.keys().cloned().collect()
    }

    fn alloc_id(&mut self) -> HostId {
        let id = HostId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The host that holds global state for `id`
    pub(crate) fn root_of(&self, id: HostId) -> HostId {
        self.hosts
            .get(&id)
            .and_then(Host::parent)
            .unwrap_or(id)
    }

    /// Actor hooks of `id` run as: the owning player for user hosts when
    /// online, the server otherwise
    pub(crate) fn actor_for_host(&self, id: HostId) -> Actor {
        self.hosts
            .get(&id)
            .and_then(Host::user)
            .and_then(|user| self.world.find_player(user))
            .unwrap_or_else(|| self.world.server_actor())
    }

    // ===== Lifecycle =====

    /// Load an app by name, replacing an already loaded app of that name
    pub fn add_app(&mut self, name: &str, actor: &Actor) -> Result<HostId, ScriptError> {
        let name = name.to_lowercase();
        let Some(module) = self.modules.module(&name, false) else {
            let e = ScriptError::LoadFailure {
                module: name.clone(),
                reason: "app not found".to_string(),
            };
            ReportSink::new(actor.clone()).report_message(e.to_string());
            return Err(e);
        };

        if self.apps.contains_key(&name) {
            debug!(target: "scripting", "Replacing loaded app {}", name);
            self.remove_app(&name);
        }

        let id = self.create_application(Some(module), false, actor)?;
        self.apps.insert(name.clone(), id);
        info!(target: "scripting", "Loaded app {}", name);
        Ok(id)
    }

    /// Close and drop an app with all its user hosts
    pub fn remove_app(&mut self, name: &str) -> bool {
        let Some(id) = self.apps.remove(name) else {
            return false;
        };
        self.close(id);
        self.discard_host(id);
        info!(target: "scripting", "Unloaded app {}", name);
        true
    }

    /// Create a root host for `module` and run the module's code under it
    ///
    /// Nothing is kept if the code is missing or evaluation fails; the
    /// failure is reported to `actor`.
    pub fn create_application(
        &mut self,
        module: Option<Module>,
        per_user: bool,
        actor: &Actor,
    ) -> Result<HostId, ScriptError> {
        let id = self.alloc_id();
        let host = Host::new_root(id, module.clone(), per_user, &*self.store);
        self.hosts.insert(id, host);

        let Some(module) = module else {
            return Ok(id);
        };

        if module.code().is_none() {
            self.hosts.remove(&id);
            let e = ScriptError::LoadFailure {
                module: module.name().to_string(),
                reason: "code not found".to_string(),
            };
            ReportSink::new(actor.clone()).report_message(e.to_string());
            return Err(e);
        }

        if let Some(host) = self.hosts.get_mut(&id) {
            host.set_error_sink(actor.clone());
        }

        if let Err(e) = self.run_module(id, &module, actor) {
            let e = ScriptError::from(e);
            self.handle_error_with_stack(id, load_intro(&e), &e);
            self.discard_host(id);
            return Err(e);
        }

        debug!(target: "scripting", "Created host {:?} for {}", id, module.name());
        Ok(id)
    }

    /// Get or create the child host serving `user` under a per-user root
    pub fn duplicate_for_user(
        &mut self,
        root: HostId,
        user: &str,
        actor: &Actor,
    ) -> Result<HostId, ScriptError> {
        match self.hosts.get(&root) {
            None => {
                return Err(ScriptError::InternalContract(format!("unknown host {:?}", root)));
            }
            Some(host) => {
                if let Some(existing) = host.user_host(user) {
                    return Ok(existing);
                }
            }
        }

        let id = self.alloc_id();
        let Some(root_host) = self.hosts.get(&root) else {
            return Err(ScriptError::InternalContract(format!("unknown host {:?}", root)));
        };
        let mut child = root_host.duplicate_for(id, user);
        child.set_error_sink(actor.clone());
        let module = child.module().cloned();
        self.hosts.insert(id, child);
        if let Some(root_host) = self.hosts.get_mut(&root) {
            root_host.user_hosts.insert(user.to_string(), id);
        }

        if let Some(module) = module {
            if let Err(e) = self.run_module(id, &module, actor) {
                let e = ScriptError::from(e);
                self.handle_error_with_stack(id, load_intro(&e), &e);
                self.discard_host(id);
                return Err(e);
            }
        }

        debug!(target: "scripting", "Created user host {:?} for {} under {:?}", id, user, root);
        Ok(id)
    }

    /// Pick the host that serves `actor` for a command
    ///
    /// Per-user apps route to the actor's own child host, and an actor with
    /// no user identity gets `None`. The chosen host reports errors to
    /// `actor` unless it already has a sink.
    pub fn retrieve_for_execution(
        &mut self,
        root: HostId,
        actor: &Actor,
    ) -> Result<Option<HostId>, ScriptError> {
        let Some(host) = self.hosts.get(&root) else {
            return Ok(None);
        };
        let id = if host.is_per_user() {
            let Some(user) = actor.user() else {
                return Ok(None);
            };
            self.duplicate_for_user(root, user, actor)?
        } else {
            root
        };
        if let Some(host) = self.hosts.get_mut(&id) {
            host.bind_error_sink(actor);
        }
        Ok(Some(id))
    }

    /// Pick the host for an event aimed at `target`
    ///
    /// Returns `None` when a per-user app is asked without a player, or a
    /// shared app is asked with one.
    pub fn retrieve_for_target(
        &mut self,
        root: HostId,
        target: Option<&Actor>,
    ) -> Result<Option<HostId>, ScriptError> {
        let Some(host) = self.hosts.get(&root) else {
            return Ok(None);
        };
        if host.is_per_user() == target.is_none() {
            return Ok(None);
        }

        let Some(target) = target else {
            let server = self.world.server_actor();
            if let Some(host) = self.hosts.get_mut(&root) {
                host.bind_error_sink(&server);
            }
            return Ok(Some(root));
        };

        let Some(user) = target.user() else {
            return Ok(None);
        };
        let id = self.duplicate_for_user(root, user, target)?;
        if let Some(host) = self.hosts.get_mut(&id) {
            host.bind_error_sink(target);
        }
        Ok(Some(id))
    }

    /// Tear a host down: user hosts first, then the close hook, then world
    /// markers and any pending save
    pub fn close(&mut self, id: HostId) {
        let Some(host) = self.hosts.get(&id) else {
            return;
        };
        let children: Vec<HostId> = host.user_hosts.values().copied().collect();
        for child in children {
            self.close(child);
        }

        if let Some(closing) = self.hosts.get(&id).and_then(|h| h.function(CLOSE_HOOK)).cloned() {
            let actor = self.actor_for_host(id);
            if let Err(e) = self.call_udf(id, BlockPos::ORIGIN, &actor, &closing, Vec::new()) {
                debug!(target: "scripting", "Ignoring close hook failure: {}", e);
            }
        }

        let Some(host) = self.hosts.get_mut(&id) else {
            return;
        };
        if host.user().is_none() {
            let tag = marker_tag(host.name());
            let removed = self.world.remove_tagged_markers(&tag);
            if removed > 0 {
                debug!(target: "scripting", "Removed {} marker(s) tagged {}", removed, tag);
            }
            host.flush_pending(&mut *self.store);
        }
    }

    /// Drop a host and its children from the arena and the dispatch table
    fn discard_host(&mut self, id: HostId) {
        let Some(host) = self.hosts.remove(&id) else {
            return;
        };
        self.events.unbind_host(id);
        for child in host.user_hosts.values() {
            self.discard_host(*child);
        }
        if let (Some(parent), Some(user)) = (host.parent(), host.user()) {
            if let Some(parent) = self.hosts.get_mut(&parent) {
                parent.user_hosts.remove(user);
            }
        }
    }

    /// Recreate every app that does not ask to stay loaded
    pub fn reload_apps(&mut self, actor: &Actor) -> usize {
        let names: Vec<String> = self
            .apps
            .iter()
            .filter(|(_, id)| {
                self.hosts
                    .get(id)
                    .is_some_and(|h| !h.persistence_required())
            })
            .map(|(name, _)| name.clone())
            .collect();

        let mut reloaded = 0;
        for name in names {
            match self.add_app(&name, actor) {
                Ok(_) => reloaded += 1,
                Err(e) => warn!(target: "scripting", "Failed to reload app {}: {}", name, e),
            }
        }
        if reloaded > 0 {
            info!(target: "scripting", "Reloaded {} app(s)", reloaded);
        }
        reloaded
    }

    /// Load the apps listed in the settings
    pub fn autoload(&mut self) -> usize {
        let actor = self.world.server_actor();
        let names = self.settings.autoload.clone();
        let mut loaded = 0;
        for name in names {
            match self.add_app(&name, &actor) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(target: "scripting", "Failed to autoload app {}: {}", name, e),
            }
        }
        loaded
    }

    /// Close every app, every other root host, then the unnamed host
    pub fn shutdown(&mut self) {
        let names: Vec<String> = self.apps.keys().cloned().collect();
        for name in names {
            self.remove_app(&name);
        }
        let global = self.global_host;
        let unlisted: Vec<HostId> = self
            .roots()
            .into_iter()
            .filter(|id| *id != global)
            .collect();
        for id in unlisted {
            self.close(id);
            self.discard_host(id);
        }
        self.close(global);
    }

    /// Every host without a parent, whether or not it is a named app
    fn roots(&self) -> Vec<HostId> {
        self.hosts
            .values()
            .filter(|h| h.is_root())
            .map(Host::id)
            .collect()
    }

    pub(crate) fn run_module(
        &mut self,
        id: HostId,
        module: &Module,
        actor: &Actor,
    ) -> Result<Value, EvalError> {
        let evaluator = Rc::clone(&self.evaluator);
        let mut ctx = Context::new(self, id, actor.clone(), BlockPos::ORIGIN);
        evaluator.run_module(&mut ctx, module)
    }

    // ===== Events and ticking =====

    /// Call every function bound to `event`, returning how many were called
    pub fn fire_event(&mut self, event: Event, args: Vec<Value>) -> usize {
        if self.state.stop_all {
            return 0;
        }
        let bindings = self.events.bindings(event).to_vec();
        let mut called = 0;
        for binding in bindings {
            let Some(function) = self
                .hosts
                .get(&binding.host)
                .and_then(|h| h.function(&binding.function))
                .cloned()
            else {
                continue;
            };
            let actor = self.actor_for_host(binding.host);
            match self.call_udf(binding.host, BlockPos::ORIGIN, &actor, &function, args.clone()) {
                Ok(_) => called += 1,
                Err(e) => debug!(target: "scripting", "Skipping {} handler: {}", event, e),
            }
        }
        called
    }

    /// Advance one server tick: fire the tick event, then advance every root
    /// host's save debounce
    pub fn tick(&mut self) {
        self.fire_event(Event::Tick, Vec::new());
        for id in self.roots() {
            self.tick_host(id);
        }
    }

    /// Advance one root host's save debounce by a tick
    pub fn tick_host(&mut self, id: HostId) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.tick(&mut *self.store);
        }
    }

    // ===== Error reporting =====

    /// Report a failure through the host's sink, or the process log when no
    /// actor is bound
    pub fn handle_error_with_stack(&self, id: HostId, intro: &str, error: &ScriptError) {
        match self.hosts.get(&id).and_then(Host::error_sink) {
            Some(sink) => sink.report_failure(intro, error),
            None => error!(target: "scripting", "{}", headline(intro, &error.message())),
        }
    }

    pub fn reset_error_sink(&mut self, id: HostId) {
        if let Some(host) = self.hosts.get_mut(&id) {
            host.reset_error_sink();
        }
    }
}

impl Drop for ScriptServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn load_intro(error: &ScriptError) -> &'static str {
    if error.is_arithmetic() {
        "Math doesn't compute"
    } else {
        "Error while evaluating expression"
    }
}
