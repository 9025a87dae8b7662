use std::collections::BTreeMap;
use tracing::debug;

use tickscript_api::Event;

use crate::host::HostId;

/// One subscription of a host function to a built-in event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub host: HostId,
    pub function: String,
}

/// Event name to subscribed (host, function) pairs
///
/// Every binding receives every firing of its event; there is no per-binding
/// filter.
#[derive(Debug, Default)]
pub struct EventDispatch {
    bindings: BTreeMap<Event, Vec<EventBinding>>,
}

impl EventDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Rebinding the same host function is a no-op.
    pub fn bind(&mut self, event: Event, host: HostId, function: &str) {
        let bindings = self.bindings.entry(event).or_default();
        if bindings
            .iter()
            .any(|b| b.host == host && b.function == function)
        {
            return;
        }
        debug!(target: "scripting", "Binding {} of {:?} to {}", function, host, event);
        bindings.push(EventBinding {
            host,
            function: function.to_string(),
        });
    }

    pub fn unbind(&mut self, event: Event, host: HostId, function: &str) -> bool {
        let Some(bindings) = self.bindings.get_mut(&event) else {
            return false;
        };
        let before = bindings.len();
        bindings.retain(|b| !(b.host == host && b.function == function));
        let removed = bindings.len() != before;
        if removed {
            debug!(target: "scripting", "Unbound {} of {:?} from {}", function, host, event);
        }
        removed
    }

    /// Drop every binding owned by `host`
    pub fn unbind_host(&mut self, host: HostId) {
        for bindings in self.bindings.values_mut() {
            bindings.retain(|b| b.host != host);
        }
    }

    pub fn bindings(&self, event: Event) -> &[EventBinding] {
        self.bindings.get(&event).map_or(&[], Vec::as_slice)
    }

    pub fn is_bound(&self, event: Event, host: HostId, function: &str) -> bool {
        self.bindings(event)
            .iter()
            .any(|b| b.host == host && b.function == function)
    }
}
