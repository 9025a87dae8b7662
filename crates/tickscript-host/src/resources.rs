//! Global state and named resource files of a host
//!
//! Named resources live under the app's identity, or in the shared area.
//! The unnamed host belongs to no app, so it may only use the shared area.

use crate::host::HostId;
use crate::server::ScriptServer;
use crate::store::{ResourceKey, ResourceKind, StateBlob};

impl ScriptServer {
    /// Replace the app's global state, returning false for the unnamed host,
    /// which has no state slot
    ///
    /// Calls on a user host are routed to its root. The first write after a
    /// quiet period is saved at once; writes inside the following debounce
    /// window only update memory until the window runs out.
    pub fn write_global_state(
        &mut self,
        id: HostId,
        blob: Option<StateBlob>,
    ) -> anyhow::Result<bool> {
        let root = self.root_of(id);
        let Some(host) = self.hosts.get_mut(&root) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() {
            return Ok(false);
        }
        host.store_global_state(blob, &self.state, &mut *self.store)?;
        Ok(true)
    }

    /// Read a tag resource, or the app's global state when `file` is `None`
    pub fn read_file_tag(
        &self,
        id: HostId,
        file: Option<&str>,
        shared: bool,
    ) -> anyhow::Result<Option<StateBlob>> {
        let Some(host) = self.hosts.get(&id) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() && !shared {
            return Ok(None);
        }
        if let Some(file) = file {
            return self
                .store
                .read(&ResourceKey::resource(host.name(), file, ResourceKind::Tag, shared));
        }
        Ok(self
            .hosts
            .get(&self.root_of(id))
            .and_then(|root| root.global_state())
            .cloned())
    }

    /// Write a tag resource, or the app's global state when `file` is `None`.
    /// Returns false when the host may not write there.
    pub fn write_tag_file(
        &mut self,
        id: HostId,
        tag: StateBlob,
        file: Option<&str>,
        shared: bool,
    ) -> anyhow::Result<bool> {
        let Some(host) = self.hosts.get(&id) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() && !shared {
            return Ok(false);
        }
        match file {
            Some(file) => {
                let key = ResourceKey::resource(host.name(), file, ResourceKind::Tag, shared);
                self.store.write(&key, &tag)?;
            }
            None => return self.write_global_state(id, Some(tag)),
        }
        Ok(true)
    }

    pub fn remove_resource_file(
        &mut self,
        id: HostId,
        resource: &str,
        shared: bool,
        type_name: &str,
    ) -> anyhow::Result<bool> {
        let Some(host) = self.hosts.get(&id) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() && !shared {
            return Ok(false);
        }
        let key = ResourceKey::resource(
            host.name(),
            resource,
            ResourceKind::from_type_name(type_name),
            shared,
        );
        self.store.delete(&key)
    }

    pub fn append_log_file(
        &mut self,
        id: HostId,
        resource: &str,
        shared: bool,
        type_name: &str,
        lines: &[String],
    ) -> anyhow::Result<bool> {
        let Some(host) = self.hosts.get(&id) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() && !shared {
            return Ok(false);
        }
        let key = ResourceKey::resource(
            host.name(),
            resource,
            ResourceKind::from_type_name(type_name),
            shared,
        );
        self.store.append_lines(&key, lines)?;
        Ok(true)
    }

    pub fn read_text_resource(
        &self,
        id: HostId,
        resource: &str,
        shared: bool,
    ) -> anyhow::Result<Option<Vec<String>>> {
        let Some(host) = self.hosts.get(&id) else {
            anyhow::bail!("unknown host {:?}", id);
        };
        if host.name().is_none() && !shared {
            return Ok(None);
        }
        self.store.read_lines(&ResourceKey::resource(
            host.name(),
            resource,
            ResourceKind::Text,
            shared,
        ))
    }
}
