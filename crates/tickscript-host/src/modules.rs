use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use tickscript_api::Module;

/// File extension of app sources
pub const APP_EXTENSION: &str = "sc";
/// File extension of library sources, importable but not loadable as apps
pub const LIBRARY_EXTENSION: &str = "scl";

/// Where module sources come from
pub trait ModuleSource {
    /// Find a module by name. Libraries are only considered when
    /// `allow_library` is set.
    fn module(&self, name: &str, allow_library: bool) -> Option<Module>;

    /// Names of the apps that could be loaded
    fn app_names(&self) -> Vec<String>;
}

/// Reads `<name>.sc` and `<name>.scl` files from a directory
pub struct DirModuleSource {
    dir: PathBuf,
}

impl DirModuleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, path: &Path, name: &str, library: bool) -> Module {
        let code = match std::fs::read_to_string(path) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(target: "scripting", "Failed to read {}: {}", path.display(), e);
                None
            }
        };
        if library {
            Module::library(name, code.as_deref())
        } else {
            Module::new(name, code.as_deref())
        }
    }
}

impl ModuleSource for DirModuleSource {
    fn module(&self, name: &str, allow_library: bool) -> Option<Module> {
        let name = name.to_lowercase();
        let app = self.dir.join(format!("{}.{}", name, APP_EXTENSION));
        if app.exists() {
            debug!(target: "scripting", "Found app {} at {}", name, app.display());
            return Some(self.read(&app, &name, false));
        }
        if allow_library {
            let lib = self.dir.join(format!("{}.{}", name, LIBRARY_EXTENSION));
            if lib.exists() {
                debug!(target: "scripting", "Found library {} at {}", name, lib.display());
                return Some(self.read(&lib, &name, true));
            }
        }
        None
    }

    fn app_names(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some(APP_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

/// Modules registered in memory, for embedding hosts and tests
#[derive(Debug, Default)]
pub struct MemoryModuleSource {
    modules: HashMap<String, Module>,
}

impl MemoryModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.insert(module);
        self
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.name().to_string(), module);
    }
}

impl ModuleSource for MemoryModuleSource {
    fn module(&self, name: &str, allow_library: bool) -> Option<Module> {
        self.modules
            .get(name)
            .filter(|m| allow_library || !m.is_library())
            .cloned()
    }

    fn app_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .values()
            .filter(|m| !m.is_library())
            .map(|m| m.name().to_string())
            .collect();
        names.sort();
        names
    }
}
