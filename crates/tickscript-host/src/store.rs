//! Persisted state storage
//!
//! Blobs are keyed by the owning module, an optional resource name and a
//! shared/private scope. A key without a resource name is the app's default
//! global-state slot.

use anyhow::{bail, Context as _};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

pub type StateBlob = Vec<u8>;

/// How a resource is encoded on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Binary tag data
    Tag,
    /// Line-oriented text
    Text,
}

impl ResourceKind {
    /// Map a script-facing type name (`"nbt"`, `"text"`, ...) to a kind
    pub fn from_type_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("nbt") {
            ResourceKind::Tag
        } else {
            ResourceKind::Text
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResourceKind::Tag => "nbt",
            ResourceKind::Text => "txt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub module: Option<String>,
    pub file: Option<String>,
    pub kind: ResourceKind,
    pub shared: bool,
}

impl ResourceKey {
    /// The default global-state slot of a module
    pub fn global_state(module: &str) -> Self {
        Self {
            module: Some(module.to_string()),
            file: None,
            kind: ResourceKind::Tag,
            shared: false,
        }
    }

    /// A named resource; shared resources belong to no module
    pub fn resource(module: Option<&str>, file: &str, kind: ResourceKind, shared: bool) -> Self {
        Self {
            module: module.filter(|_| !shared).map(str::to_string),
            file: Some(file.to_string()),
            kind,
            shared,
        }
    }
}

/// Opaque blob storage for app state and resource files
pub trait StateStore {
    fn read(&self, key: &ResourceKey) -> anyhow::Result<Option<StateBlob>>;

    fn write(&mut self, key: &ResourceKey, blob: &[u8]) -> anyhow::Result<()>;

    fn append_lines(&mut self, key: &ResourceKey, lines: &[String]) -> anyhow::Result<()>;

    /// Remove a resource, returning whether it existed
    fn delete(&mut self, key: &ResourceKey) -> anyhow::Result<bool>;

    fn read_lines(&self, key: &ResourceKey) -> anyhow::Result<Option<Vec<String>>> {
        let Some(blob) = self.read(key)? else {
            return Ok(None);
        };
        let text = String::from_utf8(blob).context("resource is not valid UTF-8")?;
        Ok(Some(text.lines().map(str::to_string).collect()))
    }
}

/// A store shared with the embedding server, which keeps its own handle
impl<S: StateStore> StateStore for Rc<RefCell<S>> {
    fn read(&self, key: &ResourceKey) -> anyhow::Result<Option<StateBlob>> {
        self.borrow().read(key)
    }

    fn write(&mut self, key: &ResourceKey, blob: &[u8]) -> anyhow::Result<()> {
        self.borrow_mut().write(key, blob)
    }

    fn append_lines(&mut self, key: &ResourceKey, lines: &[String]) -> anyhow::Result<()> {
        self.borrow_mut().append_lines(key, lines)
    }

    fn delete(&mut self, key: &ResourceKey) -> anyhow::Result<bool> {
        self.borrow_mut().delete(key)
    }
}

/// In-process store, used when no state directory is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<ResourceKey, StateBlob>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write operations performed so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.blobs.contains_key(key)
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &ResourceKey) -> anyhow::Result<Option<StateBlob>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn write(&mut self, key: &ResourceKey, blob: &[u8]) -> anyhow::Result<()> {
        self.writes += 1;
        self.blobs.insert(key.clone(), blob.to_vec());
        Ok(())
    }

    fn append_lines(&mut self, key: &ResourceKey, lines: &[String]) -> anyhow::Result<()> {
        let blob = self.blobs.entry(key.clone()).or_default();
        for line in lines {
            blob.extend_from_slice(line.as_bytes());
            blob.push(b'\n');
        }
        Ok(())
    }

    fn delete(&mut self, key: &ResourceKey) -> anyhow::Result<bool> {
        Ok(self.blobs.remove(key).is_some())
    }
}

/// Directory-backed store
///
/// Layout under the root:
/// - `<module>.data.nbt` for an app's global state
/// - `<module>.data/<file>.<ext>` for private resources
/// - `shared/<file>.<ext>` for resources visible to every app
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path_for(&self, key: &ResourceKey) -> anyhow::Result<PathBuf> {
        match (&key.file, key.shared) {
            (Some(file), true) => {
                check_resource_name(file)?;
                Ok(self
                    .root
                    .join("shared")
                    .join(format!("{}.{}", file, key.kind.extension())))
            }
            (None, true) => bail!("shared resources need a name"),
            (file, false) => {
                let Some(module) = &key.module else {
                    bail!("private resources need an owning module");
                };
                check_resource_name(module)?;
                match file {
                    Some(file) => {
                        check_resource_name(file)?;
                        Ok(self
                            .root
                            .join(format!("{}.data", module))
                            .join(format!("{}.{}", file, key.kind.extension())))
                    }
                    None => Ok(self
                        .root
                        .join(format!("{}.data.{}", module, key.kind.extension()))),
                }
            }
        }
    }
}

/// Resource names may contain `/`-separated folders but never escape the root
fn check_resource_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..")
    {
        bail!("invalid resource name: {}", name);
    }
    Ok(())
}

impl StateStore for FileStore {
    fn read(&self, key: &ResourceKey) -> anyhow::Result<Option<StateBlob>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn write(&mut self, key: &ResourceKey, blob: &[u8]) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, blob).with_context(|| format!("failed to write {}", path.display()))?;
        debug!(target: "scripting", "Wrote {} bytes to {}", blob.len(), path.display());
        Ok(())
    }

    fn append_lines(&mut self, key: &ResourceKey, lines: &[String]) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        for line in lines {
            writeln!(file, "{}", line)
                .with_context(|| format!("failed to append to {}", path.display()))?;
        }
        Ok(())
    }

    fn delete(&mut self, key: &ResourceKey) -> anyhow::Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_counts_writes() {
        let mut store = MemoryStore::new();
        let key = ResourceKey::global_state("camera");
        store.write(&key, b"one").unwrap();
        store.write(&key, b"two").unwrap();
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.read(&key).unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_memory_store_lines() {
        let mut store = MemoryStore::new();
        let key = ResourceKey::resource(Some("log"), "events", ResourceKind::Text, false);
        store
            .append_lines(&key, &["a".to_string(), "b".to_string()])
            .unwrap();
        store.append_lines(&key, &["c".to_string()]).unwrap();
        assert_eq!(
            store.read_lines(&key).unwrap(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
    }

    #[test]
    fn test_file_store_layout() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = FileStore::new(dir.path());

        store
            .write(&ResourceKey::global_state("camera"), b"state")
            .unwrap();
        assert!(dir.path().join("camera.data.nbt").exists());

        let private = ResourceKey::resource(Some("camera"), "paths/main", ResourceKind::Tag, false);
        store.write(&private, b"p").unwrap();
        assert!(dir.path().join("camera.data/paths/main.nbt").exists());

        let shared = ResourceKey::resource(Some("camera"), "notes", ResourceKind::Text, true);
        store.append_lines(&shared, &["hello".to_string()]).unwrap();
        assert!(dir.path().join("shared/notes.txt").exists());
        assert_eq!(
            store.read_lines(&shared).unwrap(),
            Some(vec!["hello".to_string()])
        );
    }

    #[test]
    fn test_file_store_missing_is_none() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(dir.path());
        assert_eq!(store.read(&ResourceKey::global_state("nope")).unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_escaping_names() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut store = FileStore::new(dir.path());
        let key = ResourceKey::resource(Some("camera"), "../../etc/passwd", ResourceKind::Text, false);
        assert!(store.write(&key, b"x").is_err());
        let key = ResourceKey::resource(None, "notes", ResourceKind::Text, false);
        assert!(store.read(&key).is_err());
    }
}
