//! Resource manager subsystem

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::OnceLock;

use rustc_hash::{FxHashMap, FxHashSet};

use super::handle::ResourceHandle;
use super::types::{Resource, ResourceError};
use crate::core::{
    Arguments, CommandError, CommandHandler, FileLoader, Filter, Message, MessageResult, Subsystem,
    SubsystemInfo,
};

/// Persistence given to new resources. Level 0 is never unloaded.
pub const DEFAULT_PERSISTENCE: u16 = 1;

type Key = (String, TypeId);

struct Entry {
    /// Holds a `ResourceHandle<T>`
    handle: Box<dyn Any + Send + Sync>,
    persistence: u16,
    serial: u64,
    type_name: &'static str,
}

fn key<T: 'static>(name: &str) -> Key {
    (name.to_string(), TypeId::of::<T>())
}

fn fallback_name<T>() -> String {
    format!("<fallback {}>", std::any::type_name::<T>())
}

pub struct ResourceManager {
    info: SubsystemInfo,
    files: FileLoader,
    resources: FxHashMap<Key, Entry>,
    next_serial: u64,
    /// Keys touched since `begin_load_phase`
    phase: Option<FxHashSet<Key>>,
}

impl ResourceManager {
    pub const ID: &'static str = "Resource Manager";

    #[must_use]
    pub fn new(files: FileLoader) -> Self {
        Self {
            info: SubsystemInfo::new(Self::ID),
            files,
            resources: FxHashMap::default(),
            next_serial: 0,
            phase: None,
        }
    }

    #[must_use]
    pub fn files(&self) -> &FileLoader {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut FileLoader {
        &mut self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn touch(&mut self, key: &Key) {
        if let Some(phase) = &mut self.phase {
            phase.insert(key.clone());
        }
    }

    fn handle<T: Send + Sync + 'static>(&self, key: &Key) -> Option<ResourceHandle<T>> {
        self.resources
            .get(key)
            .and_then(|entry| entry.handle.downcast_ref::<ResourceHandle<T>>())
            .cloned()
    }

    fn insert<T: Send + Sync + 'static>(&mut self, key: Key, value: T, persistence: u16) -> ResourceHandle<T> {
        let handle = ResourceHandle::new(&key.0, value);
        self.resources.insert(
            key,
            Entry {
                handle: Box::new(handle.clone()),
                persistence,
                serial: self.next_serial,
                type_name: std::any::type_name::<T>(),
            },
        );
        self.next_serial += 1;
        handle
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Return the stored resource, loading it first if needed.
    ///
    /// When loading fails the type's fallback is returned instead, if it has
    /// one.
    pub fn get<T: Resource>(&mut self, name: &str) -> Result<ResourceHandle<T>, ResourceError> {
        let key = key::<T>(name);
        if let Some(handle) = self.handle(&key) {
            self.touch(&key);
            return Ok(handle);
        }

        match T::load(name, &self.files) {
            Ok(resource) => {
                log::debug!("Loaded resource \"{name}\" ({})", std::any::type_name::<T>());
                self.touch(&key);
                Ok(self.insert(key, resource, DEFAULT_PERSISTENCE))
            }
            Err(e) => match self.fallback::<T>() {
                Some(fallback) => {
                    log::error!("Couldn't load resource \"{name}\", using fallback: {e}");
                    Ok(fallback)
                }
                None => {
                    log::error!("Couldn't load resource \"{name}\": {e}");
                    Err(e)
                }
            },
        }
    }

    /// Return the stored resource, or store the one `make` creates
    pub fn get_named<T, F>(&mut self, name: &str, make: F) -> ResourceHandle<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let key = key::<T>(name);
        self.touch(&key);
        match self.handle(&key) {
            Some(handle) => handle,
            None => self.insert(key, make(), DEFAULT_PERSISTENCE),
        }
    }

    /// The fallback of `T`, created on first use and never unloaded
    pub fn fallback<T: Resource>(&mut self) -> Option<ResourceHandle<T>> {
        let key = key::<T>(&fallback_name::<T>());
        if let Some(handle) = self.handle(&key) {
            return Some(handle);
        }
        let resource = T::fallback()?;
        Some(self.insert(key, resource, 0))
    }

    #[must_use]
    pub fn is_fallback<T: Send + Sync + 'static>(&self, handle: &ResourceHandle<T>) -> bool {
        self.handle::<T>(&key::<T>(&fallback_name::<T>()))
            .is_some_and(|fallback| fallback == *handle)
    }

    pub fn get_existing<T: Send + Sync + 'static>(&mut self, name: &str) -> Option<ResourceHandle<T>> {
        let key = key::<T>(name);
        let handle = self.handle(&key)?;
        self.touch(&key);
        Some(handle)
    }

    #[must_use]
    pub fn exists<T: 'static>(&self, name: &str) -> bool {
        self.resources.contains_key(&key::<T>(name))
    }

    /// Whether a resource with this name exists, of any type
    #[must_use]
    pub fn resource_exists(&self, name: &str) -> bool {
        self.resources.keys().any(|(n, _)| n == name)
    }

    /// Store a copy of `name` as `new_name`.
    ///
    /// An existing resource named `new_name` is returned unchanged.
    pub fn copy<T: Clone + Send + Sync + 'static>(
        &mut self,
        name: &str,
        new_name: &str,
    ) -> Result<ResourceHandle<T>, ResourceError> {
        let source_key = key::<T>(name);
        let source: ResourceHandle<T> = self
            .handle(&source_key)
            .ok_or_else(|| ResourceError::NotLoaded(name.to_string()))?;

        let target_key = key::<T>(new_name);
        self.touch(&target_key);
        if let Some(existing) = self.handle(&target_key) {
            return Ok(existing);
        }

        let persistence = self
            .resources
            .get(&source_key)
            .map_or(DEFAULT_PERSISTENCE, |entry| entry.persistence);
        let copy = source.renamed(new_name);
        self.resources.insert(
            target_key,
            Entry {
                handle: Box::new(copy.clone()),
                persistence,
                serial: self.next_serial,
                type_name: std::any::type_name::<T>(),
            },
        );
        self.next_serial += 1;
        Ok(copy)
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Returns whether the resource exists
    pub fn set_persistence<T: 'static>(&mut self, name: &str, level: u16) -> bool {
        match self.resources.get_mut(&key::<T>(name)) {
            Some(entry) => {
                entry.persistence = level;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn persistence<T: 'static>(&self, name: &str) -> Option<u16> {
        self.resources.get(&key::<T>(name)).map(|entry| entry.persistence)
    }

    // ------------------------------------------------------------------------
    // Unloading
    // ------------------------------------------------------------------------

    /// Remove the oldest resource with this name, of any type, unless it is
    /// permanent. Returns whether something was removed.
    pub fn unload_resource(&mut self, name: &str) -> bool {
        let Some(key) = self
            .resources
            .iter()
            .filter(|((n, _), _)| n == name)
            .min_by_key(|(_, entry)| entry.serial)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };

        self.remove_unless_permanent(&key)
    }

    /// Typed removal, unless the resource is permanent
    pub fn unload<T: 'static>(&mut self, name: &str) -> bool {
        self.remove_unless_permanent(&key::<T>(name))
    }

    fn remove_unless_permanent(&mut self, key: &Key) -> bool {
        match self.resources.get(key) {
            Some(entry) if entry.persistence != 0 => {
                log::debug!("Unloaded resource \"{}\" ({})", key.0, entry.type_name);
                self.resources.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Remove resources by persistence level. Level 0 is always kept.
    ///
    /// With `descending`, every level at or above `persistence` goes.
    /// Otherwise only that exact level. Returns the number removed.
    pub fn unload_resources(&mut self, persistence: u16, descending: bool) -> usize {
        let before = self.resources.len();
        self.resources.retain(|_, entry| {
            entry.persistence == 0
                || if descending {
                    entry.persistence < persistence
                } else {
                    entry.persistence != persistence
                }
        });
        let removed = before - self.resources.len();
        if removed > 0 {
            log::debug!("Unloaded {removed} resources at persistence {persistence}");
        }
        removed
    }

    /// Remove everything that is not permanent
    pub fn unload_all(&mut self) -> usize {
        self.unload_resources(1, true)
    }

    // ------------------------------------------------------------------------
    // Load phases
    // ------------------------------------------------------------------------

    /// Start recording every resource fetched or created
    pub fn begin_load_phase(&mut self) {
        if self.phase.is_some() {
            log::warn!("Load phase already in progress, restarting it");
        }
        self.phase = Some(FxHashSet::default());
    }

    #[must_use]
    pub fn in_load_phase(&self) -> bool {
        self.phase.is_some()
    }

    /// Give the recorded resources persistence `level` and unload the
    /// unrecorded ones that had it. Returns the number unloaded.
    pub fn end_load_phase(&mut self, level: u16) -> usize {
        let Some(recorded) = self.phase.take() else {
            log::warn!("end_load_phase called without begin_load_phase");
            return 0;
        };

        let before = self.resources.len();
        self.resources.retain(|key, entry| {
            if entry.persistence == 0 {
                return true;
            }
            if recorded.contains(key) {
                entry.persistence = level;
                return true;
            }
            entry.persistence != level
        });
        before - self.resources.len()
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .resources
            .iter()
            .map(|((name, _), entry)| (name.as_str(), entry.type_name, entry.persistence))
            .collect();
        names.sort();
        f.debug_struct("ResourceManager")
            .field("resources", &names)
            .field("in_load_phase", &self.in_load_phase())
            .finish()
    }
}

fn unload(manager: &mut ResourceManager, _: (), args: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    manager.unload_resource(args.next_str()?);
    Ok(MessageResult::Continue)
}

fn unload_all(manager: &mut ResourceManager, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    manager.unload_all();
    Ok(MessageResult::Continue)
}

fn commands() -> &'static CommandHandler<ResourceManager> {
    static COMMANDS: OnceLock<CommandHandler<ResourceManager>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler = CommandHandler::new();
        handler.bind("unload", unload).bind("unloadAll", unload_all);
        handler
    })
}

impl Subsystem for ResourceManager {
    fn info(&self) -> &SubsystemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SubsystemInfo {
        &mut self.info
    }

    fn receive_message(&mut self, message: &Message) -> MessageResult {
        if message.pass_filter(Filter::COMMAND) {
            return commands().dispatch(self, (), message);
        }
        MessageResult::Continue
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
