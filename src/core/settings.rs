//! Setting manager
//!
//! Settings live in JSON documents, one per file in the settings directory.
//! A setting path names the document and the keys inside it:
//!
//! ```text
//! engine/Debug|Console|uVerbosity   -> engine.json: {"Debug":{"Console":{"uVerbosity":3}}}
//! uMaxCommandBufferSize             -> <default root>.json
//! ```
//!
//! Reading a setting that does not exist creates it with the supplied
//! default, so saving writes out a complete, editable configuration.
//!
//! # Example
//!
//! ```ignore
//! let mut settings = SettingManager::new("config");
//! let size: u32 = settings.get("uMaxCommandBufferSize", 100);
//! settings.register_callback("engine/Window|fScale", |value| {
//!     log::info!("scale is now {value}");
//! });
//! settings.set("engine/Window|fScale", 1.5_f32);
//! ```

use std::any::Any;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime};

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::handler::{CommandError, CommandHandler};
use super::message::{Arguments, Filter, Message, MessageResult};
use super::subsystem::{FrameContext, Subsystem, SubsystemInfo};

/// Root used by paths without a document name
pub const DEFAULT_ROOT: &str = "root";

// ============================================================================
// Setting values
// ============================================================================

/// A type that can be stored as a setting
pub trait SettingValue: Sized + fmt::Debug {
    const TYPE_NAME: &'static str;

    /// `None` when the JSON value has another type
    fn from_json(value: &Value) -> Option<Self>;

    fn to_json(&self) -> Value;
}

impl SettingValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl SettingValue for i32 {
    const TYPE_NAME: &'static str = "i32";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl SettingValue for u32 {
    const TYPE_NAME: &'static str = "u32";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|v| u32::try_from(v).ok())
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

// Integers written by hand in a file are accepted where a float is expected
impl SettingValue for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }

    fn to_json(&self) -> Value {
        Value::from(f64::from(*self))
    }
}

impl SettingValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl SettingValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

// ============================================================================
// Documents and callbacks
// ============================================================================

/// Handle returned by `register_callback`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type ChangeCallback = Box<dyn FnMut(&Value) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug, Default)]
struct Document {
    value: Value,
    stamp: Option<FileStamp>,
}

fn lookup<'v>(doc: &'v Value, keys: &str) -> Option<&'v Value> {
    keys.split('|').try_fold(doc, |value, key| value.get(key))
}

/// Walk to `keys`, adding objects on the way and a null at the end
fn lookup_or_create<'v>(doc: &'v mut Value, keys: &str) -> Option<&'v mut Value> {
    let mut current = doc;
    let mut parts = keys.split('|').peekable();
    while let Some(key) = parts.next() {
        let fill = if parts.peek().is_some() {
            Value::Object(Map::new())
        } else {
            Value::Null
        };
        current = current.as_object_mut()?.entry(key).or_insert(fill);
    }
    Some(current)
}

// ============================================================================
// Setting manager
// ============================================================================

pub struct SettingManager {
    info: SubsystemInfo,
    dir: PathBuf,
    default_root: String,
    documents: FxHashMap<String, Document>,
    callbacks: FxHashMap<String, Vec<(CallbackId, ChangeCallback)>>,
    next_callback: u64,
    auto_update: bool,
    poll_interval: Duration,
    last_poll: Instant,
}

impl SettingManager {
    pub const ID: &'static str = "Setting Manager";

    /// Create a manager over `dir` and load every document in it
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut manager = Self {
            info: SubsystemInfo::new(Self::ID),
            dir: dir.into(),
            default_root: DEFAULT_ROOT.to_string(),
            documents: FxHashMap::default(),
            callbacks: FxHashMap::default(),
            next_callback: 0,
            auto_update: true,
            poll_interval: Duration::from_secs(1),
            last_poll: Instant::now(),
        };

        manager.reload();
        manager.default_root = manager.get("sDefaultSettingRoot", DEFAULT_ROOT.to_string());
        manager.auto_update = manager.get("engine/Settings|bAutoUpdate", true);
        let interval: f32 = manager.get("engine/Settings|fPollInterval", 1.0);
        manager.poll_interval =
            Duration::try_from_secs_f32(interval).unwrap_or(Duration::from_secs(1));
        manager
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn default_root(&self) -> &str {
        &self.default_root
    }

    /// Document name and key path for a setting path
    fn split_path<'p>(&self, path: &'p str) -> (String, &'p str) {
        match path.find(['/', '\\']) {
            Some(0) => (self.default_root.clone(), &path[1..]),
            Some(pos) => (path[..pos].to_string(), &path[pos + 1..]),
            None => (self.default_root.clone(), path),
        }
    }

    fn canonical(&self, path: &str) -> String {
        let (root, keys) = self.split_path(path);
        format!("{root}/{keys}")
    }

    fn document_mut(&mut self, root: String) -> &mut Value {
        let doc = &mut self.documents.entry(root).or_default().value;
        if !doc.is_object() {
            *doc = Value::Object(Map::new());
        }
        doc
    }

    /// Read a setting, creating it with `default` when it is missing
    pub fn get<T: SettingValue>(&mut self, path: &str, default: T) -> T {
        if path.is_empty() {
            return default;
        }

        let (root, keys) = self.split_path(path);
        let doc = self.document_mut(root);

        let Some(value) = lookup_or_create(doc, keys) else {
            log::error!("Setting \"{path}\" couldn't be written. Using default value {default:?}");
            return default;
        };

        if value.is_null() {
            log::debug!("Setting \"{path}\" doesn't exist. Creating an entry using value {default:?}");
            *value = default.to_json();
            return default;
        }

        match T::from_json(value) {
            Some(found) => found,
            None => {
                log::error!(
                    "Setting \"{path}\" is not convertible into {}. Using default value {default:?}",
                    T::TYPE_NAME
                );
                default
            }
        }
    }

    /// Read a setting without creating it
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        let (root, keys) = self.split_path(path);
        lookup(&self.documents.get(&root)?.value, keys)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.value(path).is_some_and(|v| !v.is_null())
    }

    /// Write a setting and notify the callbacks registered for its path
    pub fn set<T: SettingValue>(&mut self, path: &str, value: T) {
        if path.is_empty() {
            return;
        }

        let (root, keys) = self.split_path(path);
        let doc = self.document_mut(root);

        let Some(slot) = lookup_or_create(doc, keys) else {
            log::error!("Setting \"{path}\" couldn't be written");
            return;
        };

        if !slot.is_null() && T::from_json(slot).is_none() {
            log::error!("Setting \"{path}\" was not set, unmatched type");
            return;
        }

        *slot = value.to_json();
        let written = slot.clone();
        let key = self.canonical(path);
        self.notify(&key, &written);
    }

    fn notify(&mut self, canonical: &str, value: &Value) {
        if let Some(callbacks) = self.callbacks.get_mut(canonical) {
            for (_, callback) in callbacks.iter_mut() {
                callback(value);
            }
        }
    }

    /// Call `callback` with the new value whenever `path` changes
    pub fn register_callback(
        &mut self,
        path: &str,
        callback: impl FnMut(&Value) + Send + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_callback);
        self.next_callback += 1;
        let key = self.canonical(path);
        self.callbacks
            .entry(key)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Returns whether the callback was registered
    pub fn unregister_callback(&mut self, id: CallbackId) -> bool {
        for callbacks in self.callbacks.values_mut() {
            if let Some(index) = callbacks.iter().position(|(cid, _)| *cid == id) {
                drop(callbacks.remove(index));
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.values().map(Vec::len).sum()
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    fn json_files(&self) -> Vec<(String, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            log::debug!("Setting directory {} not readable", self.dir.display());
            return Vec::new();
        };

        let mut files: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        files.sort();
        files
    }

    /// Returns whether the document was replaced
    fn load_file(&mut self, root: String, path: &Path) -> bool {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to read setting file {}: {e}", path.display());
                return false;
            }
        };

        let stamp = FileStamp::of(path);
        match serde_json::from_str::<Value>(&text) {
            Ok(value) if value.is_object() => {
                self.documents.insert(root, Document { value, stamp });
                true
            }
            Ok(_) => {
                log::error!("Setting file {} is not a JSON object, skipped", path.display());
                self.documents.entry(root).or_default().stamp = stamp;
                false
            }
            Err(e) => {
                log::error!("Setting file {} has a parse error, skipped: {e}", path.display());
                self.documents.entry(root).or_default().stamp = stamp;
                false
            }
        }
    }

    /// Read every `*.json` file in the settings directory
    pub fn reload(&mut self) {
        for (root, path) in self.json_files() {
            self.load_file(root, &path);
        }
        self.last_poll = Instant::now();
    }

    /// Write every document to `<dir>/<root>.json`
    pub fn save(&mut self) {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            log::error!("Couldn't create setting directory {}: {e}", self.dir.display());
            return;
        }

        let mut stamps = Vec::new();
        for (root, doc) in &self.documents {
            let path = self.dir.join(format!("{root}.json"));
            let result = serde_json::to_string_pretty(&doc.value)
                .map_err(|e| e.to_string())
                .and_then(|text| fs::write(&path, text).map_err(|e| e.to_string()));

            match result {
                Ok(()) => {
                    log::info!("Saved setting file \"{root}.json\"");
                    stamps.push((root.clone(), FileStamp::of(&path)));
                }
                Err(e) => log::error!("Failed to save setting file \"{root}.json\": {e}"),
            }
        }

        // Our own writes are not external changes
        for (root, stamp) in stamps {
            if let Some(doc) = self.documents.get_mut(&root) {
                doc.stamp = stamp;
            }
        }
    }

    /// Reload files changed on disk since they were last read and notify the
    /// callbacks of their roots. Returns the number of files reloaded.
    pub fn poll_changes(&mut self) -> usize {
        self.last_poll = Instant::now();

        let mut reloaded = 0;
        for (root, path) in self.json_files() {
            let stamp = FileStamp::of(&path);
            let known = self.documents.get(&root).and_then(|doc| doc.stamp);
            if stamp.is_none() || stamp == known {
                continue;
            }

            log::debug!("Setting file {} changed, reloading", path.display());
            if self.load_file(root.clone(), &path) {
                reloaded += 1;
                self.notify_root(&root);
            }
        }
        reloaded
    }

    fn notify_root(&mut self, root: &str) {
        let prefix = format!("{root}/");
        let paths: Vec<String> = self
            .callbacks
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect();

        for path in paths {
            let Some(value) = self.value(&path).cloned() else {
                continue;
            };
            self.notify(&path, &value);
        }
    }

    #[must_use]
    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn set_auto_update(&mut self, enabled: bool) {
        self.auto_update = enabled;
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }
}

impl fmt::Debug for SettingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut roots: Vec<_> = self.documents.keys().collect();
        roots.sort();
        f.debug_struct("SettingManager")
            .field("dir", &self.dir)
            .field("default_root", &self.default_root)
            .field("documents", &roots)
            .field("callbacks", &self.callback_count())
            .finish()
    }
}

fn save(settings: &mut SettingManager, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    settings.save();
    Ok(MessageResult::Continue)
}

fn reload(settings: &mut SettingManager, _: (), _: &mut Arguments<'_>) -> Result<MessageResult, CommandError> {
    settings.reload();
    Ok(MessageResult::Continue)
}

fn commands() -> &'static CommandHandler<SettingManager> {
    static COMMANDS: OnceLock<CommandHandler<SettingManager>> = OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler = CommandHandler::new();
        handler.bind("save", save).bind("reload", reload);
        handler
    })
}

impl Subsystem for SettingManager {
    fn info(&self) -> &SubsystemInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut SubsystemInfo {
        &mut self.info
    }

    fn pre_update(&mut self, _ctx: &mut FrameContext<'_>) {
        if self.auto_update && self.last_poll.elapsed() >= self.poll_interval {
            self.poll_changes();
        }
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
