//! File access rooted at resource and user directories
//!
//! Reads look through the resource directories in the order they were added,
//! then the user directory, then the name as given. Writes always name the
//! directory they go to.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Base directory for writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    /// The first resource directory
    Resource,
    /// Per-user writable data
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// No search location has the file
    NotFound(String),
    Io { path: PathBuf, message: String },
    /// The file was read but its contents could not be parsed
    Parse { path: PathBuf, message: String },
}

impl FileError {
    pub(crate) fn io(path: &Path, error: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "file not found: {name}"),
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Parse { path, message } => {
                write!(f, "{}: parse error: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for FileError {}

#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    resource_dirs: Vec<PathBuf>,
    user_dir: PathBuf,
}

impl FileLoader {
    #[must_use]
    pub fn new(user_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dirs: Vec::new(),
            user_dir: user_dir.into(),
        }
    }

    /// Add a directory to the end of the search list
    pub fn add_resource_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        let dir = dir.into();
        if !self.resource_dirs.contains(&dir) {
            self.resource_dirs.push(dir);
        }
        self
    }

    #[must_use]
    pub fn resource_dirs(&self) -> &[PathBuf] {
        &self.resource_dirs
    }

    #[must_use]
    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    pub fn set_user_dir(&mut self, dir: impl Into<PathBuf>) {
        self.user_dir = dir.into();
    }

    /// Root path for a write directory
    #[must_use]
    pub fn directory(&self, dir: Directory) -> &Path {
        match dir {
            Directory::Resource => self
                .resource_dirs
                .first()
                .map_or(self.user_dir.as_path(), PathBuf::as_path),
            Directory::User => &self.user_dir,
        }
    }

    fn search_paths<'a>(&'a self, name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.resource_dirs
            .iter()
            .chain(std::iter::once(&self.user_dir))
            .map(move |dir| dir.join(name))
            .chain(std::iter::once(PathBuf::from(name)))
    }

    /// First existing path for `name`
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        self.search_paths(name).find(|path| path.is_file())
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn read_text(&self, name: &str) -> Result<String, FileError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| FileError::NotFound(name.to_string()))?;
        fs::read_to_string(&path).map_err(|e| FileError::io(&path, e))
    }

    pub fn read_bytes(&self, name: &str) -> Result<Vec<u8>, FileError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| FileError::NotFound(name.to_string()))?;
        fs::read(&path).map_err(|e| FileError::io(&path, e))
    }

    /// Write a text file, creating parent directories. Returns the full path.
    pub fn write_text(&self, dir: Directory, name: &str, text: &str) -> Result<PathBuf, FileError> {
        self.write_bytes(dir, name, text.as_bytes())
    }

    pub fn write_bytes(&self, dir: Directory, name: &str, data: &[u8]) -> Result<PathBuf, FileError> {
        let path = self.directory(dir).join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FileError::io(parent, e))?;
        }
        fs::write(&path, data).map_err(|e| FileError::io(&path, e))?;
        Ok(path)
    }

    /// Delete a file in a write directory. Returns whether it existed.
    pub fn delete(&self, dir: Directory, name: &str) -> Result<bool, FileError> {
        let path = self.directory(dir).join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FileError::io(&path, e)),
        }
    }

    /// Files directly inside `dir` in every search location, as names
    /// relative to that location, sorted and deduplicated
    #[must_use]
    pub fn list_files(&self, dir: &str) -> Vec<String> {
        self.collect_files(dir, false)
    }

    #[must_use]
    pub fn list_files_recursive(&self, dir: &str) -> Vec<String> {
        self.collect_files(dir, true)
    }

    fn collect_files(&self, dir: &str, recursive: bool) -> Vec<String> {
        let mut names = Vec::new();
        for base in self.resource_dirs.iter().chain(std::iter::once(&self.user_dir)) {
            let mut pending = vec![base.join(dir)];
            while let Some(current) = pending.pop() {
                let Ok(entries) = fs::read_dir(&current) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        if recursive {
                            pending.push(path);
                        }
                    } else if let Ok(relative) = path.strip_prefix(base) {
                        names.push(relative.to_string_lossy().replace('\\', "/"));
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }
}
