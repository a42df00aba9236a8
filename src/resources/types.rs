//! The resource trait and the built-in resource types

use std::fmt;

use crate::core::{FileError, FileLoader};

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The resource is not in the manager
    NotLoaded(String),
    File(FileError),
    /// The file was read but its contents are invalid
    Parse { name: String, message: String },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded(name) => write!(f, "resource \"{name}\" is not loaded"),
            Self::File(e) => write!(f, "{e}"),
            Self::Parse { name, message } => write!(f, "resource \"{name}\": {message}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::File(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FileError> for ResourceError {
    fn from(e: FileError) -> Self {
        Self::File(e)
    }
}

/// Data the resource manager can load by name
pub trait Resource: Send + Sync + Sized + 'static {
    fn load(name: &str, files: &FileLoader) -> Result<Self, ResourceError>;

    /// Stand-in used when loading fails
    fn fallback() -> Option<Self> {
        None
    }
}

/// A UTF-8 text file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextResource {
    pub text: String,
}

impl Resource for TextResource {
    fn load(name: &str, files: &FileLoader) -> Result<Self, ResourceError> {
        Ok(Self {
            text: files.read_text(name)?,
        })
    }
}

/// A parsed JSON file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonResource {
    pub value: serde_json::Value,
}

impl Resource for JsonResource {
    fn load(name: &str, files: &FileLoader) -> Result<Self, ResourceError> {
        let text = files.read_text(name)?;
        let value = serde_json::from_str(&text).map_err(|e| ResourceError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { value })
    }

    fn fallback() -> Option<Self> {
        Some(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_builtin_types() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"x": 1}"#).unwrap();
        std::fs::write(dir.path().join("bad.json"), "{").unwrap();
        let mut files = FileLoader::new(dir.path());
        files.add_resource_dir(dir.path());

        assert_eq!(TextResource::load("a.txt", &files).unwrap().text, "hello");
        assert_eq!(
            JsonResource::load("b.json", &files).unwrap().value["x"],
            serde_json::Value::from(1)
        );
        assert!(matches!(
            JsonResource::load("bad.json", &files),
            Err(ResourceError::Parse { .. })
        ));
        assert!(matches!(
            TextResource::load("none.txt", &files),
            Err(ResourceError::File(FileError::NotFound(_)))
        ));
        assert!(TextResource::fallback().is_none());
    }
}
