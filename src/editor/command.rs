//! Undoable scene edits
//!
//! Commands name their objects by `ObjectKey` rather than by entity, so a
//! command recorded before an object was removed and restored still finds it.

use std::fmt;

use glam::{Quat, Vec3};
use hecs::Entity;

use crate::ecs::ObjectKey;
use crate::scene::{Scene, SceneError, SubtreeSnapshot};

/// Local position of objects created from the editor
pub const CREATE_POSITION: Vec3 = Vec3::new(0.0, 0.0, -2.0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// No object with this key exists in the scene
    NoSuchObject(ObjectKey),
    /// The command was undone before it was executed
    NotExecuted(&'static str),
    Scene(SceneError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchObject(key) => write!(f, "no object with key {key}"),
            Self::NotExecuted(name) => write!(f, "{name} has not been executed"),
            Self::Scene(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scene(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SceneError> for EditorError {
    fn from(e: SceneError) -> Self {
        Self::Scene(e)
    }
}

/// A reversible edit of a scene
pub trait Command: Send + fmt::Debug {
    fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError>;

    /// Revert the last `execute`
    fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError>;

    fn name(&self) -> &'static str;
}

fn entity(scene: &Scene, key: ObjectKey) -> Result<Entity, EditorError> {
    scene.entity_by_key(key).ok_or(EditorError::NoSuchObject(key))
}

// ============================================================================
// Structure
// ============================================================================

/// Create an object under `parent`, or under the scene root when `None`
#[derive(Debug, Clone)]
pub struct CreateObjectCommand {
    parent: Option<ObjectKey>,
    id: String,
    key: Option<ObjectKey>,
}

impl CreateObjectCommand {
    #[must_use]
    pub fn new(parent: Option<ObjectKey>, id: impl Into<String>) -> Self {
        Self {
            parent,
            id: id.into(),
            key: None,
        }
    }

    /// Key of the created object, known after the first execution
    #[must_use]
    pub fn key(&self) -> Option<ObjectKey> {
        self.key
    }
}

impl Command for CreateObjectCommand {
    fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let parent = match self.parent {
            Some(key) => entity(scene, key)?,
            None => scene.root(),
        };
        let created = match self.key {
            Some(key) => scene.create_child_with_key(parent, self.id.clone(), key)?,
            None => scene.create_child(parent, self.id.clone())?,
        };
        scene.set_position(created, CREATE_POSITION);
        self.key = scene.object_key(created);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let key = self.key.ok_or(EditorError::NotExecuted(self.name()))?;
        scene.despawn_object(entity(scene, key)?)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Create Object"
    }
}

/// Remove an object and its subtree, keeping a copy to restore
#[derive(Debug)]
pub struct RemoveObjectCommand {
    target: ObjectKey,
    snapshot: Option<SubtreeSnapshot>,
}

impl RemoveObjectCommand {
    #[must_use]
    pub fn new(target: ObjectKey) -> Self {
        Self {
            target,
            snapshot: None,
        }
    }
}

impl Command for RemoveObjectCommand {
    fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let target = entity(scene, self.target)?;
        let snapshot = scene.snapshot_subtree(target)?;
        scene.despawn_object(target)?;
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or(EditorError::NotExecuted(self.name()))?;
        if let Err(e) = scene.restore_subtree(&snapshot) {
            self.snapshot = Some(snapshot);
            return Err(e.into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Remove Object"
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
pub struct ChangeObjectIdCommand {
    target: ObjectKey,
    id: String,
    previous: Option<String>,
}

impl ChangeObjectIdCommand {
    #[must_use]
    pub fn new(target: ObjectKey, id: impl Into<String>) -> Self {
        Self {
            target,
            id: id.into(),
            previous: None,
        }
    }
}

impl Command for ChangeObjectIdCommand {
    fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let target = entity(scene, self.target)?;
        self.previous = scene.object_id(target);
        scene.set_object_id(target, self.id.clone());
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let previous = self
            .previous
            .clone()
            .ok_or(EditorError::NotExecuted(self.name()))?;
        let target = entity(scene, self.target)?;
        scene.set_object_id(target, previous);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Change Object ID"
    }
}

#[derive(Debug, Clone)]
pub struct SetActiveCommand {
    target: ObjectKey,
    active: bool,
    previous: Option<bool>,
}

impl SetActiveCommand {
    #[must_use]
    pub fn new(target: ObjectKey, active: bool) -> Self {
        Self {
            target,
            active,
            previous: None,
        }
    }
}

impl Command for SetActiveCommand {
    fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let target = entity(scene, self.target)?;
        self.previous = Some(scene.is_active(target));
        scene.set_active(target, self.active);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
        let previous = self.previous.ok_or(EditorError::NotExecuted(self.name()))?;
        let target = entity(scene, self.target)?;
        scene.set_active(target, previous);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Set Active"
    }
}

/// Generates a command that swaps one local transform property
macro_rules! transform_command {
    ($(#[$doc:meta])* $command:ident, $value:ty, $get:ident, $set:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $command {
            target: ObjectKey,
            value: $value,
            previous: Option<$value>,
        }

        impl $command {
            #[must_use]
            pub fn new(target: ObjectKey, value: $value) -> Self {
                Self {
                    target,
                    value,
                    previous: None,
                }
            }
        }

        impl Command for $command {
            fn execute(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
                let target = entity(scene, self.target)?;
                self.previous = Some(scene.$get(target));
                scene.$set(target, self.value);
                Ok(())
            }

            fn undo(&mut self, scene: &mut Scene) -> Result<(), EditorError> {
                let previous = self.previous.ok_or(EditorError::NotExecuted(self.name()))?;
                let target = entity(scene, self.target)?;
                scene.$set(target, previous);
                Ok(())
            }

            fn name(&self) -> &'static str {
                $name
            }
        }
    };
}

transform_command!(
    /// Move an object to a local position
    SetPositionCommand, Vec3, position, set_position, "Set Position"
);
transform_command!(SetScaleCommand, Vec3, scale, set_scale, "Set Scale");
transform_command!(SetRotationCommand, Quat, rotation, set_rotation, "Set Rotation");
