//! Scene graph
//!
//! A `Scene` owns a world of objects arranged in a tree under a root object
//! that stands for the scene itself. Objects carry an ID, a stable key, tags,
//! a local transform and a list of behaviour components. Global transforms
//! are derived from the tree and cached until something above them changes.
//!
//! # Design Principles
//!
//! - **Deferred removal**: `remove_object` only marks; the parent sweeps it on
//!   its next update, so components may remove things while the tree is walked
//! - **Lazy globals**: setters mark a subtree dirty, `update_transform_tree`
//!   refreshes the cache, and getters never return stale values
//! - **Stable keys**: `ObjectKey` survives despawn/restore, entity handles do not
//!
//! # Example
//!
//! ```ignore
//! let mut scene = Scene::new("level");
//! let root = scene.root();
//! let arm = scene.create_child(root, "arm")?;
//! let hand = scene.create_child(arm, "hand")?;
//! scene.set_position(arm, Vec3::X).set_position(hand, Vec3::Y);
//! scene.update_transform_tree();
//! assert_eq!(scene.find_child_with_path(root, "arm>hand"), Some(hand));
//! ```

mod commands;
mod component;
mod graph;
mod serialize;
mod transform;

use std::fmt;

use hecs::Entity;
use rustc_hash::FxHashMap;

use component::Detached;
pub use component::{Component, ComponentContext, ComponentInfo, Components};
pub use serialize::{
    ComponentData, ComponentRegistry, ObjectData, SCENE_FORMAT_VERSION, SceneData,
    SerializableComponent, SubtreeSnapshot,
};

use crate::core::{CommandError, EngineEvent, Filter, Message, MessageResult};
use crate::ecs::{Children, GlobalTransform, Name, ObjectFlags, ObjectKey, Parent, Tags, Transform, World};
use crate::physics::Physics;

/// Key reserved for the scene root
pub const ROOT_KEY: ObjectKey = ObjectKey(0);

/// A tree of objects with its own physics world
pub struct Scene {
    id: String,
    world: World,
    root: Entity,
    keys: FxHashMap<ObjectKey, Entity>,
    next_key: u64,
    delta_scale: f32,
    physics: Physics,
    events: Vec<EngineEvent>,
    detached: Option<Detached>,
}

impl Scene {
    /// Create an empty scene. The root object takes the scene ID.
    pub fn new(id: impl Into<String>) -> Self {
        let id = Name::sanitize(id.into());
        let mut world = World::new();

        let root = world.spawn((
            Name(id.clone()),
            ROOT_KEY,
            Tags::new(),
            ObjectFlags::SPAWN,
            Transform::default(),
            GlobalTransform::identity(),
            Children::new(),
            Components::new(),
        ));

        let mut keys = FxHashMap::default();
        keys.insert(ROOT_KEY, root);

        Self {
            id,
            world,
            root,
            keys,
            next_key: ROOT_KEY.0 + 1,
            delta_scale: 1.0,
            physics: Physics::new(),
            events: Vec::new(),
            detached: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rename the scene and its root object
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Name::sanitize(id.into());
        if let Ok(mut name) = self.world.get_mut::<Name>(self.root) {
            name.0 = self.id.clone();
        }
    }

    /// The root object, which stands for the scene itself
    #[must_use]
    pub fn root(&self) -> Entity {
        self.root
    }

    #[must_use]
    pub fn delta_scale(&self) -> f32 {
        self.delta_scale
    }

    /// Multiplier applied to the frame delta before objects see it
    pub fn set_delta_scale(&mut self, scale: f32) {
        self.delta_scale = scale.max(0.0);
    }

    #[must_use]
    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut Physics {
        &mut self.physics
    }

    /// Read-only access to the underlying world
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub(crate) fn push_event(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Number of objects, the root included
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.keys.len()
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------------

    /// Advance the scene by `dt` seconds (scaled by the delta scale)
    pub fn update(&mut self, dt: f32) {
        if !self.is_active(self.root) {
            return;
        }

        let dt = dt * self.delta_scale;
        self.update_transform_tree();
        self.update_object(self.root, dt);
        self.update_transform_tree();
    }

    fn update_object(&mut self, entity: Entity, dt: f32) {
        if !self.is_active(entity) {
            return;
        }

        self.sweep_removed(entity);
        self.update_components(entity, dt);

        for child in self.children(entity) {
            if self.contains(child) {
                self.update_object(child, dt);
            }
        }
    }

    /// Runs at most as many updates as the object had components when it started
    fn update_components(&mut self, entity: Entity, dt: f32) {
        let count = self.component_count(entity);
        let mut index = 0;

        for _ in 0..count {
            if !self.is_active(entity) {
                break;
            }
            // Taken out one at a time so it can borrow the scene mutably
            let taken = self
                .world
                .get_mut::<Components>(entity)
                .ok()
                .and_then(|mut components| components.take(index));
            let Some(mut component) = taken else {
                break;
            };

            self.detached = Some(Detached {
                entity,
                index,
                id: component.id(),
                removed: false,
                deactivated: false,
            });
            component.update(
                &mut ComponentContext {
                    scene: &mut *self,
                    object: entity,
                },
                dt,
            );
            let Some(detached) = self.detached.take() else {
                break;
            };

            index = detached.index;
            if detached.removed {
                continue;
            }
            if detached.deactivated {
                component.set_active(false);
            }
            if let Ok(mut components) = self.world.get_mut::<Components>(entity) {
                components.insert(index, component);
            }
            index += 1;
        }
    }

    /// Run one fixed physics step and sync bodies with their objects
    pub fn fixed_update(&mut self, step: f32) {
        if !self.is_active(self.root) {
            return;
        }

        let step = step * self.delta_scale;
        if step <= 0.0 {
            return;
        }

        self.push_kinematic_targets();
        self.physics.step(step);
        self.pull_dynamic_poses();
        self.report_contacts();
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Deliver a message to this scene as a regular scene
    pub fn send_message(&mut self, message: &Message) -> MessageResult {
        self.deliver(message, Filter::SCENE)
    }

    /// Parse and deliver a message
    pub fn send_message_str(&mut self, text: &str) -> MessageResult {
        self.send_message(&Message::new(text))
    }

    /// Deliver a message, with `scene_bit` telling which scene slot this is
    pub(crate) fn deliver(&mut self, message: &Message, scene_bit: Filter) -> MessageResult {
        if message.pass_filter(scene_bit | Filter::COMMAND)
            && message.pass_id(&self.id)
            && commands::scene_commands()
                .dispatch(self, (), message)
                .is_escape()
        {
            return MessageResult::Escape;
        }

        if message.pass_filter(Filter::OBJECT) || message.pass_filter(Filter::COMPONENT) {
            return self.deliver_to_object(self.root, message);
        }
        MessageResult::Continue
    }

    fn deliver_to_object(&mut self, entity: Entity, message: &Message) -> MessageResult {
        // Children created by this message do not receive it
        let children = self.children(entity);

        if message.pass_filter(Filter::OBJECT | Filter::COMMAND) {
            let passes = {
                let id_ok = self
                    .world
                    .get::<Name>(entity)
                    .is_ok_and(|name| message.pass_id(&name.0));
                let tags = self.world.get::<Tags>(entity).ok();
                id_ok && message.pass_tags(tags.as_deref())
            };
            if passes
                && commands::object_commands()
                    .dispatch(self, entity, message)
                    .is_escape()
            {
                return MessageResult::Escape;
            }
        }

        if message.pass_filter(Filter::COMPONENT)
            && let Ok(mut components) = self.world.get_mut::<Components>(entity)
        {
            for component in components.iter_mut() {
                if component::deliver(component.as_mut(), message).is_escape() {
                    return MessageResult::Escape;
                }
            }
        }

        for child in children {
            if self.contains(child)
                && !self.is_removed(child)
                && self.deliver_to_object(child, message).is_escape()
            {
                return MessageResult::Escape;
            }
        }
        MessageResult::Continue
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    fn allocate_key(&mut self) -> ObjectKey {
        let key = ObjectKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Spawn an object under `parent` with the given identity
    fn spawn_object(
        &mut self,
        parent: Entity,
        name: Name,
        key: Option<ObjectKey>,
        flags: ObjectFlags,
        transform: Transform,
    ) -> Result<Entity, SceneError> {
        self.check(parent)?;

        let key = match key {
            Some(key) if self.keys.contains_key(&key) => return Err(SceneError::DuplicateKey(key)),
            Some(key) => key,
            None => self.allocate_key(),
        };
        self.next_key = self.next_key.max(key.0 + 1);

        let mut flags = flags;
        flags.insert(ObjectFlags::TRANSFORM_DIRTY);
        flags.remove(ObjectFlags::REMOVED | ObjectFlags::CHILDREN_REMOVED);

        let entity = self.world.spawn((
            name,
            key,
            Tags::new(),
            flags,
            transform,
            GlobalTransform::identity(),
            Children::new(),
            Components::new(),
            Parent(parent),
        ));

        if let Ok(mut children) = self.world.get_mut::<Children>(parent) {
            children.add(entity);
        }
        self.keys.insert(key, entity);
        self.events.push(EngineEvent::ObjectCreated {
            scene: self.id.clone(),
            key,
        });
        Ok(entity)
    }

    /// Error unless `entity` is an object of this scene
    fn check(&self, entity: Entity) -> Result<(), SceneError> {
        if self.world.contains(entity) {
            Ok(())
        } else {
            Err(SceneError::NoSuchObject)
        }
    }

    fn flags(&self, entity: Entity) -> ObjectFlags {
        self.world
            .get_copied::<ObjectFlags>(entity)
            .unwrap_or(ObjectFlags::NONE)
    }

    fn update_flags(&mut self, entity: Entity, f: impl FnOnce(&mut ObjectFlags)) {
        if let Ok(mut flags) = self.world.get_mut::<ObjectFlags>(entity) {
            f(&mut flags);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("objects", &self.object_count())
            .field("delta_scale", &self.delta_scale)
            .finish()
    }
}

/// Errors that can occur during scene operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The entity is not an object of this scene
    NoSuchObject,
    /// The scene root cannot be given a new parent
    CannotReparentRoot,
    /// The scene root cannot be removed
    CannotRemoveRoot,
    /// The scene root cannot be cloned
    CannotCloneRoot,
    /// The new parent is the object itself or one of its descendants
    CyclicHierarchy,
    /// An object with this key already exists
    DuplicateKey(ObjectKey),
    /// The collision shape has no volume or no points
    InvalidShape,
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchObject => write!(f, "no such object in scene"),
            Self::CannotReparentRoot => write!(f, "the scene root cannot be re-parented"),
            Self::CannotRemoveRoot => write!(f, "the scene root cannot be removed"),
            Self::CannotCloneRoot => write!(f, "the scene root cannot be cloned"),
            Self::CyclicHierarchy => write!(f, "an object cannot be adopted by its own descendant"),
            Self::DuplicateKey(key) => write!(f, "object key {key} already in use"),
            Self::InvalidShape => write!(f, "invalid collision shape"),
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
        }
    }
}

impl std::error::Error for SceneError {}

impl From<SceneError> for CommandError {
    fn from(error: SceneError) -> Self {
        Self::Failed(error.to_string())
    }
}
