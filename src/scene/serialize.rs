//! Scene serialization and deserialization
//!
//! Supports saving and loading scenes in RON (Rusty Object Notation) and JSON
//! format. Components are written through a `ComponentRegistry`, so only
//! registered component types survive a round trip.
//!
//! `SubtreeSnapshot` is the in-memory counterpart used by editor commands: it
//! keeps live component copies instead of serialized data.

use std::any::{Any, TypeId};
use std::fmt;
use std::fs;
use std::path::Path;

use hecs::Entity;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Component, Components, ROOT_KEY, Scene, SceneError};
use crate::ecs::{Children, Name, ObjectFlags, ObjectKey, Tags, Transform};

/// Current scene file version
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Flags written to scene files
const SAVED_FLAGS: ObjectFlags = ObjectFlags::IGNORE_MASK.union(ObjectFlags::IGNORE_PARENT);

// ============================================================================
// File data
// ============================================================================

/// A serialized component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentData {
    /// Registered type name
    pub type_name: String,
    /// Component fields
    pub data: serde_json::Value,
}

/// A serialized scene object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectData {
    /// Object ID
    pub id: String,
    /// Stable key
    pub key: ObjectKey,
    /// The object's own activity flag
    pub active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub transform: Transform,
    /// Ignore-parent and per-axis ignore bits
    #[serde(default)]
    pub ignore_flags: ObjectFlags,
    /// Index of the parent in `SceneData::objects`, `None` for children of the root
    pub parent_index: Option<usize>,
    #[serde(default)]
    pub components: Vec<ComponentData>,
}

/// A serializable scene, objects stored parent-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    /// Scene name
    pub name: String,
    /// Scene version for compatibility
    pub version: u32,
    pub active: bool,
    pub delta_scale: f32,
    /// All objects except the root
    pub objects: Vec<ObjectData>,
}

impl SceneData {
    /// Create a new empty scene
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: SCENE_FORMAT_VERSION,
            active: true,
            delta_scale: 1.0,
            objects: Vec::new(),
        }
    }

    /// Save the scene to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a scene from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        let scene: SceneData =
            ron::from_str(&content).map_err(|e| SceneError::DeserializeError(e.to_string()))?;
        Ok(scene)
    }

    /// Save the scene to a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| SceneError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load a scene from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or deserialization fails
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let content = fs::read_to_string(path).map_err(|e| SceneError::IoError(e.to_string()))?;
        let scene: SceneData = serde_json::from_str(&content)
            .map_err(|e| SceneError::DeserializeError(e.to_string()))?;
        Ok(scene)
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for SceneData {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

// ============================================================================
// Component registry
// ============================================================================

/// A component that can be written to scene files
pub trait SerializableComponent: Component + Serialize + DeserializeOwned {
    /// Name stored in `ComponentData::type_name`
    const TYPE_NAME: &'static str;
}

type SaveFn = fn(&dyn Component) -> Result<serde_json::Value, SceneError>;
type LoadFn = fn(serde_json::Value) -> Result<Box<dyn Component>, SceneError>;

fn save_component<C: SerializableComponent>(
    component: &dyn Component,
) -> Result<serde_json::Value, SceneError> {
    let component = component
        .as_any()
        .downcast_ref::<C>()
        .ok_or_else(|| SceneError::SerializeError(format!("expected {}", C::TYPE_NAME)))?;
    serde_json::to_value(component).map_err(|e| SceneError::SerializeError(e.to_string()))
}

fn load_component<C: SerializableComponent>(
    data: serde_json::Value,
) -> Result<Box<dyn Component>, SceneError> {
    let component: C = serde_json::from_value(data)
        .map_err(|e| SceneError::DeserializeError(format!("{}: {e}", C::TYPE_NAME)))?;
    Ok(Box::new(component))
}

/// Maps component types to their save and load functions
#[derive(Default)]
pub struct ComponentRegistry {
    savers: FxHashMap<TypeId, (&'static str, SaveFn)>,
    loaders: FxHashMap<&'static str, LoadFn>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: SerializableComponent>(&mut self) -> &mut Self {
        self.savers
            .insert(TypeId::of::<C>(), (C::TYPE_NAME, save_component::<C>));
        self.loaders.insert(C::TYPE_NAME, load_component::<C>);
        self
    }

    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.loaders.contains_key(type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Serialize a component. `None` if its type is not registered.
    pub fn save(&self, component: &dyn Component) -> Option<Result<ComponentData, SceneError>> {
        let (type_name, save) = self.savers.get(&Any::type_id(component.as_any()))?;
        Some(save(component).map(|data| ComponentData {
            type_name: (*type_name).to_string(),
            data,
        }))
    }

    /// Rebuild a component from its data
    ///
    /// # Errors
    ///
    /// Returns an error for unknown types or malformed data
    pub fn load(&self, data: &ComponentData) -> Result<Box<dyn Component>, SceneError> {
        let load = self.loaders.get(data.type_name.as_str()).ok_or_else(|| {
            SceneError::DeserializeError(format!("unknown component type \"{}\"", data.type_name))
        })?;
        load(data.data.clone())
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.loaders.keys().collect();
        names.sort();
        f.debug_struct("ComponentRegistry")
            .field("types", &names)
            .finish()
    }
}

// ============================================================================
// Scene <-> data
// ============================================================================

impl Scene {
    /// Capture the scene as serializable data. Removed objects are left out.
    #[must_use]
    pub fn to_data(&self, registry: &ComponentRegistry) -> SceneData {
        let mut data = SceneData::new(self.id.clone());
        data.active = self.flags(self.root).contains(ObjectFlags::ACTIVE);
        data.delta_scale = self.delta_scale;
        self.collect_object_data(self.root, None, registry, &mut data.objects);
        data
    }

    fn collect_object_data(
        &self,
        parent: Entity,
        parent_index: Option<usize>,
        registry: &ComponentRegistry,
        out: &mut Vec<ObjectData>,
    ) {
        for child in self.children(parent) {
            if self.is_removed(child) {
                continue;
            }
            let index = out.len();
            out.push(self.object_data(child, parent_index, registry));
            self.collect_object_data(child, Some(index), registry, out);
        }
    }

    fn object_data(
        &self,
        entity: Entity,
        parent_index: Option<usize>,
        registry: &ComponentRegistry,
    ) -> ObjectData {
        let flags = self.flags(entity);
        let mut components = Vec::new();
        if let Ok(list) = self.world.get::<Components>(entity) {
            for component in list.iter() {
                match registry.save(component.as_ref()) {
                    Some(Ok(data)) => components.push(data),
                    Some(Err(e)) => log::warn!("Skipping component {}: {e}", component.type_name()),
                    None => log::debug!("Component {} is not registered", component.type_name()),
                }
            }
        }

        ObjectData {
            id: self.object_id(entity).unwrap_or_default(),
            key: self.object_key(entity).unwrap_or(ROOT_KEY),
            active: flags.contains(ObjectFlags::ACTIVE),
            tags: self.tags(entity),
            transform: self.local_transform(entity).unwrap_or_default(),
            ignore_flags: flags.intersection(SAVED_FLAGS),
            parent_index,
            components,
        }
    }

    /// Build a scene from data
    ///
    /// # Errors
    ///
    /// Returns an error if a parent index does not point to an earlier object
    /// or two objects share a key
    pub fn from_data(data: &SceneData, registry: &ComponentRegistry) -> Result<Self, SceneError> {
        if data.version > SCENE_FORMAT_VERSION {
            log::warn!(
                "Scene \"{}\" has version {}, newer than supported {}",
                data.name,
                data.version,
                SCENE_FORMAT_VERSION
            );
        }

        let mut scene = Scene::new(data.name.clone());
        scene.set_delta_scale(data.delta_scale);

        let mut entities: Vec<Entity> = Vec::with_capacity(data.objects.len());
        for (index, object) in data.objects.iter().enumerate() {
            let parent = match object.parent_index {
                None => scene.root,
                Some(parent) => *entities.get(parent).ok_or_else(|| {
                    SceneError::DeserializeError(format!(
                        "object {index} (\"{}\") has invalid parent index {parent}",
                        object.id
                    ))
                })?,
            };

            let mut flags = ObjectFlags::SPAWN.union(object.ignore_flags.intersection(SAVED_FLAGS));
            flags.set(ObjectFlags::ACTIVE, object.active);

            let entity = scene.spawn_object(
                parent,
                Name::new(object.id.clone()),
                Some(object.key),
                flags,
                object.transform,
            )?;
            for tag in &object.tags {
                scene.add_tag(entity, tag.clone());
            }
            for component in &object.components {
                match registry.load(component) {
                    Ok(component) => scene.add_boxed_component(entity, component)?,
                    Err(e) => log::warn!("Object \"{}\": {e}", object.id),
                }
            }
            entities.push(entity);
        }

        let root = scene.root;
        scene.update_flags(root, |f| f.set(ObjectFlags::ACTIVE, data.active));
        scene.update_transform_tree();
        scene.events.clear();

        log::debug!("Loaded scene \"{}\" with {} objects", data.name, entities.len());
        Ok(scene)
    }

    /// Save this scene as RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_ron(&self, path: impl AsRef<Path>, registry: &ComponentRegistry) -> Result<(), SceneError> {
        self.to_data(registry).save_ron(path)
    }

    /// Load a scene saved as RON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed
    pub fn load_ron(path: impl AsRef<Path>, registry: &ComponentRegistry) -> Result<Self, SceneError> {
        Self::from_data(&SceneData::load_ron(path)?, registry)
    }

    /// Save this scene as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_json(&self, path: impl AsRef<Path>, registry: &ComponentRegistry) -> Result<(), SceneError> {
        self.to_data(registry).save_json(path)
    }

    /// Load a scene saved as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed
    pub fn load_json(path: impl AsRef<Path>, registry: &ComponentRegistry) -> Result<Self, SceneError> {
        Self::from_data(&SceneData::load_json(path)?, registry)
    }
}

// ============================================================================
// Subtree snapshots
// ============================================================================

#[derive(Debug)]
struct SnapshotNode {
    id: String,
    key: ObjectKey,
    flags: ObjectFlags,
    tags: Tags,
    transform: Transform,
    components: Vec<Box<dyn Component>>,
    parent_index: Option<usize>,
}

/// In-memory copy of an object and its descendants, restorable in place
#[derive(Debug)]
pub struct SubtreeSnapshot {
    parent: ObjectKey,
    sibling_index: usize,
    nodes: Vec<SnapshotNode>,
}

impl SubtreeSnapshot {
    /// Key of the snapshot's top object
    #[must_use]
    pub fn key(&self) -> Option<ObjectKey> {
        self.nodes.first().map(|node| node.key)
    }

    /// Key of the object the subtree hangs from
    #[must_use]
    pub fn parent_key(&self) -> ObjectKey {
        self.parent
    }

    /// Number of objects captured
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Scene {
    /// Capture an object and its descendants
    ///
    /// # Errors
    ///
    /// Returns an error for the root or an unknown entity
    pub fn snapshot_subtree(&self, entity: Entity) -> Result<SubtreeSnapshot, SceneError> {
        self.check(entity)?;
        if entity == self.root {
            return Err(SceneError::CannotCloneRoot);
        }
        let parent = self.parent(entity).ok_or(SceneError::NoSuchObject)?;
        let sibling_index = self
            .world
            .get::<Children>(parent)
            .ok()
            .and_then(|children| children.position(entity))
            .unwrap_or(0);

        let mut nodes = Vec::new();
        self.snapshot_node(entity, None, &mut nodes);

        Ok(SubtreeSnapshot {
            parent: self.object_key(parent).ok_or(SceneError::NoSuchObject)?,
            sibling_index,
            nodes,
        })
    }

    fn snapshot_node(&self, entity: Entity, parent_index: Option<usize>, nodes: &mut Vec<SnapshotNode>) {
        let index = nodes.len();
        nodes.push(SnapshotNode {
            id: self.object_id(entity).unwrap_or_default(),
            key: self.object_key(entity).unwrap_or(ROOT_KEY),
            flags: self.flags(entity),
            tags: self.world.get::<Tags>(entity).map_or_else(|_| Tags::new(), |t| (*t).clone()),
            transform: self.local_transform(entity).unwrap_or_default(),
            components: self
                .world
                .get::<Components>(entity)
                .map(|c| c.clone_all())
                .unwrap_or_default(),
            parent_index,
        });

        for child in self.children(entity) {
            if !self.is_removed(child) {
                self.snapshot_node(child, Some(index), nodes);
            }
        }
    }

    /// Recreate a captured subtree with its original keys and sibling position
    ///
    /// # Errors
    ///
    /// Returns an error if the parent no longer exists or a key is taken
    pub fn restore_subtree(&mut self, snapshot: &SubtreeSnapshot) -> Result<Entity, SceneError> {
        let parent = self
            .entity_by_key(snapshot.parent)
            .ok_or(SceneError::NoSuchObject)?;
        if let Some(taken) = snapshot.nodes.iter().find(|n| self.keys.contains_key(&n.key)) {
            return Err(SceneError::DuplicateKey(taken.key));
        }

        let mut entities: Vec<Entity> = Vec::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            let node_parent = match node.parent_index {
                Some(index) => *entities.get(index).ok_or(SceneError::NoSuchObject)?,
                None => parent,
            };
            let entity = self.spawn_object(
                node_parent,
                Name::new(node.id.clone()),
                Some(node.key),
                node.flags,
                node.transform,
            )?;
            if let Ok(mut tags) = self.world.get_mut::<Tags>(entity) {
                *tags = node.tags.clone();
            }
            for component in &node.components {
                if let Some(copy) = component.clone_component() {
                    self.add_boxed_component(entity, copy)?;
                }
            }
            entities.push(entity);
        }

        let top = *entities.first().ok_or(SceneError::NoSuchObject)?;
        if let Ok(mut children) = self.world.get_mut::<Children>(parent) {
            children.remove(top);
            children.insert(snapshot.sibling_index, top);
        }
        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ComponentInfo;
    use glam::Vec3;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Health {
        info: ComponentInfo,
        value: i32,
    }

    impl Component for Health {
        fn info(&self) -> &ComponentInfo {
            &self.info
        }

        fn info_mut(&mut self) -> &mut ComponentInfo {
            &mut self.info
        }

        fn clone_component(&self) -> Option<Box<dyn Component>> {
            Some(Box::new(self.clone()))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl SerializableComponent for Health {
        const TYPE_NAME: &'static str = "Health";
    }

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>();
        registry
    }

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("level");
        let root = scene.root();
        let player = scene.create_child(root, "player").unwrap();
        let weapon = scene.create_child(player, "weapon").unwrap();
        scene.create_child(root, "light").unwrap();

        scene.set_position(player, Vec3::new(1.0, 2.0, 3.0));
        scene.add_tag(player, "hero");
        scene.set_ignore_transform(weapon, ObjectFlags::IGNORE_ROTATION);
        scene
            .add_component(player, Health { info: ComponentInfo::new(4), value: 75 })
            .unwrap();
        scene
    }

    #[test]
    fn test_to_data_preorder() {
        let scene = sample_scene();
        let data = scene.to_data(&registry());

        assert_eq!(data.name, "level");
        assert_eq!(data.version, SCENE_FORMAT_VERSION);
        let ids: Vec<_> = data.objects.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["player", "weapon", "light"]);
        assert_eq!(data.objects[0].parent_index, None);
        assert_eq!(data.objects[1].parent_index, Some(0));
        assert_eq!(data.objects[0].components[0].type_name, "Health");
        assert_eq!(data.objects[1].ignore_flags, ObjectFlags::IGNORE_ROTATION);
    }

    #[test]
    fn test_data_round_trip() {
        let scene = sample_scene();
        let registry = registry();
        let data = scene.to_data(&registry);

        let loaded = Scene::from_data(&data, &registry).unwrap();
        let root = loaded.root();
        let player = loaded.find_child_with_path(root, "player").unwrap();
        let weapon = loaded.find_child_with_path(root, "player>weapon").unwrap();

        assert_eq!(loaded.object_count(), 4);
        assert_eq!(loaded.object_key(player), scene.object_key(scene.find_child(scene.root(), "player", false, true).unwrap()));
        assert_eq!(loaded.position(player), Vec3::new(1.0, 2.0, 3.0));
        assert!(loaded.has_tag(player, "hero"));
        assert_eq!(loaded.ignore_flags(weapon), ObjectFlags::IGNORE_ROTATION);
        assert_eq!(loaded.with_component(player, |h: &Health| (h.id(), h.value)), Some((4, 75)));
        assert_eq!(loaded.to_data(&registry), data);
    }

    #[test]
    fn test_ron_string_round_trip() {
        let data = sample_scene().to_data(&registry());
        let ron_str = ron::ser::to_string_pretty(&data, ron::ser::PrettyConfig::default()).unwrap();
        assert!(ron_str.contains("player"));

        let loaded: SceneData = ron::from_str(&ron_str).unwrap();
        assert_eq!(loaded.objects.len(), 3);
        assert_eq!(loaded.objects[0].components[0].data["value"], 75);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let scene = sample_scene();

        let ron_path = dir.path().join("level.ron");
        scene.save_ron(&ron_path, &registry).unwrap();
        let from_ron = Scene::load_ron(&ron_path, &registry).unwrap();
        assert_eq!(from_ron.object_count(), scene.object_count());

        let json_path = dir.path().join("level.json");
        scene.save_json(&json_path, &registry).unwrap();
        let from_json = Scene::load_json(&json_path, &registry).unwrap();
        assert_eq!(from_json.to_data(&registry), scene.to_data(&registry));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SceneData::load_ron("does/not/exist.ron").unwrap_err();
        assert!(matches!(err, SceneError::IoError(_)));
    }

    #[test]
    fn test_forward_parent_index_rejected() {
        let mut data = sample_scene().to_data(&registry());
        data.objects[1].parent_index = Some(2);

        let err = Scene::from_data(&data, &registry()).unwrap_err();
        assert!(matches!(err, SceneError::DeserializeError(_)));
    }

    #[test]
    fn test_unknown_components_skipped() {
        let data = sample_scene().to_data(&registry());
        let loaded = Scene::from_data(&data, &ComponentRegistry::new()).unwrap();

        let player = loaded.find_child(loaded.root(), "player", false, true).unwrap();
        assert_eq!(loaded.component_count(player), 0);
    }

    #[test]
    fn test_key_counter_continues_after_saved_keys() {
        let mut data = SceneData::new("keys");
        data.objects.push(ObjectData {
            id: "far".to_string(),
            key: ObjectKey(41),
            active: true,
            tags: Vec::new(),
            transform: Transform::default(),
            ignore_flags: ObjectFlags::NONE,
            parent_index: None,
            components: Vec::new(),
        });

        let mut scene = Scene::from_data(&data, &registry()).unwrap();
        let root = scene.root();
        let fresh = scene.create_child(root, "fresh").unwrap();
        assert_eq!(scene.object_key(fresh), Some(ObjectKey(42)));
        assert!(scene.drain_events().len() == 1);
    }

    #[test]
    fn test_snapshot_restores_in_place() {
        let mut scene = sample_scene();
        let root = scene.root();
        let player = scene.find_child(root, "player", false, true).unwrap();
        let player_key = scene.object_key(player).unwrap();

        let snapshot = scene.snapshot_subtree(player).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.key(), Some(player_key));

        scene.despawn_object(player).unwrap();
        assert_eq!(scene.child_count(root), 1);

        let restored = scene.restore_subtree(&snapshot).unwrap();
        assert_eq!(scene.object_key(restored), Some(player_key));
        assert_eq!(scene.children(root)[0], restored);
        assert_eq!(scene.make_search_path(scene.find_child(restored, "weapon", false, true).unwrap()), "player>weapon");
        assert_eq!(scene.with_component(restored, |h: &Health| h.value), Some(75));

        // The same snapshot cannot be restored twice
        assert_eq!(scene.restore_subtree(&snapshot), Err(SceneError::DuplicateKey(player_key)));
    }

    #[test]
    fn test_snapshot_root_rejected() {
        let scene = sample_scene();
        assert!(scene.snapshot_subtree(scene.root()).is_err());
    }
}
