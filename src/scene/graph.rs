//! Object hierarchy: creation, re-parenting, cloning, removal and lookup

use std::fmt::Write as _;

use hecs::Entity;

use super::{Components, Scene, SceneError};
use crate::core::EngineEvent;
use crate::ecs::{Children, Name, ObjectFlags, ObjectKey, Parent, Tags, Transform};
use crate::physics::RigidBody;

impl Scene {
    // ========================================================================
    // Creation and re-parenting
    // ========================================================================

    /// Create a child object. It starts with the parent's activity.
    pub fn create_child(
        &mut self,
        parent: Entity,
        id: impl Into<String>,
    ) -> Result<Entity, SceneError> {
        self.check(parent)?;
        let mut flags = ObjectFlags::SPAWN;
        flags.set(ObjectFlags::ACTIVE, self.is_active(parent));
        self.spawn_object(parent, Name::new(id), None, flags, Transform::default())
    }

    /// Create a child object with a specific key, used when restoring objects
    pub fn create_child_with_key(
        &mut self,
        parent: Entity,
        id: impl Into<String>,
        key: ObjectKey,
    ) -> Result<Entity, SceneError> {
        self.check(parent)?;
        let mut flags = ObjectFlags::SPAWN;
        flags.set(ObjectFlags::ACTIVE, self.is_active(parent));
        self.spawn_object(parent, Name::new(id), Some(key), flags, Transform::default())
    }

    /// Move `child` (with its subtree) under `new_parent`
    pub fn adopt_child(&mut self, new_parent: Entity, child: Entity) -> Result<Entity, SceneError> {
        self.check(new_parent)?;
        self.check(child)?;

        if child == self.root {
            return Err(SceneError::CannotReparentRoot);
        }
        let old_parent = self.parent(child);
        if old_parent == Some(new_parent) {
            return Ok(child);
        }
        if child == new_parent || self.is_ancestor_of(child, new_parent) {
            return Err(SceneError::CyclicHierarchy);
        }

        if let Some(old_parent) = old_parent
            && let Ok(mut children) = self.world.get_mut::<Children>(old_parent)
        {
            children.remove(child);
        }
        if let Ok(mut children) = self.world.get_mut::<Children>(new_parent) {
            children.add(child);
        }
        if let Ok(mut parent) = self.world.get_mut::<Parent>(child) {
            parent.0 = new_parent;
        }

        // A pending removal has to be swept by the new parent
        if self.flags(child).contains(ObjectFlags::REMOVED) {
            self.update_flags(new_parent, |f| f.insert(ObjectFlags::CHILDREN_REMOVED));
        }

        self.mark_transform_dirty(child);
        let active = self.is_active(new_parent);
        self.set_active(child, active);
        Ok(child)
    }

    /// Same as `adopt_child` with the arguments the other way around
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<Entity, SceneError> {
        self.adopt_child(parent, child)
    }

    /// Deep copy an object as the last child of its own parent
    pub fn clone_object(
        &mut self,
        entity: Entity,
        new_id: impl Into<String>,
    ) -> Result<Entity, SceneError> {
        self.check(entity)?;
        if entity == self.root {
            return Err(SceneError::CannotCloneRoot);
        }
        let parent = self.parent(entity).ok_or(SceneError::NoSuchObject)?;

        let copy = self.clone_subtree(entity, parent)?;
        self.set_object_id(copy, new_id);
        Ok(copy)
    }

    /// Clone the first direct child with exactly `id`
    pub fn clone_child(
        &mut self,
        parent: Entity,
        id: &str,
        new_id: impl Into<String>,
    ) -> Option<Entity> {
        let source = self.find_child(parent, id, false, true)?;
        match self.clone_object(source, new_id) {
            Ok(copy) => Some(copy),
            Err(e) => {
                log::warn!("Failed to clone \"{id}\": {e}");
                None
            }
        }
    }

    fn clone_subtree(&mut self, source: Entity, parent: Entity) -> Result<Entity, SceneError> {
        let name = self.world.get::<Name>(source).map_or_else(|_| Name::default(), |n| (*n).clone());
        let flags = self.flags(source);
        let transform = self.local_transform(source).unwrap_or_default();
        let tags = self.world.get::<Tags>(source).map_or_else(|_| Tags::new(), |t| (*t).clone());
        let components = self
            .world
            .get::<Components>(source)
            .map(|c| c.clone_all())
            .unwrap_or_default();

        let copy = self.spawn_object(parent, name, None, flags, transform)?;
        if let Ok(mut copy_tags) = self.world.get_mut::<Tags>(copy) {
            *copy_tags = tags;
        }
        for component in components {
            self.add_boxed_component(copy, component)?;
        }

        for child in self.children(source) {
            if !self.flags(child).contains(ObjectFlags::REMOVED) {
                self.clone_subtree(child, copy)?;
            }
        }
        Ok(copy)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Mark an object for removal. It is despawned when its parent next updates.
    pub fn remove_object(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.check(entity)?;
        if entity == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }

        self.update_flags(entity, |f| f.insert(ObjectFlags::REMOVED));
        if let Some(parent) = self.parent(entity) {
            self.update_flags(parent, |f| f.insert(ObjectFlags::CHILDREN_REMOVED));
        }
        Ok(())
    }

    /// Mark every direct child with exactly `id` for removal
    pub fn remove_children(&mut self, parent: Entity, id: &str) -> usize {
        let matching: Vec<Entity> = self
            .children(parent)
            .into_iter()
            .filter(|&child| self.id_matches(child, id, true))
            .collect();

        for &child in &matching {
            let _ = self.remove_object(child);
        }
        matching.len()
    }

    /// Mark children carrying `tag` for removal
    pub fn remove_children_with_tag(&mut self, parent: Entity, tag: &str, recursive: bool) -> usize {
        let mut removed = 0;
        for child in self.children(parent) {
            if self.has_tag(child, tag) {
                if self.remove_object(child).is_ok() {
                    removed += 1;
                }
            } else if recursive {
                removed += self.remove_children_with_tag(child, tag, true);
            }
        }
        removed
    }

    /// Immediately despawn every child of an object
    pub fn clear_children(&mut self, parent: Entity) {
        for child in self.children(parent) {
            self.despawn_recursive(child);
        }
        if let Ok(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.clear();
        }
        self.update_flags(parent, |f| f.remove(ObjectFlags::CHILDREN_REMOVED));
    }

    /// Immediately despawn an object and its subtree
    pub fn despawn_object(&mut self, entity: Entity) -> Result<(), SceneError> {
        self.check(entity)?;
        if entity == self.root {
            return Err(SceneError::CannotRemoveRoot);
        }

        if let Some(parent) = self.parent(entity)
            && let Ok(mut children) = self.world.get_mut::<Children>(parent)
        {
            children.remove(entity);
        }
        self.despawn_recursive(entity);
        Ok(())
    }

    fn despawn_recursive(&mut self, entity: Entity) {
        for child in self.children(entity) {
            self.despawn_recursive(child);
        }

        if let Some(body) = self.world.get_copied::<RigidBody>(entity) {
            self.physics.remove_body(body.body);
        }
        if let Some(key) = self.world.get_copied::<ObjectKey>(entity) {
            self.keys.remove(&key);
            self.events.push(EngineEvent::ObjectRemoved {
                scene: self.id.clone(),
                key,
            });
        }
        let _ = self.world.despawn(entity);
    }

    /// Despawn children that were marked for removal
    pub(super) fn sweep_removed(&mut self, entity: Entity) {
        if !self.flags(entity).contains(ObjectFlags::CHILDREN_REMOVED) {
            return;
        }
        self.update_flags(entity, |f| f.remove(ObjectFlags::CHILDREN_REMOVED));

        let removed: Vec<Entity> = self
            .children(entity)
            .into_iter()
            .filter(|&child| self.flags(child).contains(ObjectFlags::REMOVED))
            .collect();

        for child in removed {
            if let Ok(mut children) = self.world.get_mut::<Children>(entity) {
                children.remove(child);
            }
            self.despawn_recursive(child);
        }
    }

    // ========================================================================
    // Structure queries
    // ========================================================================

    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    #[must_use]
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get_copied::<Parent>(entity).map(|p| p.0)
    }

    /// Children in order
    #[must_use]
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<Children>(entity)
            .map(|c| c.as_slice().to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn child_count(&self, entity: Entity) -> usize {
        self.world.get::<Children>(entity).map_or(0, |c| c.len())
    }

    /// Number of descendants at any depth
    #[must_use]
    pub fn child_count_recursive(&self, entity: Entity) -> usize {
        self.children(entity)
            .into_iter()
            .map(|child| 1 + self.child_count_recursive(child))
            .sum()
    }

    /// True if `ancestor` is somewhere above `entity`
    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent(entity);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    #[must_use]
    pub fn entity_by_key(&self, key: ObjectKey) -> Option<Entity> {
        self.keys.get(&key).copied()
    }

    #[must_use]
    pub fn object_key(&self, entity: Entity) -> Option<ObjectKey> {
        self.world.get_copied::<ObjectKey>(entity)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    fn id_matches(&self, entity: Entity, id: &str, strict: bool) -> bool {
        self.world.get::<Name>(entity).is_ok_and(|name| {
            if strict {
                name.0 == id
            } else {
                name.0.contains(id)
            }
        })
    }

    /// First child whose ID equals (`strict`) or contains `id`.
    ///
    /// Depth-first in child order: each child is checked before its subtree.
    /// Objects pending removal are skipped.
    #[must_use]
    pub fn find_child(&self, parent: Entity, id: &str, recursive: bool, strict: bool) -> Option<Entity> {
        for child in self.children(parent) {
            if self.flags(child).contains(ObjectFlags::REMOVED) {
                continue;
            }
            if self.id_matches(child, id, strict) {
                return Some(child);
            }
            if recursive && let Some(found) = self.find_child(child, id, true, strict) {
                return Some(found);
            }
        }
        None
    }

    /// Every child matching `id`, in the same order as `find_child`
    #[must_use]
    pub fn find_children(&self, parent: Entity, id: &str, recursive: bool, strict: bool) -> Vec<Entity> {
        let mut found = Vec::new();
        self.collect_children(parent, recursive, &mut found, &|scene, child| {
            scene.id_matches(child, id, strict)
        });
        found
    }

    /// Every child carrying `tag`
    #[must_use]
    pub fn find_children_with_tag(&self, parent: Entity, tag: &str, recursive: bool) -> Vec<Entity> {
        let mut found = Vec::new();
        self.collect_children(parent, recursive, &mut found, &|scene, child| {
            scene.has_tag(child, tag)
        });
        found
    }

    fn collect_children(
        &self,
        parent: Entity,
        recursive: bool,
        found: &mut Vec<Entity>,
        predicate: &dyn Fn(&Scene, Entity) -> bool,
    ) {
        for child in self.children(parent) {
            if self.flags(child).contains(ObjectFlags::REMOVED) {
                continue;
            }
            if predicate(self, child) {
                found.push(child);
            }
            if recursive {
                self.collect_children(child, true, found, predicate);
            }
        }
    }

    /// Resolve a `>`-separated path of exact IDs, one level per segment
    #[must_use]
    pub fn find_child_with_path(&self, parent: Entity, path: &str) -> Option<Entity> {
        if path.is_empty() {
            return None;
        }
        if path.starts_with(Name::PATH_SEPARATOR) {
            log::error!("Invalid search path \"{path}\": must not start with '{}'", Name::PATH_SEPARATOR);
            return None;
        }

        path.split(Name::PATH_SEPARATOR)
            .try_fold(parent, |current, segment| self.find_child(current, segment, false, true))
    }

    /// Path from below the root down to `entity`, for `find_child_with_path`
    #[must_use]
    pub fn make_search_path(&self, entity: Entity) -> String {
        let mut segments = Vec::new();
        let mut current = Some(entity);
        while let Some(e) = current {
            if e == self.root {
                break;
            }
            segments.push(self.object_id(e).unwrap_or_default());
            current = self.parent(e);
        }
        segments.reverse();
        segments.join(&Name::PATH_SEPARATOR.to_string())
    }

    // ========================================================================
    // Identity, tags and activity
    // ========================================================================

    #[must_use]
    pub fn object_id(&self, entity: Entity) -> Option<String> {
        self.world.get::<Name>(entity).ok().map(|n| n.0.clone())
    }

    /// Rename an object. Path separators become `-`.
    pub fn set_object_id(&mut self, entity: Entity, id: impl Into<String>) -> &mut Self {
        let name = Name::new(id);
        if entity == self.root {
            self.id = name.0.clone();
        }
        if let Ok(mut current) = self.world.get_mut::<Name>(entity) {
            *current = name;
        }
        self
    }

    pub fn add_tag(&mut self, entity: Entity, tag: impl Into<String>) -> &mut Self {
        if let Ok(mut tags) = self.world.get_mut::<Tags>(entity) {
            tags.add(tag);
        }
        self
    }

    pub fn remove_tag(&mut self, entity: Entity, tag: &str) -> &mut Self {
        if let Ok(mut tags) = self.world.get_mut::<Tags>(entity) {
            tags.remove(tag);
        }
        self
    }

    pub fn clear_tags(&mut self, entity: Entity) -> &mut Self {
        if let Ok(mut tags) = self.world.get_mut::<Tags>(entity) {
            tags.clear();
        }
        self
    }

    #[must_use]
    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.world.get::<Tags>(entity).is_ok_and(|tags| tags.contains(tag))
    }

    /// Tags of an object, sorted
    #[must_use]
    pub fn tags(&self, entity: Entity) -> Vec<String> {
        self.world
            .get::<Tags>(entity)
            .map(|tags| tags.sorted())
            .unwrap_or_default()
    }

    /// Change activity of an object, its components and its whole subtree
    pub fn set_active(&mut self, entity: Entity, active: bool) -> &mut Self {
        if !self.contains(entity) || self.flags(entity).contains(ObjectFlags::ACTIVE) == active {
            return self;
        }

        self.update_flags(entity, |f| f.set(ObjectFlags::ACTIVE, active));
        if let Ok(mut components) = self.world.get_mut::<Components>(entity) {
            for component in components.iter_mut() {
                component.set_active(active);
            }
        }
        if let Some(detached) = self.detached.as_mut().filter(|d| d.entity == entity) {
            detached.deactivated = !active;
        }
        for child in self.children(entity) {
            self.set_active(child, active);
        }
        self
    }

    /// Active and not pending removal
    #[must_use]
    pub fn is_active(&self, entity: Entity) -> bool {
        let flags = self.flags(entity);
        flags.contains(ObjectFlags::ACTIVE) && !flags.contains(ObjectFlags::REMOVED)
    }

    #[must_use]
    pub fn is_removed(&self, entity: Entity) -> bool {
        self.flags(entity).contains(ObjectFlags::REMOVED)
    }

    // ========================================================================
    // Debug output
    // ========================================================================

    /// Render the object tree
    #[must_use]
    pub fn debug_tree(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({} objects)",
            self.display_name(self.root),
            self.child_count_recursive(self.root)
        );
        self.write_tree(self.root, "", &mut out);
        out
    }

    /// Log the object tree at info level
    pub fn print_debug_tree(&self) {
        log::info!("Scene tree:\n{}", self.debug_tree());
    }

    fn write_tree(&self, entity: Entity, prefix: &str, out: &mut String) {
        let children = self.children(entity);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            let last = i + 1 == count;
            let connector = if last { "└── " } else { "├── " };
            let mut line = format!("{prefix}{connector}{}", self.display_name(child));
            if !self.is_active(child) {
                line.push_str(" (inactive)");
            }
            let _ = writeln!(out, "{line}");

            let extension = if last { "    " } else { "│   " };
            self.write_tree(child, &format!("{prefix}{extension}"), out);
        }
    }

    fn display_name(&self, entity: Entity) -> String {
        match self.object_id(entity) {
            Some(id) if !id.is_empty() => id,
            _ => "<unnamed>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sample() -> (Scene, Entity, Entity, Entity) {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let a = scene.create_child(root, "a").unwrap();
        let b = scene.create_child(a, "b").unwrap();
        let c = scene.create_child(b, "c").unwrap();
        (scene, a, b, c)
    }

    #[test]
    fn test_create_child_inherits_activity() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let parent = scene.create_child(root, "parent").unwrap();
        scene.set_active(parent, false);

        let child = scene.create_child(parent, "child").unwrap();
        assert!(!scene.is_active(child));
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.child_count(parent), 1);
    }

    #[test]
    fn test_adopt_child_moves_subtree() {
        let (mut scene, a, b, c) = sample();
        let root = scene.root();
        let other = scene.create_child(root, "other").unwrap();

        scene.adopt_child(other, b).unwrap();
        assert_eq!(scene.parent(b), Some(other));
        assert_eq!(scene.child_count(a), 0);
        assert_eq!(scene.parent(c), Some(b));
        assert_eq!(scene.make_search_path(c), "other>b>c");

        // Adopting an existing child is a no-op
        scene.adopt_child(other, b).unwrap();
        assert_eq!(scene.child_count(other), 1);
    }

    #[test]
    fn test_adopt_child_rejects_root_and_cycles() {
        let (mut scene, a, _, c) = sample();
        let root = scene.root();

        assert_eq!(scene.adopt_child(a, root), Err(SceneError::CannotReparentRoot));
        assert_eq!(scene.adopt_child(c, a), Err(SceneError::CyclicHierarchy));
        assert_eq!(scene.adopt_child(a, a), Err(SceneError::CyclicHierarchy));
    }

    #[test]
    fn test_adopt_child_takes_new_parent_activity() {
        let (mut scene, a, b, c) = sample();
        let root = scene.root();
        let sleeping = scene.create_child(root, "sleeping").unwrap();
        scene.set_active(sleeping, false);

        scene.adopt_child(sleeping, b).unwrap();
        assert!(!scene.is_active(b));
        assert!(!scene.is_active(c));
        assert!(scene.is_active(a));
    }

    #[test]
    fn test_clone_object_deep_copies() {
        let (mut scene, a, b, _) = sample();
        scene.add_tag(b, "shiny");
        scene.set_position(b, Vec3::new(1.0, 2.0, 3.0));

        let copy = scene.clone_object(b, "b2").unwrap();
        assert_eq!(scene.parent(copy), Some(a));
        assert_eq!(scene.object_id(copy).as_deref(), Some("b2"));
        assert!(scene.has_tag(copy, "shiny"));
        assert_eq!(scene.position(copy), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(scene.child_count(copy), 1);
        assert_ne!(scene.object_key(copy), scene.object_key(b));

        let copied_c = scene.find_child(copy, "c", false, true).unwrap();
        assert_ne!(scene.object_key(copied_c), None);
        assert_eq!(scene.children(a), vec![b, copy]);
    }

    #[test]
    fn test_clone_child_and_root_rejected() {
        let (mut scene, a, _, _) = sample();
        let root = scene.root();

        assert!(scene.clone_child(a, "b", "twin").is_some());
        assert!(scene.clone_child(a, "missing", "twin").is_none());
        assert_eq!(scene.clone_object(root, "x"), Err(SceneError::CannotCloneRoot));
    }

    #[test]
    fn test_remove_children_is_deferred() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let x1 = scene.create_child(root, "x").unwrap();
        let x2 = scene.create_child(root, "x").unwrap();
        let y = scene.create_child(root, "xy").unwrap();

        assert_eq!(scene.remove_children(root, "x"), 2);
        assert!(scene.is_removed(x1) && scene.is_removed(x2));
        assert!(!scene.is_removed(y));
        assert_eq!(scene.child_count(root), 3);

        scene.update(0.0);
        assert_eq!(scene.children(root), vec![y]);
    }

    #[test]
    fn test_remove_children_with_tag_recursive() {
        let (mut scene, a, b, c) = sample();
        let root = scene.root();
        scene.add_tag(c, "temp");

        assert_eq!(scene.remove_children_with_tag(root, "temp", false), 0);
        assert_eq!(scene.remove_children_with_tag(root, "temp", true), 1);
        assert!(scene.is_removed(c));

        scene.update(0.0);
        assert!(!scene.contains(c));
        assert!(scene.contains(a) && scene.contains(b));
    }

    #[test]
    fn test_clear_children_is_immediate() {
        let (mut scene, a, b, c) = sample();
        scene.clear_children(a);
        assert!(!scene.contains(b));
        assert!(!scene.contains(c));
        assert_eq!(scene.child_count(a), 0);
        assert_eq!(scene.object_count(), 2);
    }

    #[test]
    fn test_remove_root_is_error() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        assert_eq!(scene.remove_object(root), Err(SceneError::CannotRemoveRoot));
        assert_eq!(scene.despawn_object(root), Err(SceneError::CannotRemoveRoot));
    }

    #[test]
    fn test_find_child_strict_and_loose() {
        let (scene, a, b, c) = sample();
        let root = scene.root();

        assert_eq!(scene.find_child(root, "a", false, true), Some(a));
        assert_eq!(scene.find_child(root, "c", false, true), None);
        assert_eq!(scene.find_child(root, "c", true, true), Some(c));
        assert_eq!(scene.find_child(a, "", false, false), Some(b));
    }

    #[test]
    fn test_find_children_order() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let enemy1 = scene.create_child(root, "enemy1").unwrap();
        let nested = scene.create_child(enemy1, "enemy1-gun").unwrap();
        let enemy2 = scene.create_child(root, "enemy2").unwrap();
        scene.add_tag(nested, "weapon");

        assert_eq!(scene.find_children(root, "enemy", true, false), vec![enemy1, nested, enemy2]);
        assert_eq!(scene.find_children(root, "enemy", false, false), vec![enemy1, enemy2]);
        assert_eq!(scene.find_children_with_tag(root, "weapon", true), vec![nested]);
        assert!(scene.find_children_with_tag(root, "weapon", false).is_empty());
    }

    #[test]
    fn test_search_path_round_trip() {
        let (scene, a, _, c) = sample();
        let root = scene.root();

        let path = scene.make_search_path(c);
        assert_eq!(path, "a>b>c");
        assert_eq!(scene.find_child_with_path(root, &path), Some(c));
        assert_eq!(scene.find_child_with_path(a, "b>c"), Some(c));
        assert_eq!(scene.make_search_path(root), "");
    }

    #[test]
    fn test_search_path_invalid() {
        let (scene, _, _, _) = sample();
        let root = scene.root();
        assert_eq!(scene.find_child_with_path(root, ">a"), None);
        assert_eq!(scene.find_child_with_path(root, ""), None);
        assert_eq!(scene.find_child_with_path(root, "a>missing"), None);
    }

    #[test]
    fn test_set_object_id_sanitizes() {
        let (mut scene, a, _, _) = sample();
        scene.set_object_id(a, "x>y");
        assert_eq!(scene.object_id(a).as_deref(), Some("x-y"));
    }

    #[test]
    fn test_tags() {
        let (mut scene, a, _, _) = sample();
        scene.add_tag(a, "one").add_tag(a, "two");
        assert!(scene.has_tag(a, "one"));
        assert_eq!(scene.tags(a), vec!["one".to_string(), "two".to_string()]);

        scene.remove_tag(a, "one");
        assert!(!scene.has_tag(a, "one"));

        scene.clear_tags(a);
        assert!(scene.tags(a).is_empty());
    }

    #[test]
    fn test_set_active_propagates() {
        let (mut scene, a, b, c) = sample();
        scene.set_active(a, false);
        assert!(!scene.is_active(b) && !scene.is_active(c));

        scene.set_active(a, true);
        assert!(scene.is_active(b) && scene.is_active(c));
    }

    #[test]
    fn test_child_counts() {
        let (scene, a, _, _) = sample();
        let root = scene.root();
        assert_eq!(scene.child_count(root), 1);
        assert_eq!(scene.child_count_recursive(root), 3);
        assert_eq!(scene.child_count_recursive(a), 2);
    }

    #[test]
    fn test_keys_resolve_entities() {
        let (mut scene, a, b, _) = sample();
        let key = scene.object_key(b).unwrap();
        assert_eq!(scene.entity_by_key(key), Some(b));

        scene.despawn_object(b).unwrap();
        assert_eq!(scene.entity_by_key(key), None);
        assert_eq!(scene.child_count(a), 0);
    }

    #[test]
    fn test_debug_tree() {
        let (mut scene, a, _, _) = sample();
        let root = scene.root();
        let unnamed = scene.create_child(root, "").unwrap();
        scene.set_active(a, false);

        let tree = scene.debug_tree();
        let lines: Vec<&str> = tree.lines().collect();
        assert_eq!(lines[0], "scene (4 objects)");
        assert_eq!(lines[1], "├── a (inactive)");
        assert_eq!(lines[2], "│   └── b (inactive)");
        assert_eq!(lines[3], "│       └── c (inactive)");
        assert_eq!(lines[4], "└── <unnamed>");
        assert!(scene.contains(unnamed));
    }
}
