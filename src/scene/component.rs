//! Behaviour components attached to scene objects

use std::any::Any;
use std::fmt;

use hecs::Entity;
use serde::{Deserialize, Serialize};

use super::{Scene, SceneError};
use crate::core::{Arguments, CommandError, CommandHandler, Filter, Message, MessageResult};

/// State every component carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Numeric identifier, used by `removeComponents` and message filters
    pub id: u32,
}

impl ComponentInfo {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self { id }
    }
}

/// Access to the scene from inside `Component::update`
pub struct ComponentContext<'a> {
    /// The scene being updated
    pub scene: &'a mut Scene,
    /// The object that owns the component
    pub object: Entity,
}

/// The component whose update is running
///
/// It is out of its object's list meanwhile, so edits to that list are
/// recorded here and settled when it is put back.
#[derive(Debug)]
pub(crate) struct Detached {
    pub entity: Entity,
    /// Where it goes back
    pub index: usize,
    pub id: u32,
    pub removed: bool,
    pub deactivated: bool,
}

/// Behaviour attached to a scene object
///
/// Implementors provide `info`/`info_mut` and the two `as_any` accessors;
/// everything else has a default.
pub trait Component: Any + Send + Sync {
    fn info(&self) -> &ComponentInfo;

    fn info_mut(&mut self) -> &mut ComponentInfo;

    fn id(&self) -> u32 {
        self.info().id
    }

    fn set_id(&mut self, id: u32) {
        self.info_mut().id = id;
    }

    /// Called once per frame while the owning object is active
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) {}

    /// Called when the owning object changes activity
    fn set_active(&mut self, _active: bool) {}

    /// Custom message handling, after bound commands
    fn receive_message(&mut self, _message: &Message) -> MessageResult {
        MessageResult::Continue
    }

    /// Deep copy used when objects are cloned. `None` means not copyable.
    fn clone_component(&self) -> Option<Box<dyn Component>> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.type_name())
            .field("id", &self.id())
            .finish()
    }
}

fn set_id(
    component: &mut (dyn Component + 'static),
    _: (),
    args: &mut Arguments<'_>,
) -> Result<MessageResult, CommandError> {
    component.set_id(args.next_u32()?);
    Ok(MessageResult::Continue)
}

fn base_commands() -> &'static CommandHandler<dyn Component> {
    static COMMANDS: std::sync::OnceLock<CommandHandler<dyn Component>> =
        std::sync::OnceLock::new();
    COMMANDS.get_or_init(|| {
        let mut handler = CommandHandler::new();
        handler.bind("setID", set_id);
        handler
    })
}

/// Deliver a message to one component: base commands, then custom handling
pub(crate) fn deliver(component: &mut (dyn Component + 'static), message: &Message) -> MessageResult {
    if !message.pass_id(&component.id().to_string()) {
        return MessageResult::Continue;
    }

    if message.pass_filter(Filter::COMMAND)
        && base_commands().dispatch(component, (), message).is_escape()
    {
        return MessageResult::Escape;
    }

    if message.pass_filter(Filter::CUSTOM) {
        return component.receive_message(message);
    }
    MessageResult::Continue
}

/// Ordered list of components on one object
#[derive(Debug, Default)]
pub struct Components(Vec<Box<dyn Component>>);

impl Components {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, component: Box<dyn Component>) {
        self.0.push(component);
    }

    /// Take the component at `index` out of the list
    pub(crate) fn take(&mut self, index: usize) -> Option<Box<dyn Component>> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Put a component back at `index`, clamped to the list length
    pub(crate) fn insert(&mut self, index: usize, component: Box<dyn Component>) {
        let index = index.min(self.0.len());
        self.0.insert(index, component);
    }

    /// Remove every component with the given ID, returns how many went
    pub fn remove_by_id(&mut self, id: u32) -> usize {
        let before = self.0.len();
        self.0.retain(|c| c.id() != id);
        before - self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Box<dyn Component>> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Component>> {
        self.0.iter_mut()
    }

    /// First component of type `T`
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.0.iter().find_map(|c| c.as_any().downcast_ref::<T>())
    }

    /// First component of type `T`, mutably
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.0
            .iter_mut()
            .find_map(|c| c.as_any_mut().downcast_mut::<T>())
    }

    /// Copies of every cloneable component
    #[must_use]
    pub fn clone_all(&self) -> Vec<Box<dyn Component>> {
        self.0
            .iter()
            .filter_map(|c| {
                let copy = c.clone_component();
                if copy.is_none() {
                    log::debug!("Component {} is not cloneable, skipped", c.type_name());
                }
                copy
            })
            .collect()
    }
}

// ============================================================================
// Scene operations
// ============================================================================

impl Scene {
    /// Attach a component to an object
    pub fn add_component<C: Component>(
        &mut self,
        entity: Entity,
        component: C,
    ) -> Result<(), SceneError> {
        self.add_boxed_component(entity, Box::new(component))
    }

    pub fn add_boxed_component(
        &mut self,
        entity: Entity,
        component: Box<dyn Component>,
    ) -> Result<(), SceneError> {
        let mut components = self
            .world
            .get_mut::<Components>(entity)
            .map_err(|_| SceneError::NoSuchObject)?;
        components.push(component);
        Ok(())
    }

    /// Run `f` on the first component of type `T`
    pub fn with_component<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let components = self.world.get::<Components>(entity).ok()?;
        components.get::<T>().map(f)
    }

    /// Run `f` on the first component of type `T`, mutably
    pub fn with_component_mut<T: Component, R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut components = self.world.get_mut::<Components>(entity).ok()?;
        components.get_mut::<T>().map(f)
    }

    /// Remove every component with `id` from an object
    /// Remove every component with `id`, returns how many went
    pub fn remove_components(&mut self, entity: Entity, id: u32) -> usize {
        let Ok(mut components) = self.world.get_mut::<Components>(entity) else {
            return 0;
        };

        let mut removed = 0;
        if let Some(detached) = self.detached.as_mut().filter(|d| d.entity == entity) {
            let before = components
                .iter()
                .take(detached.index)
                .filter(|c| c.id() == id)
                .count();
            detached.index -= before;
            if detached.id == id && !detached.removed {
                detached.removed = true;
                removed += 1;
            }
        }
        removed + components.remove_by_id(id)
    }

    pub fn clear_components(&mut self, entity: Entity) {
        if let Ok(mut components) = self.world.get_mut::<Components>(entity) {
            components.clear();
        }
        if let Some(detached) = self.detached.as_mut().filter(|d| d.entity == entity) {
            detached.index = 0;
            detached.removed = true;
        }
    }

    #[must_use]
    pub fn component_count(&self, entity: Entity) -> usize {
        self.world
            .get::<Components>(entity)
            .map_or(0, |components| components.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Health {
        info: ComponentInfo,
        value: i32,
        active: bool,
    }

    impl Component for Health {
        fn info(&self) -> &ComponentInfo {
            &self.info
        }

        fn info_mut(&mut self) -> &mut ComponentInfo {
            &mut self.info
        }

        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn receive_message(&mut self, message: &Message) -> MessageResult {
            if message.command() == "damage" {
                self.value -= message.arguments().next_f32().unwrap_or(0.0) as i32;
                return MessageResult::Escape;
            }
            MessageResult::Continue
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

    #[derive(Debug, Default)]
    struct Marker {
        info: ComponentInfo,
    }

    impl Component for Marker {
        fn info(&self) -> &ComponentInfo {
            &self.info
        }

        fn info_mut(&mut self) -> &mut ComponentInfo {
            &mut self.info
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_remove_components_by_id() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let object = scene.create_child(root, "object").unwrap();

        scene
            .add_component(object, Health { info: ComponentInfo::new(1), ..Default::default() })
            .unwrap();
        scene
            .add_component(object, Marker { info: ComponentInfo::new(1) })
            .unwrap();
        scene
            .add_component(object, Marker { info: ComponentInfo::new(2) })
            .unwrap();
        assert_eq!(scene.component_count(object), 3);

        assert_eq!(scene.remove_components(object, 1), 2);
        assert_eq!(scene.component_count(object), 1);

        scene.clear_components(object);
        assert_eq!(scene.component_count(object), 0);
    }

    #[test]
    fn test_component_messages() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let object = scene.create_child(root, "object").unwrap();
        scene
            .add_component(object, Health { info: ComponentInfo::new(7), value: 10, active: true })
            .unwrap();

        let result = scene.send_message_str("[Co=7] damage 3");
        assert_eq!(result, MessageResult::Escape);
        assert_eq!(scene.with_component(object, |h: &Health| h.value), Some(7));

        // Components with other IDs are skipped
        scene.send_message_str("[Co=8] damage 3");
        assert_eq!(scene.with_component(object, |h: &Health| h.value), Some(7));

        scene.send_message_str("[Co=7] setID 9");
        assert_eq!(scene.with_component(object, |h: &Health| h.id()), Some(9));
    }

    #[test]
    fn test_set_active_notifies_components() {
        let mut scene = Scene::new("scene");
        let root = scene.root();
        let object = scene.create_child(root, "object").unwrap();
        scene
            .add_component(object, Health { active: true, ..Default::default() })
            .unwrap();

        scene.set_active(object, false);
        assert_eq!(scene.with_component(object, |h: &Health| h.active), Some(false));
    }

    #[test]
    fn test_clone_all_skips_uncloneable() {
        let mut components = Components::new();
        components.push(Box::new(Health::default()));
        components.push(Box::new(Marker::default()));

        let copies = components.clone_all();
        assert_eq!(copies.len(), 1);
        assert!(copies[0].as_any().is::<Health>());
    }
}
