//! Key bindings for logical actions
//!
//! Physical keys map to `InputAction`s so the camera controls and editor
//! shortcuts can be rebound at runtime. One key triggers at most one action;
//! an action may have several keys.
//!
//! # Example
//!
//! ```ignore
//! let mut mapper = InputMapper::with_defaults();
//! mapper.bind(KeyCode::ArrowUp, InputAction::MoveForward);
//!
//! if mapper.action_just_pressed(&ctx.input, InputAction::Undo) {
//!     sender.undo(1);
//! }
//! ```

use rustc_hash::FxHashMap;
use winit::keyboard::KeyCode;

use super::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InputAction {
    // -------------------------------------------------------------------------
    // Camera movement
    // -------------------------------------------------------------------------
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Hold to move faster
    Sprint,

    // -------------------------------------------------------------------------
    // Camera look
    // -------------------------------------------------------------------------
    LookUp,
    LookDown,
    LookLeft,
    LookRight,

    // -------------------------------------------------------------------------
    // Editor
    // -------------------------------------------------------------------------
    Undo,
    Redo,
    /// Remove the selected object
    DeleteObject,
    /// Create a new object under the selected one
    DuplicateObject,
    ToggleActive,
    /// Log the scene tree
    PrintTree,

    // -------------------------------------------------------------------------
    // Engine
    // -------------------------------------------------------------------------
    /// Switch between running and zero-delta
    Pause,
    /// Advance one frame while paused
    StepFrame,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    key_bindings: FxHashMap<KeyCode, InputAction>,
    /// Reverse lookup, in binding order
    action_keys: FxHashMap<InputAction, Vec<KeyCode>>,
}

impl InputMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// WASD/QE movement, arrow look and the editor function keys
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut mapper = Self::new();

        mapper.bind(KeyCode::KeyW, InputAction::MoveForward);
        mapper.bind(KeyCode::KeyS, InputAction::MoveBackward);
        mapper.bind(KeyCode::KeyA, InputAction::MoveLeft);
        mapper.bind(KeyCode::KeyD, InputAction::MoveRight);
        mapper.bind(KeyCode::KeyE, InputAction::MoveUp);
        mapper.bind(KeyCode::KeyQ, InputAction::MoveDown);
        mapper.bind(KeyCode::ShiftLeft, InputAction::Sprint);

        mapper.bind(KeyCode::ArrowUp, InputAction::LookUp);
        mapper.bind(KeyCode::ArrowDown, InputAction::LookDown);
        mapper.bind(KeyCode::ArrowLeft, InputAction::LookLeft);
        mapper.bind(KeyCode::ArrowRight, InputAction::LookRight);

        mapper.bind(KeyCode::KeyZ, InputAction::Undo);
        mapper.bind(KeyCode::KeyY, InputAction::Redo);
        mapper.bind(KeyCode::Delete, InputAction::DeleteObject);
        mapper.bind(KeyCode::KeyN, InputAction::DuplicateObject);
        mapper.bind(KeyCode::KeyT, InputAction::ToggleActive);
        mapper.bind(KeyCode::F1, InputAction::PrintTree);

        mapper.bind(KeyCode::KeyP, InputAction::Pause);
        mapper.bind(KeyCode::Period, InputAction::StepFrame);
        mapper.bind(KeyCode::Escape, InputAction::Quit);

        mapper
    }

    /// Bind a key, replacing its previous action
    pub fn bind(&mut self, key: KeyCode, action: InputAction) {
        if let Some(old_action) = self.key_bindings.insert(key, action)
            && let Some(keys) = self.action_keys.get_mut(&old_action)
        {
            keys.retain(|k| *k != key);
        }
        self.action_keys.entry(action).or_default().push(key);
    }

    pub fn unbind(&mut self, key: KeyCode) {
        if let Some(action) = self.key_bindings.remove(&key)
            && let Some(keys) = self.action_keys.get_mut(&action)
        {
            keys.retain(|k| *k != key);
        }
    }

    /// Remove every key bound to `action`
    pub fn unbind_action(&mut self, action: InputAction) {
        for key in self.action_keys.remove(&action).unwrap_or_default() {
            self.key_bindings.remove(&key);
        }
    }

    #[must_use]
    pub fn get_action(&self, key: KeyCode) -> Option<InputAction> {
        self.key_bindings.get(&key).copied()
    }

    #[must_use]
    pub fn get_keys(&self, action: InputAction) -> &[KeyCode] {
        self.action_keys
            .get(&action)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn is_bound(&self, key: KeyCode) -> bool {
        self.key_bindings.contains_key(&key)
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.key_bindings.len()
    }

    /// Any key of `action` is held
    #[must_use]
    pub fn action_pressed(&self, input: &Input, action: InputAction) -> bool {
        self.get_keys(action).iter().any(|&key| input.is_key_pressed(key))
    }

    /// Any key of `action` went down this frame
    #[must_use]
    pub fn action_just_pressed(&self, input: &Input, action: InputAction) -> bool {
        self.get_keys(action)
            .iter()
            .any(|&key| input.is_key_just_pressed(key))
    }

    /// -1, 0 or 1 from a pair of opposing actions
    #[must_use]
    pub fn axis(&self, input: &Input, negative: InputAction, positive: InputAction) -> f32 {
        let value = |action| if self.action_pressed(input, action) { 1.0 } else { 0.0 };
        value(positive) - value(negative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    #[test]
    fn test_rebind_moves_key() {
        let mut mapper = InputMapper::with_defaults();
        assert_eq!(mapper.get_action(KeyCode::KeyZ), Some(InputAction::Undo));

        mapper.bind(KeyCode::KeyZ, InputAction::Redo);
        assert_eq!(mapper.get_action(KeyCode::KeyZ), Some(InputAction::Redo));
        assert!(mapper.get_keys(InputAction::Undo).is_empty());
        assert_eq!(mapper.get_keys(InputAction::Redo), &[KeyCode::KeyY, KeyCode::KeyZ]);
    }

    #[test]
    fn test_unbind() {
        let mut mapper = InputMapper::with_defaults();
        let count = mapper.binding_count();

        mapper.unbind(KeyCode::KeyW);
        assert!(!mapper.is_bound(KeyCode::KeyW));
        assert_eq!(mapper.binding_count(), count - 1);

        mapper.bind(KeyCode::KeyI, InputAction::LookUp);
        mapper.unbind_action(InputAction::LookUp);
        assert!(!mapper.is_bound(KeyCode::KeyI));
        assert!(!mapper.is_bound(KeyCode::ArrowUp));
        assert!(mapper.get_keys(InputAction::LookUp).is_empty());
    }

    #[test]
    fn test_action_state_from_input() {
        let mapper = InputMapper::with_defaults();
        let mut input = Input::new();
        input.process_keyboard(KeyCode::KeyD, ElementState::Pressed);

        assert!(mapper.action_pressed(&input, InputAction::MoveRight));
        assert!(mapper.action_just_pressed(&input, InputAction::MoveRight));
        assert!(!mapper.action_pressed(&input, InputAction::MoveLeft));
        assert_eq!(
            mapper.axis(&input, InputAction::MoveLeft, InputAction::MoveRight),
            1.0
        );

        input.update();
        assert!(mapper.action_pressed(&input, InputAction::MoveRight));
        assert!(!mapper.action_just_pressed(&input, InputAction::MoveRight));
    }
}
