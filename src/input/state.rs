//! Per-frame keyboard and mouse state
//!
//! The window loop feeds raw events in; game code and the editor read
//! held, just-pressed and just-released state out. `update` runs once at the
//! end of every frame and clears the per-frame parts.

use std::hash::Hash;

use glam::Vec2;
use rustc_hash::FxHashSet;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

/// Held and edge state for one kind of button
#[derive(Debug, Clone)]
struct Buttons<T> {
    held: FxHashSet<T>,
    pressed: FxHashSet<T>,
    released: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> Buttons<T> {
    fn process(&mut self, button: T, state: ElementState) {
        match state {
            ElementState::Pressed => {
                // Key repeat arrives as more presses
                if self.held.insert(button) {
                    self.pressed.insert(button);
                }
            }
            ElementState::Released => {
                if self.held.remove(&button) {
                    self.released.insert(button);
                }
            }
        }
    }

    fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    fn release_all(&mut self) {
        self.released.extend(self.held.drain());
    }
}

impl<T> Default for Buttons<T> {
    fn default() -> Self {
        Self {
            held: FxHashSet::default(),
            pressed: FxHashSet::default(),
            released: FxHashSet::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Input {
    keys: Buttons<KeyCode>,
    mouse_buttons: Buttons<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
    scroll_delta: Vec2,
}

impl Input {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call after the frame has read it.
    pub fn update(&mut self) {
        self.keys.end_frame();
        self.mouse_buttons.end_frame();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = Vec2::ZERO;
    }

    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        self.keys.process(key, state);
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        self.mouse_buttons.process(button, state);
    }

    /// Cursor moved to `position` in window coordinates
    pub fn process_mouse_motion(&mut self, position: Vec2) {
        self.mouse_delta += position - self.mouse_position;
        self.mouse_position = position;
    }

    pub fn process_scroll(&mut self, delta: Vec2) {
        self.scroll_delta += delta;
    }

    /// Release everything held, as when the window loses focus
    pub fn release_all(&mut self) {
        self.keys.release_all();
        self.mouse_buttons.release_all();
    }

    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.held.contains(&key)
    }

    #[must_use]
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys.pressed.contains(&key)
    }

    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keys.released.contains(&key)
    }

    #[must_use]
    pub fn any_key_pressed(&self) -> bool {
        !self.keys.held.is_empty()
    }

    #[must_use]
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.held.contains(&button)
    }

    #[must_use]
    pub fn is_mouse_button_just_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.pressed.contains(&button)
    }

    #[must_use]
    pub fn is_mouse_button_just_released(&self, button: MouseButton) -> bool {
        self.mouse_buttons.released.contains(&button)
    }

    #[must_use]
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Cursor movement since the last `update`
    #[must_use]
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    #[must_use]
    pub fn scroll_delta(&self) -> Vec2 {
        self.scroll_delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_edges() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_pressed(KeyCode::KeyW));

        input.update();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        assert!(!input.is_key_just_pressed(KeyCode::KeyW));

        input.process_keyboard(KeyCode::KeyW, ElementState::Released);
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert!(input.is_key_just_released(KeyCode::KeyW));

        input.update();
        assert!(!input.is_key_just_released(KeyCode::KeyW));
        assert!(!input.any_key_pressed());
    }

    #[test]
    fn test_mouse_motion_and_scroll_reset() {
        let mut input = Input::new();
        input.process_mouse_motion(Vec2::new(10.0, 5.0));
        input.process_mouse_motion(Vec2::new(12.0, 4.0));
        input.process_scroll(Vec2::new(0.0, 1.0));

        assert_eq!(input.mouse_position(), Vec2::new(12.0, 4.0));
        assert_eq!(input.mouse_delta(), Vec2::new(12.0, 4.0));
        assert_eq!(input.scroll_delta(), Vec2::Y);

        input.update();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert_eq!(input.scroll_delta(), Vec2::ZERO);
        assert_eq!(input.mouse_position(), Vec2::new(12.0, 4.0));
    }

    #[test]
    fn test_release_all() {
        let mut input = Input::new();
        input.process_keyboard(KeyCode::ShiftLeft, ElementState::Pressed);
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);

        input.release_all();
        assert!(!input.any_key_pressed());
        assert!(input.is_key_just_released(KeyCode::ShiftLeft));
        assert!(input.is_mouse_button_just_released(MouseButton::Left));
        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
    }
}
