//! Event Queue System for Decoupled Communication
//!
//! Scenes, subsystems and the editor report what happened through a
//! double-buffered queue. Events written during frame N are readable during
//! frame N+1.
//!
//! # Design Principles
//!
//! - **Type Safety**: All events are strongly typed via the `EngineEvent` enum
//! - **Double Buffering**: Events are frame-consistent (no mid-frame mutations)
//! - **Stable identities**: Objects are named by `ObjectKey`, which survives
//!   undo/redo, rather than by entity handle
//!
//! # Example
//!
//! ```ignore
//! for event in ctx.events.iter() {
//!     if let EngineEvent::Collision { a, b, .. } = event {
//!         log::info!("{a} hit {b}");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use crate::core::EngineState;
use crate::ecs::ObjectKey;

// ============================================================================
// Event Types
// ============================================================================

/// Engine events for inter-system communication.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineEvent {
    // -------------------------------------------------------------------------
    // Scene Graph Events
    // -------------------------------------------------------------------------
    /// An object was added to a scene.
    ObjectCreated {
        /// Scene ID
        scene: String,
        /// Key of the new object
        key: ObjectKey,
    },

    /// An object was despawned from a scene.
    ObjectRemoved {
        /// Scene ID
        scene: String,
        /// Key of the removed object
        key: ObjectKey,
    },

    // -------------------------------------------------------------------------
    // Physics Events
    // -------------------------------------------------------------------------
    /// Two objects started touching during a physics step.
    Collision {
        /// Scene ID
        scene: String,
        /// First object
        a: ObjectKey,
        /// Second object
        b: ObjectKey,
    },

    // -------------------------------------------------------------------------
    // Engine Events
    // -------------------------------------------------------------------------
    /// The engine state changed.
    StateChanged {
        /// New state
        state: EngineState,
    },

    /// A new current scene was set.
    SceneChanged {
        /// ID of the new scene
        scene: String,
    },

    /// A subsystem was removed.
    SubsystemRemoved {
        /// Subsystem ID
        id: String,
    },

    // -------------------------------------------------------------------------
    // Editor Events
    // -------------------------------------------------------------------------
    /// An editor command was executed or redone.
    CommandApplied {
        /// Command name
        name: &'static str,
    },

    /// An editor command was undone.
    CommandUndone {
        /// Command name
        name: &'static str,
    },
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for frame-consistent event processing.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this frame
    pending: VecDeque<EngineEvent>,
    /// Events from previous frame, ready for processing
    processing: VecDeque<EngineEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be processed next frame.
    #[inline]
    pub fn push(&mut self, event: EngineEvent) {
        self.pending.push_back(event);
    }

    /// Push every event from an iterator.
    pub fn extend(&mut self, events: impl IntoIterator<Item = EngineEvent>) {
        self.pending.extend(events);
    }

    /// Swap the pending and processing queues.
    ///
    /// Called once per frame by the engine, before subsystems run.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the previous frame.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &EngineEvent> {
        self.processing.iter()
    }

    /// Drain all events from the previous frame.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
