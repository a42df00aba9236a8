//! Input handling
//!
//! Raw keyboard and mouse state, and key bindings for logical actions.

mod mapper;
mod state;

pub use mapper::{InputAction, InputMapper};
pub use state::Input;
