//! Resource management
//!
//! Resources are shared, immutable data loaded through the `FileLoader` and
//! kept by the `ResourceManager` under a (name, type) key:
//!
//! - `ResourceHandle` keeps a resource alive, `WeakResourceHandle` does not
//! - persistence levels decide what `unload_resources` may drop
//! - a failed load falls back to the type's fallback resource, if it has one

mod handle;
mod manager;
mod types;

pub use handle::{ResourceHandle, WeakResourceHandle};
pub use manager::{DEFAULT_PERSISTENCE, ResourceManager};
pub use types::{JsonResource, Resource, ResourceError, TextResource};
