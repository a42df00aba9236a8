//! Resource handles
//!
//! A handle pairs a shared resource with the name it was stored under and a
//! process-wide unique ID. Handles compare and hash by that ID.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A strong handle to a resource of type `T`.
///
/// The resource stays alive while any handle exists, even after the manager
/// unloaded it.
pub struct ResourceHandle<T> {
    id: u64,
    name: Arc<str>,
    inner: Arc<T>,
}

impl<T> ResourceHandle<T> {
    #[must_use]
    pub fn new(name: &str, value: T) -> Self {
        Self {
            id: next_id(),
            name: Arc::from(name),
            inner: Arc::new(value),
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Name the resource was stored under
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Same resource under a new name and ID
    pub(crate) fn renamed(&self, name: &str) -> Self
    where
        T: Clone,
    {
        Self::new(name, T::clone(&self.inner))
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakResourceHandle<T> {
        WeakResourceHandle {
            id: self.id,
            name: Arc::clone(&self.name),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of strong handles, the manager's own included
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ResourceHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ResourceHandle<T> {}

impl<T> Hash for ResourceHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> std::ops::Deref for ResourceHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// A handle that does not keep the resource alive
pub struct WeakResourceHandle<T> {
    id: u64,
    name: Arc<str>,
    inner: Weak<T>,
}

impl<T> WeakResourceHandle<T> {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` once every strong handle is gone
    #[must_use]
    pub fn upgrade(&self) -> Option<ResourceHandle<T>> {
        self.inner.upgrade().map(|inner| ResourceHandle {
            id: self.id,
            name: Arc::clone(&self.name),
            inner,
        })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> Clone for WeakResourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for WeakResourceHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for WeakResourceHandle<T> {}

impl<T> fmt::Debug for WeakResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakResourceHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_identity() {
        let a = ResourceHandle::new("a", 1_i32);
        let b = ResourceHandle::new("a", 1_i32);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.name(), "a");
        assert_eq!(*a, 1);
    }

    #[test]
    fn test_renamed_is_a_new_resource() {
        let a = ResourceHandle::new("a", String::from("text"));
        let b = a.renamed("b");
        assert_ne!(a.id(), b.id());
        assert_eq!(b.name(), "b");
        assert_eq!(b.get(), "text");
        assert_eq!(a.strong_count(), 1);
    }

    #[test]
    fn test_weak_upgrade() {
        let strong = ResourceHandle::new("n", 100_u32);
        let weak = strong.downgrade();

        let upgraded = weak.upgrade();
        assert_eq!(upgraded.as_ref().map(ResourceHandle::name), Some("n"));

        drop(strong);
        drop(upgraded);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }
}
