//! Per-object components stored in the scene world

use glam::{EulerRot, Mat4, Quat, Vec3};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Local transform of a scene object, relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,
    /// Rotation relative to the parent
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Local front direction
    pub const FRONT: Vec3 = Vec3::NEG_Z;
    /// Local right direction
    pub const RIGHT: Vec3 = Vec3::X;
    /// Local up direction
    pub const UP: Vec3 = Vec3::Y;

    /// Create a new identity transform
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    #[must_use]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Get the transformation matrix (translation * rotation * scale)
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Front direction in parent space
    #[must_use]
    pub fn front(&self) -> Vec3 {
        self.rotation * Self::FRONT
    }

    /// Right direction in parent space
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Self::RIGHT
    }

    /// Up direction in parent space
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * Self::UP
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Rotate by a delta applied in local space
    pub fn rotate(&mut self, delta: Quat) {
        self.rotation = (self.rotation * delta).normalize();
    }

    /// Euler angles (XYZ, radians) to quaternion
    #[must_use]
    pub fn euler_to_quat(euler: Vec3) -> Quat {
        Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Object identifier, unique only by convention
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    /// Separator used in search paths, never part of an ID
    pub const PATH_SEPARATOR: char = '>';

    /// Create a name, replacing path separators with `-`
    pub fn new(name: impl Into<String>) -> Self {
        Self(Self::sanitize(name.into()))
    }

    /// Replace every path separator with `-`
    #[must_use]
    pub fn sanitize(name: String) -> String {
        if name.contains(Self::PATH_SEPARATOR) {
            name.replace(Self::PATH_SEPARATOR, "-")
        } else {
            name
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Stable identity of an object within its scene
///
/// Entity handles change when an object is despawned and restored. Keys do not,
/// which is what undoable editor commands hold on to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey(pub u64);

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Set of string tags attached to an object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(pub FxHashSet<String>);

impl Tags {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag, returns false if it was already present
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags in sorted order, for stable output
    #[must_use]
    pub fn sorted(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.0.iter().cloned().collect();
        tags.sort();
        tags
    }
}

/// Object state and transform inheritance flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectFlags(pub u16);

impl ObjectFlags {
    pub const NONE: Self = Self(0);
    pub const ACTIVE: Self = Self(1 << 0);
    /// Marked for removal at the parent's next update
    pub const REMOVED: Self = Self(1 << 1);
    /// At least one child is marked for removal
    pub const CHILDREN_REMOVED: Self = Self(1 << 2);
    /// Cached global transform is stale
    pub const TRANSFORM_DIRTY: Self = Self(1 << 3);
    pub const IGNORE_PARENT: Self = Self(1 << 4);
    pub const IGNORE_TRANSLATION_X: Self = Self(1 << 5);
    pub const IGNORE_TRANSLATION_Y: Self = Self(1 << 6);
    pub const IGNORE_TRANSLATION_Z: Self = Self(1 << 7);
    pub const IGNORE_ROTATION: Self = Self(1 << 8);
    pub const IGNORE_SCALE_X: Self = Self(1 << 9);
    pub const IGNORE_SCALE_Y: Self = Self(1 << 10);
    pub const IGNORE_SCALE_Z: Self = Self(1 << 11);

    pub const IGNORE_TRANSLATION: Self = Self(
        Self::IGNORE_TRANSLATION_X.0 | Self::IGNORE_TRANSLATION_Y.0 | Self::IGNORE_TRANSLATION_Z.0,
    );
    pub const IGNORE_SCALE: Self =
        Self(Self::IGNORE_SCALE_X.0 | Self::IGNORE_SCALE_Y.0 | Self::IGNORE_SCALE_Z.0);
    /// Every per-axis inheritance bit (not including `IGNORE_PARENT`)
    pub const IGNORE_MASK: Self =
        Self(Self::IGNORE_TRANSLATION.0 | Self::IGNORE_ROTATION.0 | Self::IGNORE_SCALE.0);

    /// Flags a freshly created object starts with
    pub const SPAWN: Self = Self(Self::ACTIVE.0 | Self::TRANSFORM_DIRTY.0);

    #[must_use]
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[inline]
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    #[must_use]
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }
}

impl std::ops::BitOr for ObjectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
