//! Named boolean tags and per-world tag sets.
//!
//! Tags are registered once in a [`TagRegistry`] and receive a dense index in
//! registration order. A world stores which tags are on as a [`TagSet`], a
//! bit vector indexed by that same index. Tag sets may be shorter than the
//! registry (a tag registered after the set was sized simply reads as off).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EcsError;

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

/// Handle to a registered tag. Cheap to copy; compare by index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(u32);

impl Tag {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this tag is on in `tags`. Out-of-range indices read as off.
    #[inline]
    pub fn is_set_in(self, tags: &TagSet) -> bool {
        tags.contains(self)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

/// Propagation attributes of a tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFlags {
    /// A child world copies this tag from its parent when it is created.
    pub inheritable: bool,
    /// Setting this tag on a parent world pushes it down to its children.
    pub propagable: bool,
}

impl TagFlags {
    pub const NONE: TagFlags = TagFlags {
        inheritable: false,
        propagable: false,
    };
}

/// Everything known about a registered tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub index: usize,
    pub flags: TagFlags,
}

impl TagInfo {
    pub fn tag(&self) -> Tag {
        Tag(self.index as u32)
    }

    pub fn is_inheritable(&self) -> bool {
        self.flags.inheritable
    }

    pub fn is_propagable(&self) -> bool {
        self.flags.propagable
    }
}

// ---------------------------------------------------------------------------
// TagRegistry
// ---------------------------------------------------------------------------

/// Append-only table of tags.
#[derive(Debug, Default, Clone)]
pub struct TagRegistry {
    infos: Vec<TagInfo>,
    by_name: HashMap<String, Tag>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag with no propagation attributes.
    pub fn register(&mut self, name: &str) -> Result<Tag, EcsError> {
        self.register_with(name, TagFlags::NONE)
    }

    /// Register a tag. The returned handle's index equals the number of tags
    /// registered before it.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateTag`] if `name` is already taken.
    pub fn register_with(&mut self, name: &str, flags: TagFlags) -> Result<Tag, EcsError> {
        if self.by_name.contains_key(name) {
            return Err(EcsError::DuplicateTag(name.to_owned()));
        }
        let tag = Tag(self.infos.len() as u32);
        self.infos.push(TagInfo {
            name: name.to_owned(),
            index: tag.index(),
            flags,
        });
        self.by_name.insert(name.to_owned(), tag);
        Ok(tag)
    }

    pub fn count(&self) -> usize {
        self.infos.len()
    }

    pub fn by_index(&self, index: usize) -> Option<&TagInfo> {
        self.infos.get(index)
    }

    /// Info for a tag handle.
    ///
    /// # Panics
    ///
    /// Panics if `tag` was issued by a different registry.
    pub fn info(&self, tag: Tag) -> &TagInfo {
        self.infos
            .get(tag.index())
            .unwrap_or_else(|| panic!("{tag:?} was not issued by this registry"))
    }

    pub fn find(&self, name: &str) -> Option<Tag> {
        self.by_name.get(name).copied()
    }

    /// Resolve a tag by name for configuration input.
    pub fn resolve(&self, name: &str) -> Result<Tag, EcsError> {
        self.find(name)
            .ok_or_else(|| EcsError::UnknownTag(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagInfo> {
        self.infos.iter()
    }
}

// ---------------------------------------------------------------------------
// TagSet
// ---------------------------------------------------------------------------

/// Per-world bit vector of active tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    bits: Vec<bool>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An all-off set with room for every tag in `registry`.
    pub fn sized_for(registry: &TagRegistry) -> Self {
        Self {
            bits: vec![false; registry.count()],
        }
    }

    #[inline]
    pub fn contains(&self, tag: Tag) -> bool {
        self.bits.get(tag.index()).copied().unwrap_or(false)
    }

    /// Turn `tag` on or off, growing the vector if needed.
    ///
    /// Returns whether the stored value changed.
    pub fn set(&mut self, tag: Tag, on: bool) -> bool {
        let index = tag.index();
        if index >= self.bits.len() {
            if !on {
                return false;
            }
            self.bits.resize(index + 1, false);
        }
        let changed = self.bits[index] != on;
        self.bits[index] = on;
        changed
    }

    pub fn insert(&mut self, tag: Tag) -> bool {
        self.set(tag, true)
    }

    pub fn remove(&mut self, tag: Tag) -> bool {
        self.set(tag, false)
    }

    /// Number of tags switched on.
    pub fn len(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Number of tag slots stored, on or off.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Set tags in index order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(|(i, _)| Tag(i as u32))
    }

    /// Turn on every tag that is set in `parent` and marked inheritable.
    /// Tags `registry` does not know are skipped.
    ///
    /// Returns the number of tags that changed.
    pub fn inherit_from(&mut self, parent: &TagSet, registry: &TagRegistry) -> usize {
        parent
            .iter()
            .filter(|&tag| registry.by_index(tag.index()).is_some_and(TagInfo::is_inheritable))
            .filter(|&tag| self.insert(tag))
            .count()
    }

    /// Push every propagable tag set in `self` into `child`. Tags
    /// `registry` does not know are skipped.
    ///
    /// Returns the number of tags that changed on the child.
    pub fn propagate_to(&self, child: &mut TagSet, registry: &TagRegistry) -> usize {
        self.iter()
            .filter(|&tag| registry.by_index(tag.index()).is_some_and(TagInfo::is_propagable))
            .filter(|&tag| child.insert(tag))
            .count()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
