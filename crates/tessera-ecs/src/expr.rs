//! Boolean expressions over tags.
//!
//! Expressions are built with the bit operators on [`Tag`] and [`TagExpr`]:
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! let mut reg = TagRegistry::new();
//! let render = reg.register("render").unwrap();
//! let imgui = reg.register("imgui").unwrap();
//!
//! let overlay = render & imgui;
//! let headless = !render;
//!
//! let tags: TagSet = [render].into_iter().collect();
//! assert!(!overlay.test(&tags));
//! assert!(!headless.test(&tags));
//! assert!((render | imgui).test(&tags));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::tag::{Tag, TagRegistry, TagSet};

// ---------------------------------------------------------------------------
// TagPredicate
// ---------------------------------------------------------------------------

/// Anything that can be evaluated against a world's tag set.
///
/// Object safe so predicates of different shapes can be stored together as
/// `Box<dyn TagPredicate>`.
pub trait TagPredicate: Send + Sync {
    fn test(&self, tags: &TagSet) -> bool;
}

impl TagPredicate for Tag {
    fn test(&self, tags: &TagSet) -> bool {
        self.is_set_in(tags)
    }
}

impl<F> TagPredicate for F
where
    F: Fn(&TagSet) -> bool + Send + Sync,
{
    fn test(&self, tags: &TagSet) -> bool {
        self(tags)
    }
}

// ---------------------------------------------------------------------------
// TagExpr
// ---------------------------------------------------------------------------

/// Immutable expression tree over tags.
#[derive(Clone, PartialEq, Eq)]
pub enum TagExpr {
    Leaf(Tag),
    And(Box<TagExpr>, Box<TagExpr>),
    Or(Box<TagExpr>, Box<TagExpr>),
    Not(Box<TagExpr>),
}

impl TagExpr {
    pub fn and(lhs: impl Into<TagExpr>, rhs: impl Into<TagExpr>) -> Self {
        TagExpr::And(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn or(lhs: impl Into<TagExpr>, rhs: impl Into<TagExpr>) -> Self {
        TagExpr::Or(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn negate(inner: impl Into<TagExpr>) -> Self {
        TagExpr::Not(Box::new(inner.into()))
    }

    pub fn test(&self, tags: &TagSet) -> bool {
        match self {
            TagExpr::Leaf(tag) => tag.is_set_in(tags),
            TagExpr::And(l, r) => l.test(tags) && r.test(tags),
            TagExpr::Or(l, r) => l.test(tags) || r.test(tags),
            TagExpr::Not(inner) => !inner.test(tags),
        }
    }

    /// Distinct tags referenced by the expression, in index order.
    pub fn tags(&self) -> Vec<Tag> {
        fn collect(expr: &TagExpr, out: &mut Vec<Tag>) {
            match expr {
                TagExpr::Leaf(tag) => out.push(*tag),
                TagExpr::And(l, r) | TagExpr::Or(l, r) => {
                    collect(l, out);
                    collect(r, out);
                }
                TagExpr::Not(inner) => collect(inner, out),
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out.sort();
        out.dedup();
        out
    }

    /// Render with tag names, e.g. `render & !imgui`.
    pub fn display<'a>(&'a self, registry: &'a TagRegistry) -> impl fmt::Display + 'a {
        DisplayExpr {
            expr: self,
            registry,
        }
    }
}

impl TagPredicate for TagExpr {
    fn test(&self, tags: &TagSet) -> bool {
        TagExpr::test(self, tags)
    }
}

impl From<Tag> for TagExpr {
    fn from(tag: Tag) -> Self {
        TagExpr::Leaf(tag)
    }
}

impl fmt::Debug for TagExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagExpr::Leaf(tag) => write!(f, "#{}", tag.index()),
            TagExpr::And(l, r) => write!(f, "({l:?} & {r:?})"),
            TagExpr::Or(l, r) => write!(f, "({l:?} | {r:?})"),
            TagExpr::Not(inner) => write!(f, "!{inner:?}"),
        }
    }
}

struct DisplayExpr<'a> {
    expr: &'a TagExpr,
    registry: &'a TagRegistry,
}

impl DisplayExpr<'_> {
    fn write(&self, expr: &TagExpr, nested: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, l, r) = match expr {
            TagExpr::Leaf(tag) => {
                return match self.registry.by_index(tag.index()) {
                    Some(info) => f.write_str(&info.name),
                    None => write!(f, "#{}", tag.index()),
                };
            }
            TagExpr::Not(inner) => {
                f.write_str("!")?;
                return self.write(inner, true, f);
            }
            TagExpr::And(l, r) => ("&", l, r),
            TagExpr::Or(l, r) => ("|", l, r),
        };
        if nested {
            f.write_str("(")?;
        }
        self.write(l, true, f)?;
        write!(f, " {op} ")?;
        self.write(r, true, f)?;
        if nested {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(self.expr, false, f)
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

impl<R: Into<TagExpr>> BitAnd<R> for Tag {
    type Output = TagExpr;

    fn bitand(self, rhs: R) -> TagExpr {
        TagExpr::and(self, rhs)
    }
}

impl<R: Into<TagExpr>> BitOr<R> for Tag {
    type Output = TagExpr;

    fn bitor(self, rhs: R) -> TagExpr {
        TagExpr::or(self, rhs)
    }
}

impl Not for Tag {
    type Output = TagExpr;

    fn not(self) -> TagExpr {
        TagExpr::negate(self)
    }
}

impl<R: Into<TagExpr>> BitAnd<R> for TagExpr {
    type Output = TagExpr;

    fn bitand(self, rhs: R) -> TagExpr {
        TagExpr::and(self, rhs)
    }
}

impl<R: Into<TagExpr>> BitOr<R> for TagExpr {
    type Output = TagExpr;

    fn bitor(self, rhs: R) -> TagExpr {
        TagExpr::or(self, rhs)
    }
}

impl Not for TagExpr {
    type Output = TagExpr;

    fn not(self) -> TagExpr {
        TagExpr::negate(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
