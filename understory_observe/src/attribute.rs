// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed attribute keys.
//!
//! [`Attribute<T>`] is handed out by [`Schema::declare`](crate::Schema::declare)
//! and remembers which schema declared it, so that using a key against an
//! object of another schema is caught instead of reading an unrelated slot.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_SCHEMA_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a [`Schema`](crate::Schema).
///
/// Every schema gets a fresh id on construction; ids are never reused within
/// a process.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaId(u32);

impl SchemaId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemaId").field(&self.0).finish()
    }
}

/// A typed key for one attribute of a [`Schema`](crate::Schema).
///
/// The phantom `T` is the attribute's value type, so typed reads and writes
/// on [`ObservableObject`](crate::ObservableObject) are checked at compile
/// time:
///
/// ```rust
/// use understory_observe::{Attribute, Schema};
///
/// let mut schema = Schema::new("Label");
/// let text: Attribute<String> = schema.declare("text");
/// let width: Attribute<f64> = schema.declare_with_default("width", 0.0);
///
/// assert_eq!(text.index(), 0);
/// assert_eq!(width.index(), 1);
/// assert_eq!(text.schema_id(), schema.id());
/// ```
pub struct Attribute<T> {
    schema: SchemaId,
    index: u16,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Attribute<T> {
    pub(crate) const fn new(schema: SchemaId, index: u16) -> Self {
        Self {
            schema,
            index,
            _marker: PhantomData,
        }
    }

    /// Returns the schema that declared this attribute.
    #[must_use]
    #[inline]
    pub const fn schema_id(self) -> SchemaId {
        self.schema
    }

    /// Returns the declaration index of this attribute within its schema.
    #[must_use]
    #[inline]
    pub const fn index(self) -> u16 {
        self.index
    }
}

// Manual impls so that `T` needs no bounds.

impl<T> Copy for Attribute<T> {}

impl<T> Clone for Attribute<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Attribute<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.index == other.index
    }
}

impl<T> Eq for Attribute<T> {}

impl<T> Hash for Attribute<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.hash(state);
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("schema", &self.schema)
            .field("index", &self.index)
            .field("type", &core::any::type_name::<T>())
            .finish()
    }
}
