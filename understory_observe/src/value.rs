// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared type-erased attribute values.
//!
//! This module provides [`AnyValue`], the value type carried by attribute
//! storage and by [`Change`](crate::Change) payloads.

use alloc::rc::Rc;
use core::any::{Any, TypeId};
use core::fmt;

/// A shared, type-erased value.
///
/// Cloning is a reference count bump, so a single stored value can be handed
/// to every observer of a change without copying it.
///
/// # Example
///
/// ```rust
/// use understory_observe::AnyValue;
///
/// let value = AnyValue::new(42_i32);
/// assert!(value.is::<i32>());
/// assert_eq!(value.downcast_ref::<i32>(), Some(&42));
/// assert_eq!(value.get::<i32>(), Some(42));
/// assert_eq!(value.get::<f64>(), None);
/// assert_eq!(value.type_name(), "i32");
/// ```
#[derive(Clone)]
pub struct AnyValue {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl AnyValue {
    /// Wraps a concrete value.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the wrapped value.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        Any::type_id(&*self.inner)
    }

    /// Returns the type name of the wrapped value, for diagnostics.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the wrapped value is a `T`.
    #[must_use]
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Clones the wrapped value out as a `T`.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Returns `true` if both handles share the same allocation.
    #[must_use]
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
