// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host traits.
//!
//! Application types usually wrap their [`ObservableObject`] in a struct of
//! their own. Implementing [`AttributeHost`] for that struct makes it
//! [`KeyValueObserving`] by delegation, and [`AttributeHostExt`] adds typed
//! accessors, so the struct itself can be observed through an
//! [`ObservationRegistry`](crate::ObservationRegistry).

use crate::attribute::Attribute;
use crate::change::ObservingOptions;
use crate::error::InvalidPathError;
use crate::path::KeyPath;
use crate::source::{
    ChangeHandler, KeyValueObserving, ObservationToken, TeardownHook, TeardownId,
};
use crate::store::ObservableObject;

/// A type that stores its observable attributes in an [`ObservableObject`].
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
/// use understory_observe::{
///     Attribute, AttributeHost, AttributeHostExt, ObservableObject, Schema,
/// };
///
/// struct Slider {
///     attributes: ObservableObject,
///     value: Attribute<f64>,
/// }
///
/// impl AttributeHost for Slider {
///     fn attributes(&self) -> &ObservableObject {
///         &self.attributes
///     }
/// }
///
/// let mut schema = Schema::new("Slider");
/// let value = schema.declare_with_default("value", 0.0_f64);
/// let slider = Slider {
///     attributes: ObservableObject::new(Rc::new(schema)),
///     value,
/// };
///
/// slider.set_attribute(slider.value, 0.5);
/// assert_eq!(slider.attribute(slider.value), Some(0.5));
/// ```
pub trait AttributeHost {
    /// Returns the object holding this host's attributes.
    fn attributes(&self) -> &ObservableObject;
}

/// Typed accessors for [`AttributeHost`] implementors.
pub trait AttributeHostExt: AttributeHost {
    /// Reads an attribute (explicit value, else default).
    fn attribute<T: Clone + 'static>(&self, attribute: Attribute<T>) -> Option<T> {
        self.attributes().get(attribute)
    }

    /// Writes an attribute and notifies its observers.
    fn set_attribute<T: 'static>(&self, attribute: Attribute<T>, value: T) {
        self.attributes().set(attribute, value);
    }

    /// Clears an attribute back to its default.
    fn clear_attribute<T>(&self, attribute: Attribute<T>) -> bool {
        self.attributes().clear(attribute)
    }
}

impl<H: AttributeHost + ?Sized> AttributeHostExt for H {}

impl<H: AttributeHost + ?Sized> KeyValueObserving for H {
    #[inline]
    fn add_observer(
        &self,
        path: &KeyPath,
        options: ObservingOptions,
        handler: ChangeHandler,
    ) -> Result<ObservationToken, InvalidPathError> {
        self.attributes().add_observer(path, options, handler)
    }

    #[inline]
    fn remove_observer(&self, token: ObservationToken) -> bool {
        self.attributes().remove_observer(token)
    }

    #[inline]
    fn attach_teardown(&self, hook: TeardownHook) -> TeardownId {
        self.attributes().attach_teardown(hook)
    }

    #[inline]
    fn detach_teardown(&self, id: TeardownId) -> bool {
        self.attributes().detach_teardown(id)
    }
}
