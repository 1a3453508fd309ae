// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Schema-driven attribute storage with change dispatch.
//!
//! [`ObservableObject`] is the stock implementation of
//! [`KeyValueObserving`]: it stores attribute values, notifies observers on
//! every write, and runs teardown hooks when it is dropped.
//!
//! # Implementation
//!
//! Values live in a sorted `SmallVec` keyed by declaration index, searched
//! with binary search. Only explicitly set attributes take space; defaults
//! stay in the [`Schema`].
//!
//! Dispatch snapshots the observers of the written attribute, releases the
//! interior borrow, and then calls handlers. Handlers may therefore read or
//! write the object, or add and remove observers. An observer removed during
//! a dispatch is skipped for the rest of that dispatch.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use smallvec::SmallVec;

use crate::attribute::Attribute;
use crate::change::{Change, ObservingOptions};
use crate::error::{InvalidPathError, KeyValueError};
use crate::path::KeyPath;
use crate::schema::Schema;
use crate::source::{
    ChangeHandler, KeyValueObserving, ObservationToken, TeardownHook, TeardownId,
};
use crate::value::AnyValue;

/// Inline capacity for explicitly set values.
const INLINE_CAPACITY: usize = 8;

struct ObserverEntry {
    token: ObservationToken,
    slot: u16,
    path: KeyPath,
    options: ObservingOptions,
    handler: ChangeHandler,
    active: Cell<bool>,
}

#[derive(Default)]
struct State {
    /// Explicit values, sorted by slot.
    values: SmallVec<[(u16, AnyValue); INLINE_CAPACITY]>,
    /// Observers in registration order.
    observers: Vec<Rc<ObserverEntry>>,
    hooks: Vec<(TeardownId, TeardownHook)>,
    next_token: u64,
    next_hook: u64,
}

impl State {
    #[inline]
    fn find(&self, slot: u16) -> Result<usize, usize> {
        self.values.binary_search_by_key(&slot, |(s, _)| *s)
    }

    fn explicit(&self, slot: u16) -> Option<&AnyValue> {
        self.find(slot).ok().map(|idx| &self.values[idx].1)
    }

    fn store(&mut self, slot: u16, value: Option<AnyValue>) {
        match (self.find(slot), value) {
            (Ok(idx), Some(value)) => self.values[idx].1 = value,
            (Err(idx), Some(value)) => self.values.insert(idx, (slot, value)),
            (Ok(idx), None) => {
                self.values.remove(idx);
            }
            (Err(_), None) => {}
        }
    }
}

/// An object with schema-declared, observable attributes.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_observe::{
///     AnyValue, Change, ChangeHandler, KeyPath, KeyValueObserving, ObservableObject,
///     ObservingOptions, Schema,
/// };
///
/// let mut schema = Schema::new("Counter");
/// let count = schema.declare_with_default("count", 0_u32);
/// let counter = ObservableObject::new(Rc::new(schema));
///
/// let seen = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&seen);
/// let handler: ChangeHandler = Rc::new(move |_: &KeyPath, change: &Change| {
///     sink.set(change.new_value().and_then(AnyValue::get::<u32>).unwrap());
/// });
///
/// let path = KeyPath::parse("count").unwrap();
/// let token = counter
///     .add_observer(&path, ObservingOptions::default(), handler)
///     .unwrap();
///
/// counter.set(count, 3);
/// assert_eq!(seen.get(), 3);
/// assert_eq!(counter.get(count), Some(3));
///
/// assert!(counter.remove_observer(token));
/// counter.set(count, 4);
/// assert_eq!(seen.get(), 3);
/// ```
pub struct ObservableObject {
    schema: Rc<Schema>,
    state: RefCell<State>,
}

impl ObservableObject {
    /// Creates an object with no explicit values.
    #[must_use]
    pub fn new(schema: Rc<Schema>) -> Self {
        Self {
            schema,
            state: RefCell::new(State::default()),
        }
    }

    /// Returns the schema this object was created with.
    #[must_use]
    #[inline]
    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    /// Returns the number of active observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.state.borrow().observers.len()
    }

    /// Returns the number of attached teardown hooks.
    #[must_use]
    pub fn teardown_hook_count(&self) -> usize {
        self.state.borrow().hooks.len()
    }

    fn slot_of<T>(&self, attribute: Attribute<T>) -> u16 {
        assert!(
            self.schema.owns(attribute),
            "{attribute:?} was not declared by schema `{}`",
            self.schema.name()
        );
        attribute.index()
    }

    /// Explicit value, falling back to the declared default.
    fn effective(&self, slot: u16) -> Option<AnyValue> {
        if let Some(value) = self.state.borrow().explicit(slot) {
            return Some(value.clone());
        }
        self.schema
            .decl(slot)
            .and_then(|decl| decl.default_value())
            .cloned()
    }

    /// Reads an attribute: its explicit value, else its default, else `None`.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` belongs to another schema.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, attribute: Attribute<T>) -> Option<T> {
        let slot = self.slot_of(attribute);
        self.effective(slot).and_then(|value| value.get::<T>())
    }

    /// Returns `true` if an explicit value is set for `attribute`.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` belongs to another schema.
    #[must_use]
    pub fn has_value<T>(&self, attribute: Attribute<T>) -> bool {
        let slot = self.slot_of(attribute);
        self.state.borrow().explicit(slot).is_some()
    }

    /// Writes an attribute and notifies its observers.
    ///
    /// Every write notifies, even when the value is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` belongs to another schema.
    pub fn set<T: 'static>(&self, attribute: Attribute<T>, value: T) {
        let slot = self.slot_of(attribute);
        self.write(slot, Some(AnyValue::new(value)));
    }

    /// Removes the explicit value of an attribute, so it reads as its default
    /// again. Observers are notified only if a value was set.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` belongs to another schema.
    pub fn clear<T>(&self, attribute: Attribute<T>) -> bool {
        let slot = self.slot_of(attribute);
        if self.state.borrow().explicit(slot).is_none() {
            return false;
        }
        self.write(slot, None);
        true
    }

    /// Reads an attribute by key path.
    pub fn value_for_key_path(&self, path: &str) -> Result<Option<AnyValue>, InvalidPathError> {
        let path = KeyPath::parse(path)?;
        let slot = self
            .schema
            .lookup(path.as_str())
            .ok_or_else(|| InvalidPathError::not_observable(&path))?;
        Ok(self.effective(slot))
    }

    /// Writes an attribute by key path and notifies its observers.
    ///
    /// The value must have the attribute's declared type.
    pub fn set_value_for_key_path(&self, path: &str, value: AnyValue) -> Result<(), KeyValueError> {
        let path = KeyPath::parse(path)?;
        let Some((slot, decl)) = self
            .schema
            .lookup(path.as_str())
            .and_then(|slot| self.schema.decl(slot).map(|decl| (slot, decl)))
        else {
            return Err(InvalidPathError::not_observable(&path).into());
        };
        if decl.type_id() != value.type_id() {
            return Err(KeyValueError::TypeMismatch {
                path,
                expected: decl.type_name(),
                found: value.type_name(),
            });
        }
        self.write(slot, Some(value));
        Ok(())
    }

    fn observers_of(&self, slot: u16) -> Vec<Rc<ObserverEntry>> {
        self.state
            .borrow()
            .observers
            .iter()
            .filter(|entry| entry.slot == slot)
            .cloned()
            .collect()
    }

    fn write(&self, slot: u16, value: Option<AnyValue>) {
        let observers = self.observers_of(slot);
        let old = self.effective(slot);

        for entry in &observers {
            if entry.options.contains(ObservingOptions::PRIOR) && entry.active.get() {
                (entry.handler)(&entry.path, &Change::prior(entry.options, old.as_ref()));
            }
        }

        self.state.borrow_mut().store(slot, value);
        let new = self.effective(slot);

        for entry in &observers {
            if !entry.active.get() {
                continue;
            }
            tracing::trace!(
                path = %entry.path,
                token = entry.token.raw(),
                "dispatching change"
            );
            (entry.handler)(
                &entry.path,
                &Change::setting(entry.options, old.as_ref(), new.as_ref()),
            );
        }
    }
}

impl KeyValueObserving for ObservableObject {
    fn add_observer(
        &self,
        path: &KeyPath,
        options: ObservingOptions,
        handler: ChangeHandler,
    ) -> Result<ObservationToken, InvalidPathError> {
        let slot = self
            .schema
            .lookup(path.as_str())
            .ok_or_else(|| InvalidPathError::not_observable(path))?;

        let entry = {
            let mut state = self.state.borrow_mut();
            state.next_token += 1;
            let entry = Rc::new(ObserverEntry {
                token: ObservationToken::from_raw(state.next_token),
                slot,
                path: path.clone(),
                options,
                handler,
                active: Cell::new(true),
            });
            state.observers.push(Rc::clone(&entry));
            entry
        };

        if options.contains(ObservingOptions::INITIAL) {
            let current = self.effective(slot);
            (entry.handler)(&entry.path, &Change::initial(options, current.as_ref()));
        }

        Ok(entry.token)
    }

    fn remove_observer(&self, token: ObservationToken) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            state
                .observers
                .iter()
                .position(|entry| entry.token == token)
                .map(|idx| state.observers.remove(idx))
        };
        match removed {
            Some(entry) => {
                entry.active.set(false);
                true
            }
            None => false,
        }
    }

    fn attach_teardown(&self, hook: TeardownHook) -> TeardownId {
        let mut state = self.state.borrow_mut();
        state.next_hook += 1;
        let id = TeardownId::from_raw(state.next_hook);
        state.hooks.push((id, hook));
        id
    }

    fn detach_teardown(&self, id: TeardownId) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            state
                .hooks
                .iter()
                .position(|(hook_id, _)| *hook_id == id)
                .map(|idx| state.hooks.remove(idx))
        };
        removed.is_some()
    }
}

impl Drop for ObservableObject {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let hooks = core::mem::take(&mut state.hooks);
        let observers = core::mem::take(&mut state.observers);
        for entry in &observers {
            entry.active.set(false);
        }
        if !hooks.is_empty() || !observers.is_empty() {
            tracing::debug!(
                schema = self.schema.name(),
                hooks = hooks.len(),
                observers = observers.len(),
                "tearing down observed object"
            );
        }
        for (_, hook) in hooks {
            hook();
        }
        drop(observers);
    }
}

impl core::fmt::Debug for ObservableObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ObservableObject")
            .field("schema", &self.schema.name())
            .field("values", &state.values.len())
            .field("observers", &state.observers.len())
            .field("teardown_hooks", &state.hooks.len())
            .finish()
    }
}
