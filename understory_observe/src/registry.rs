// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callback registrations keyed by observed object and key path.
//!
//! [`ObservationRegistry`] keeps, for every observed object, a table from key
//! path to the [`ObservationToken`] it obtained from that object. The table
//! lives in the registry (a side table keyed by object identity), not in the
//! object, and it only holds a `Weak` to the object.
//!
//! ## Teardown
//!
//! When the registry creates a table for an object it attaches a teardown
//! hook to it. The object runs the hook while it is being destroyed, and the
//! hook drops the object's table, so no entry outlives its object and no
//! address is ever looked up after it could have been reused. The hook only
//! holds a `Weak` to the registry's tables; dropping the registry first
//! releases every token and detaches every hook instead.
//!
//! ## Re-entrancy
//!
//! No borrow of the tables is held while calling into an observed object.
//! Callbacks may therefore observe, remove, or drop objects freely.
//!
//! A callback can run before `observe` has stored its registration (an
//! `INITIAL` notification fires inside `add_observer`). Each (object, path)
//! being registered carries a generation that `observe`, `remove_observer`
//! and `remove_all_observers` bump; if it moved while the object was
//! registering, the late token is released instead of stored, so the most
//! recent call wins.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;

use crate::change::{Change, ChangeKind, ObservingOptions};
use crate::error::InvalidPathError;
use crate::path::KeyPath;
use crate::source::{ChangeHandler, KeyValueObserving, ObservationToken, TeardownHook, TeardownId};
use crate::value::AnyValue;

/// Identity of an observed object: the address of its value.
type TargetKey = usize;

fn target_key<T: ?Sized>(target: &T) -> TargetKey {
    core::ptr::from_ref(target).cast::<()>().addr()
}

#[derive(Debug)]
struct Registration {
    token: ObservationToken,
    options: ObservingOptions,
}

struct TargetTable {
    target: Weak<dyn KeyValueObserving>,
    teardown: Option<TeardownId>,
    entries: HashMap<KeyPath, Registration>,
}

type Tables = RefCell<HashMap<TargetKey, TargetTable>>;

/// A registration whose `add_observer` call has not returned yet.
#[derive(Debug)]
struct InFlight {
    generation: u64,
    depth: u32,
}

/// Per-object, per-path change callbacks with replace-on-reobserve semantics.
///
/// - At most one callback is active per (object, key path). Observing a path
///   again replaces the previous callback, which never fires again.
/// - Removing a path that is not observed is a no-op.
/// - Callbacks get a [`Weak`] to the observed object; the registry never
///   keeps an observed object alive.
/// - When an observed object is dropped, its registrations go with it.
///
/// The registry is single-threaded (`!Send`) and adds no locking.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use understory_observe::{AnyValue, ObservableObject, ObservationRegistry, Schema};
///
/// let mut schema = Schema::new("Player");
/// let volume = schema.declare_with_default("volume", 50_u8);
/// let player = Rc::new(ObservableObject::new(Rc::new(schema)));
///
/// let registry = ObservationRegistry::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&log);
/// registry
///     .observe(&player, "volume", move |_player, old, new| {
///         sink.borrow_mut().push((
///             old.and_then(AnyValue::get::<u8>),
///             new.and_then(AnyValue::get::<u8>),
///         ));
///     })
///     .unwrap();
///
/// player.set(volume, 80);
/// assert_eq!(*log.borrow(), [(Some(50), Some(80))]);
///
/// registry.remove_observer(&player, "volume");
/// registry.remove_observer(&player, "volume"); // no-op
/// player.set(volume, 10);
/// assert_eq!(log.borrow().len(), 1);
///
/// assert!(registry.observe(&player, "balance", |_, _, _| {}).is_err());
/// ```
pub struct ObservationRegistry {
    tables: Rc<Tables>,
    in_flight: RefCell<HashMap<(TargetKey, KeyPath), InFlight>>,
}

impl ObservationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Rc::new(RefCell::new(HashMap::new())),
            in_flight: RefCell::new(HashMap::new()),
        }
    }

    /// Observes `path` on `target`, replacing any callback already registered
    /// for that path.
    ///
    /// `callback` receives a weak reference to `target`, the previous value,
    /// and the new value. Values are `None` when the attribute has no value.
    ///
    /// Fails with [`InvalidPathError`] if `path` is malformed or not
    /// observable on `target`; the registry is left unchanged in that case.
    pub fn observe<T, F>(&self, target: &Rc<T>, path: &str, callback: F) -> Result<(), InvalidPathError>
    where
        T: KeyValueObserving + 'static,
        F: Fn(&Weak<T>, Option<&AnyValue>, Option<&AnyValue>) + 'static,
    {
        self.observe_with_options(target, path, ObservingOptions::default(), callback)
    }

    /// Like [`observe`](Self::observe), with extra [`ObservingOptions`].
    ///
    /// `OLD | NEW` are always requested. With `INITIAL`, `callback` runs once
    /// during registration with the current value as `new` and no `old`.
    /// `PRIOR` is ignored: the callback only sees completed changes.
    ///
    /// If `callback` observes or removes the same path while it is being
    /// registered, that later call wins and this registration is dropped.
    pub fn observe_with_options<T, F>(
        &self,
        target: &Rc<T>,
        path: &str,
        options: ObservingOptions,
        callback: F,
    ) -> Result<(), InvalidPathError>
    where
        T: KeyValueObserving + 'static,
        F: Fn(&Weak<T>, Option<&AnyValue>, Option<&AnyValue>) + 'static,
    {
        let path = KeyPath::parse(path)?;
        let key = target_key(&**target);
        let options = (options | ObservingOptions::default()) - ObservingOptions::PRIOR;

        let weak_target = Rc::downgrade(target);
        let handler: ChangeHandler = Rc::new(move |_: &KeyPath, change: &Change| {
            if change.kind() == ChangeKind::Prior {
                return;
            }
            callback(&weak_target, change.old_value(), change.new_value());
        });
        let generation = self.begin(key, &path);
        let added = target.add_observer(&path, options, handler);
        let current = self.finish(key, &path, generation);
        let token = added?;
        if !current {
            target.remove_observer(token);
            tracing::debug!(
                path = %path,
                token = token.raw(),
                "registration superseded while registering; released"
            );
            return Ok(());
        }

        let needs_hook = !self.tables.borrow().contains_key(&key);
        let teardown = needs_hook.then(|| target.attach_teardown(self.teardown_hook(key)));

        let replaced = {
            let mut tables = self.tables.borrow_mut();
            let table = tables.entry(key).or_insert_with(|| TargetTable {
                target: Rc::downgrade(target) as Weak<dyn KeyValueObserving>,
                teardown: None,
                entries: HashMap::new(),
            });
            if teardown.is_some() {
                table.teardown = teardown;
            }
            table
                .entries
                .insert(path.clone(), Registration { token, options })
        };

        match replaced {
            Some(previous) => {
                target.remove_observer(previous.token);
                tracing::debug!(
                    path = %path,
                    token = token.raw(),
                    replaced = previous.token.raw(),
                    "replaced key-path observer"
                );
            }
            None => {
                tracing::debug!(path = %path, token = token.raw(), "registered key-path observer");
            }
        }
        Ok(())
    }

    /// Stops observing `path` on `target`.
    ///
    /// Does nothing if `path` is not observed, so it is safe to call
    /// redundantly. Other paths on `target` are unaffected. A registration of
    /// `path` that is still in progress, such as one whose `INITIAL`
    /// callback makes this call, is cancelled too.
    pub fn remove_observer<T: KeyValueObserving + ?Sized>(&self, target: &Rc<T>, path: &str) {
        let key = target_key(&**target);
        self.supersede(key, Some(path));
        let (removed, detach) = {
            let mut tables = self.tables.borrow_mut();
            let Some(table) = tables.get_mut(&key) else {
                return;
            };
            let removed = table.entries.remove(path);
            let emptied = table.entries.is_empty();
            let detach = if emptied {
                tables.remove(&key).and_then(|table| table.teardown)
            } else {
                None
            };
            (removed, detach)
        };

        if let Some(registration) = removed {
            target.remove_observer(registration.token);
            tracing::debug!(path, token = registration.token.raw(), "removed key-path observer");
        }
        if let Some(id) = detach {
            target.detach_teardown(id);
        }
    }

    /// Stops observing every path on `target`.
    ///
    /// This is the explicit form of what happens when `target` is dropped.
    pub fn remove_all_observers<T: KeyValueObserving + ?Sized>(&self, target: &Rc<T>) {
        let key = target_key(&**target);
        self.supersede(key, None);
        let removed = self.tables.borrow_mut().remove(&key);
        let Some(table) = removed else {
            return;
        };
        let count = table.entries.len();
        for registration in table.entries.into_values() {
            target.remove_observer(registration.token);
        }
        if let Some(id) = table.teardown {
            target.detach_teardown(id);
        }
        tracing::debug!(count, "removed all key-path observers of object");
    }

    /// Returns `true` if `path` is observed on `target`.
    #[must_use]
    pub fn is_observing<T: KeyValueObserving + ?Sized>(&self, target: &Rc<T>, path: &str) -> bool {
        self.tables
            .borrow()
            .get(&target_key(&**target))
            .is_some_and(|table| table.entries.contains_key(path))
    }

    /// Returns the options a path was registered with, if it is observed.
    #[must_use]
    pub fn options_for<T: KeyValueObserving + ?Sized>(
        &self,
        target: &Rc<T>,
        path: &str,
    ) -> Option<ObservingOptions> {
        self.tables
            .borrow()
            .get(&target_key(&**target))
            .and_then(|table| table.entries.get(path))
            .map(|registration| registration.options)
    }

    /// Returns the observed paths of `target`, sorted.
    #[must_use]
    pub fn observed_paths<T: KeyValueObserving + ?Sized>(&self, target: &Rc<T>) -> Vec<KeyPath> {
        let mut paths: Vec<KeyPath> = self
            .tables
            .borrow()
            .get(&target_key(&**target))
            .map(|table| table.entries.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Returns the number of objects with at least one registration.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.tables.borrow().len()
    }

    /// Returns the total number of registrations.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.tables
            .borrow()
            .values()
            .map(|table| table.entries.len())
            .sum()
    }

    /// Returns `true` if nothing is observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.borrow().is_empty()
    }

    /// Marks `(key, path)` as being registered and returns its generation.
    ///
    /// An enclosing registration of the same path is superseded.
    fn begin(&self, key: TargetKey, path: &KeyPath) -> u64 {
        let mut in_flight = self.in_flight.borrow_mut();
        let entry = in_flight
            .entry((key, path.clone()))
            .and_modify(|entry| {
                entry.generation += 1;
                entry.depth += 1;
            })
            .or_insert(InFlight {
                generation: 0,
                depth: 1,
            });
        entry.generation
    }

    /// Ends a registration started by [`begin`](Self::begin). Returns `false`
    /// if the path was observed or removed again in the meantime.
    fn finish(&self, key: TargetKey, path: &KeyPath, generation: u64) -> bool {
        let mut in_flight = self.in_flight.borrow_mut();
        let slot = (key, path.clone());
        let Some(entry) = in_flight.get_mut(&slot) else {
            return true;
        };
        let current = entry.generation == generation;
        entry.depth -= 1;
        if entry.depth == 0 {
            in_flight.remove(&slot);
        }
        current
    }

    /// Bumps the generation of in-flight registrations on `key`, for one
    /// path or for all of them.
    fn supersede(&self, key: TargetKey, path: Option<&str>) {
        let mut in_flight = self.in_flight.borrow_mut();
        if in_flight.is_empty() {
            return;
        }
        for ((target, registering), entry) in in_flight.iter_mut() {
            if *target == key && path.is_none_or(|path| registering.as_str() == path) {
                entry.generation += 1;
            }
        }
    }

    fn teardown_hook(&self, key: TargetKey) -> TeardownHook {
        let tables = Rc::downgrade(&self.tables);
        Box::new(move || {
            let Some(tables) = tables.upgrade() else {
                return;
            };
            let removed = tables.borrow_mut().remove(&key);
            if let Some(table) = removed {
                tracing::debug!(
                    released = table.entries.len(),
                    "observed object dropped; released its registrations"
                );
            }
        })
    }
}

impl Default for ObservationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObservationRegistry {
    fn drop(&mut self) {
        let tables = core::mem::take(&mut *self.tables.borrow_mut());
        for table in tables.into_values() {
            let Some(target) = table.target.upgrade() else {
                continue;
            };
            for registration in table.entries.into_values() {
                target.remove_observer(registration.token);
            }
            if let Some(id) = table.teardown {
                target.detach_teardown(id);
            }
        }
    }
}

impl core::fmt::Debug for ObservationRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObservationRegistry")
            .field("targets", &self.target_count())
            .field("registrations", &self.registration_count())
            .finish()
    }
}

/// Per-object observation methods, for callers that hold an `Rc` to the
/// observed object.
///
/// ```rust
/// use std::rc::Rc;
/// use understory_observe::{ObservableObject, ObservationRegistry, ObserveExt, Schema};
///
/// let mut schema = Schema::new("Toggle");
/// let on = schema.declare_with_default("on", false);
/// let toggle = Rc::new(ObservableObject::new(Rc::new(schema)));
/// let registry = ObservationRegistry::new();
///
/// toggle
///     .observe_key_path(&registry, "on", |toggle, _, _| {
///         assert!(toggle.upgrade().is_some());
///     })
///     .unwrap();
/// toggle.set(on, true);
/// toggle.remove_observer_for(&registry, "on");
/// assert!(registry.is_empty());
/// ```
pub trait ObserveExt<T: KeyValueObserving + 'static> {
    /// See [`ObservationRegistry::observe`].
    fn observe_key_path<F>(
        &self,
        registry: &ObservationRegistry,
        path: &str,
        callback: F,
    ) -> Result<(), InvalidPathError>
    where
        F: Fn(&Weak<T>, Option<&AnyValue>, Option<&AnyValue>) + 'static;

    /// See [`ObservationRegistry::remove_observer`].
    fn remove_observer_for(&self, registry: &ObservationRegistry, path: &str);
}

impl<T: KeyValueObserving + 'static> ObserveExt<T> for Rc<T> {
    fn observe_key_path<F>(
        &self,
        registry: &ObservationRegistry,
        path: &str,
        callback: F,
    ) -> Result<(), InvalidPathError>
    where
        F: Fn(&Weak<T>, Option<&AnyValue>, Option<&AnyValue>) + 'static,
    {
        registry.observe(self, path, callback)
    }

    fn remove_observer_for(&self, registry: &ObservationRegistry, path: &str) {
        registry.remove_observer(self, path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attribute, InvalidPathReason, ObservableObject, Schema};
    use alloc::string::String;
    use alloc::vec;
    use core::cell::Cell;

    struct Fixture {
        object: Rc<ObservableObject>,
        width: Attribute<f64>,
        label: Attribute<String>,
    }

    fn fixture() -> Fixture {
        let mut schema = Schema::new("Widget");
        let width = schema.declare_with_default("frame.width", 0.0_f64);
        let label = schema.declare::<String>("label");
        Fixture {
            object: Rc::new(ObservableObject::new(Rc::new(schema))),
            width,
            label,
        }
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&Weak<ObservableObject>, Option<&AnyValue>, Option<&AnyValue>)) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, move |_: &Weak<ObservableObject>, _: Option<&AnyValue>, _: Option<&AnyValue>| {
            sink.set(sink.get() + 1);
        })
    }

    #[test]
    fn observe_then_mutate_fires_once() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let expected = Rc::downgrade(&f.object);

        registry
            .observe(&f.object, "frame.width", move |target, old, new| {
                assert!(target.ptr_eq(&expected));
                sink.borrow_mut().push((
                    old.and_then(AnyValue::get::<f64>),
                    new.and_then(AnyValue::get::<f64>),
                ));
            })
            .unwrap();

        f.object.set(f.width, 10.0);
        assert_eq!(*seen.borrow(), vec![(Some(0.0), Some(10.0))]);
    }

    #[test]
    fn absent_values_are_none() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        registry
            .observe(&f.object, "label", move |_, old, new| {
                sink.borrow_mut().push((
                    old.and_then(AnyValue::get::<String>),
                    new.and_then(AnyValue::get::<String>),
                ));
            })
            .unwrap();

        f.object.set(f.label, String::from("a"));
        f.object.clear(f.label);
        assert_eq!(
            *seen.borrow(),
            vec![(None, Some(String::from("a"))), (Some(String::from("a")), None)]
        );
    }

    #[test]
    fn reobserve_replaces_callback() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();

        registry.observe(&f.object, "frame.width", cb1).unwrap();
        registry.observe(&f.object, "frame.width", cb2).unwrap();
        assert_eq!(f.object.observer_count(), 1);
        assert_eq!(registry.registration_count(), 1);

        f.object.set(f.width, 1.0);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry.remove_observer(&f.object, "frame.width");
        registry.remove_observer(&f.object, "not a path..");
        assert!(registry.is_empty());

        let (count, cb) = counter();
        registry.observe(&f.object, "frame.width", cb).unwrap();
        registry.remove_observer(&f.object, "label");
        assert!(registry.is_observing(&f.object, "frame.width"));

        f.object.set(f.width, 2.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn remove_stops_notifications() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (count, cb) = counter();
        registry.observe(&f.object, "frame.width", cb).unwrap();

        registry.remove_observer(&f.object, "frame.width");
        registry.remove_observer(&f.object, "frame.width");
        f.object.set(f.width, 3.0);

        assert_eq!(count.get(), 0);
        assert_eq!(f.object.observer_count(), 0);
        assert_eq!(f.object.teardown_hook_count(), 0);
        assert_eq!(registry.target_count(), 0);
    }

    #[test]
    fn removal_leaves_other_paths() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (widths, cb_w) = counter();
        let (labels, cb_l) = counter();
        registry.observe(&f.object, "frame.width", cb_w).unwrap();
        registry.observe(&f.object, "label", cb_l).unwrap();

        registry.remove_observer(&f.object, "frame.width");
        f.object.set(f.width, 1.0);
        f.object.set(f.label, String::from("x"));

        assert_eq!(widths.get(), 0);
        assert_eq!(labels.get(), 1);
        assert_eq!(f.object.teardown_hook_count(), 1);
    }

    #[test]
    fn invalid_path_leaves_table_unchanged() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (_, cb) = counter();
        registry.observe(&f.object, "label", cb).unwrap();

        let (_, missing) = counter();
        let err = registry
            .observe(&f.object, "frame.height", missing)
            .unwrap_err();
        assert_eq!(err.reason(), InvalidPathReason::NotObservable);

        let (_, malformed) = counter();
        let err = registry.observe(&f.object, "", malformed).unwrap_err();
        assert_eq!(err.reason(), InvalidPathReason::Empty);

        assert_eq!(registry.observed_paths(&f.object), vec![KeyPath::parse("label").unwrap()]);
        assert_eq!(f.object.observer_count(), 1);
    }

    #[test]
    fn invalid_path_on_fresh_target_creates_no_table() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (_, cb) = counter();
        assert!(registry.observe(&f.object, "nope", cb).is_err());
        assert_eq!(registry.target_count(), 0);
        assert_eq!(f.object.teardown_hook_count(), 0);
    }

    #[test]
    fn dropping_target_releases_table() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (count, cb) = counter();
        registry.observe(&f.object, "frame.width", cb).unwrap();
        assert_eq!(registry.target_count(), 1);

        drop(f);
        assert_eq!(registry.target_count(), 0);
        assert_eq!(registry.registration_count(), 0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn callback_does_not_keep_target_alive() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry
            .observe(&f.object, "frame.width", |_, _, _| {})
            .unwrap();
        assert_eq!(Rc::strong_count(&f.object), 1);
        assert_eq!(Rc::weak_count(&f.object), 2);
    }

    #[test]
    fn dropping_registry_releases_tokens() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (count, cb) = counter();
        registry.observe(&f.object, "frame.width", cb).unwrap();

        drop(registry);
        assert_eq!(f.object.observer_count(), 0);
        assert_eq!(f.object.teardown_hook_count(), 0);
        f.object.set(f.width, 9.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn remove_all_observers_clears_target() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry.observe(&f.object, "frame.width", |_, _, _| {}).unwrap();
        registry.observe(&f.object, "label", |_, _, _| {}).unwrap();

        registry.remove_all_observers(&f.object);
        assert!(registry.is_empty());
        assert_eq!(f.object.observer_count(), 0);
        assert_eq!(f.object.teardown_hook_count(), 0);

        registry.remove_all_observers(&f.object);
    }

    #[test]
    fn initial_option_fires_during_registration() {
        let f = fixture();
        f.object.set(f.width, 4.0);
        let registry = ObservationRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        registry
            .observe_with_options(
                &f.object,
                "frame.width",
                ObservingOptions::INITIAL,
                move |_, old, new| {
                    sink.borrow_mut().push((
                        old.and_then(AnyValue::get::<f64>),
                        new.and_then(AnyValue::get::<f64>),
                    ));
                },
            )
            .unwrap();
        assert_eq!(*seen.borrow(), vec![(None, Some(4.0))]);
        assert_eq!(
            registry.options_for(&f.object, "frame.width"),
            Some(ObservingOptions::INITIAL | ObservingOptions::OLD | ObservingOptions::NEW)
        );
    }

    #[test]
    fn prior_option_is_not_forwarded() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        let (count, cb) = counter();
        registry
            .observe_with_options(&f.object, "frame.width", ObservingOptions::PRIOR, cb)
            .unwrap();
        f.object.set(f.width, 1.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn callback_may_remove_itself() {
        let f = fixture();
        let registry = Rc::new(ObservationRegistry::new());
        let count = Rc::new(Cell::new(0));

        let weak_registry = Rc::downgrade(&registry);
        let sink = Rc::clone(&count);
        registry
            .observe(&f.object, "frame.width", move |target, _, _| {
                sink.set(sink.get() + 1);
                if let (Some(registry), Some(target)) = (weak_registry.upgrade(), target.upgrade()) {
                    registry.remove_observer(&target, "frame.width");
                }
            })
            .unwrap();

        f.object.set(f.width, 1.0);
        f.object.set(f.width, 2.0);
        assert_eq!(count.get(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn initial_callback_may_remove_its_registration() {
        let f = fixture();
        let registry = Rc::new(ObservationRegistry::new());
        let count = Rc::new(Cell::new(0));

        let weak_registry = Rc::downgrade(&registry);
        let sink = Rc::clone(&count);
        registry
            .observe_with_options(
                &f.object,
                "frame.width",
                ObservingOptions::INITIAL,
                move |target, _, _| {
                    sink.set(sink.get() + 1);
                    if let (Some(registry), Some(target)) =
                        (weak_registry.upgrade(), target.upgrade())
                    {
                        registry.remove_observer(&target, "frame.width");
                    }
                },
            )
            .unwrap();
        assert_eq!(count.get(), 1);

        f.object.set(f.width, 1.0);
        assert_eq!(count.get(), 1);
        assert!(!registry.is_observing(&f.object, "frame.width"));
        assert!(registry.is_empty());
        assert_eq!(f.object.observer_count(), 0);
        assert_eq!(f.object.teardown_hook_count(), 0);
    }

    #[test]
    fn initial_callback_remove_all_cancels_registration() {
        let f = fixture();
        let registry = Rc::new(ObservationRegistry::new());
        registry.observe(&f.object, "label", |_, _, _| {}).unwrap();

        let weak_registry = Rc::downgrade(&registry);
        let (count, cb) = counter();
        registry
            .observe_with_options(
                &f.object,
                "frame.width",
                ObservingOptions::INITIAL,
                move |target, old, new| {
                    cb(target, old, new);
                    if let (Some(registry), Some(target)) =
                        (weak_registry.upgrade(), target.upgrade())
                    {
                        registry.remove_all_observers(&target);
                    }
                },
            )
            .unwrap();

        f.object.set(f.width, 1.0);
        assert_eq!(count.get(), 1);
        assert!(registry.is_empty());
        assert_eq!(f.object.observer_count(), 0);
    }

    #[test]
    fn nested_reobserve_during_initial_wins() {
        let f = fixture();
        let registry = Rc::new(ObservationRegistry::new());
        let (outer, outer_cb) = counter();
        let (inner, inner_cb) = counter();
        let inner_cb = Rc::new(inner_cb);

        let weak_registry = Rc::downgrade(&registry);
        registry
            .observe_with_options(
                &f.object,
                "frame.width",
                ObservingOptions::INITIAL,
                move |target, old, new| {
                    outer_cb(target, old, new);
                    if let (Some(registry), Some(target)) =
                        (weak_registry.upgrade(), target.upgrade())
                    {
                        let inner_cb = Rc::clone(&inner_cb);
                        registry
                            .observe(&target, "frame.width", move |t, o, n| inner_cb(t, o, n))
                            .unwrap();
                    }
                },
            )
            .unwrap();
        assert_eq!(outer.get(), 1);
        assert_eq!(registry.registration_count(), 1);
        assert_eq!(f.object.observer_count(), 1);

        f.object.set(f.width, 5.0);
        assert_eq!(outer.get(), 1);
        assert_eq!(inner.get(), 1);
    }

    #[test]
    fn queries_take_the_same_handle_as_observe() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry.observe(&f.object, "frame.width", |_, _, _| {}).unwrap();

        assert!(registry.is_observing(&f.object, "frame.width"));
        assert_eq!(
            registry.options_for(&f.object, "frame.width"),
            Some(ObservingOptions::default())
        );
        assert_eq!(
            registry.observed_paths(&f.object),
            vec![KeyPath::parse("frame.width").unwrap()]
        );

        // A second handle to the same object answers the same way.
        let alias = Rc::clone(&f.object);
        assert!(registry.is_observing(&alias, "frame.width"));
        registry.remove_observer(&alias, "frame.width");
        assert!(!registry.is_observing(&f.object, "frame.width"));
    }

    #[test]
    fn registries_are_independent() {
        let f = fixture();
        let a = ObservationRegistry::new();
        let b = ObservationRegistry::new();
        let (count_a, cb_a) = counter();
        let (count_b, cb_b) = counter();
        a.observe(&f.object, "frame.width", cb_a).unwrap();
        b.observe(&f.object, "frame.width", cb_b).unwrap();

        a.remove_observer(&f.object, "frame.width");
        f.object.set(f.width, 1.0);
        assert_eq!(count_a.get(), 0);
        assert_eq!(count_b.get(), 1);

        drop(f);
        assert!(b.is_empty());
    }

    #[test]
    fn observed_paths_sorted() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry.observe(&f.object, "label", |_, _, _| {}).unwrap();
        registry.observe(&f.object, "frame.width", |_, _, _| {}).unwrap();

        let paths: Vec<_> = registry
            .observed_paths(&f.object)
            .iter()
            .map(|p| String::from(p.as_str()))
            .collect();
        assert_eq!(paths, vec!["frame.width", "label"]);
    }

    #[test]
    fn debug_counts() {
        let f = fixture();
        let registry = ObservationRegistry::new();
        registry.observe(&f.object, "label", |_, _, _| {}).unwrap();
        let debug = alloc::format!("{registry:?}");
        assert!(debug.contains("targets: 1"));
        assert!(debug.contains("registrations: 1"));
    }
}
