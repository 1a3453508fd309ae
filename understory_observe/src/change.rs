// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change notifications.
//!
//! A [`Change`] is the payload an observed object hands to its observers. It
//! is dictionary-like: the old and new values live under [`ChangeKey::Old`]
//! and [`ChangeKey::New`], and each key is only present when the observer
//! asked for it through its [`ObservingOptions`].

use smallvec::SmallVec;

use crate::value::AnyValue;

bitflags::bitflags! {
    /// What an observer wants to receive.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ObservingOptions: u8 {
        /// Include the new value under [`ChangeKey::New`].
        const NEW = 0b0001;
        /// Include the previous value under [`ChangeKey::Old`].
        const OLD = 0b0010;
        /// Send one [`ChangeKind::Initial`] notification while registering.
        const INITIAL = 0b0100;
        /// Send a [`ChangeKind::Prior`] notification before each mutation.
        const PRIOR = 0b1000;
    }
}

impl Default for ObservingOptions {
    fn default() -> Self {
        Self::NEW | Self::OLD
    }
}

/// Why a notification was sent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The attribute was assigned or cleared.
    Setting,
    /// Sent once at registration, carrying the current value.
    Initial,
    /// Sent right before a mutation, carrying the value about to be replaced.
    Prior,
}

/// Keys of a [`Change`] payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKey {
    /// The value before the mutation.
    Old,
    /// The value after the mutation.
    New,
}

/// A change notification payload.
///
/// # Example
///
/// ```rust
/// use understory_observe::{AnyValue, Change, ChangeKey, ChangeKind, ObservingOptions};
///
/// let old = AnyValue::new(1_i32);
/// let new = AnyValue::new(2_i32);
///
/// let change = Change::setting(ObservingOptions::default(), Some(&old), Some(&new));
/// assert_eq!(change.kind(), ChangeKind::Setting);
/// assert_eq!(change.get(ChangeKey::Old).and_then(AnyValue::get::<i32>), Some(1));
/// assert_eq!(change.new_value().and_then(AnyValue::get::<i32>), Some(2));
///
/// // Keys that were not requested are absent.
/// let change = Change::setting(ObservingOptions::NEW, Some(&old), Some(&new));
/// assert!(change.old_value().is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Change {
    kind: ChangeKind,
    entries: SmallVec<[(ChangeKey, AnyValue); 2]>,
}

impl Change {
    /// Creates an empty payload of the given kind.
    #[must_use]
    pub fn new(kind: ChangeKind) -> Self {
        Self {
            kind,
            entries: SmallVec::new(),
        }
    }

    /// Builds a [`ChangeKind::Setting`] payload filtered by `options`.
    #[must_use]
    pub fn setting(
        options: ObservingOptions,
        old: Option<&AnyValue>,
        new: Option<&AnyValue>,
    ) -> Self {
        let mut change = Self::new(ChangeKind::Setting);
        if options.contains(ObservingOptions::OLD) {
            change.insert_opt(ChangeKey::Old, old);
        }
        if options.contains(ObservingOptions::NEW) {
            change.insert_opt(ChangeKey::New, new);
        }
        change
    }

    /// Builds a [`ChangeKind::Initial`] payload filtered by `options`.
    #[must_use]
    pub fn initial(options: ObservingOptions, current: Option<&AnyValue>) -> Self {
        let mut change = Self::new(ChangeKind::Initial);
        if options.contains(ObservingOptions::NEW) {
            change.insert_opt(ChangeKey::New, current);
        }
        change
    }

    /// Builds a [`ChangeKind::Prior`] payload filtered by `options`.
    #[must_use]
    pub fn prior(options: ObservingOptions, current: Option<&AnyValue>) -> Self {
        let mut change = Self::new(ChangeKind::Prior);
        if options.contains(ObservingOptions::OLD) {
            change.insert_opt(ChangeKey::Old, current);
        }
        change
    }

    fn insert_opt(&mut self, key: ChangeKey, value: Option<&AnyValue>) {
        if let Some(value) = value {
            self.insert(key, value.clone());
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: ChangeKey, value: AnyValue) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns why this notification was sent.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns `true` for [`ChangeKind::Prior`] notifications.
    #[must_use]
    #[inline]
    pub fn is_prior(&self) -> bool {
        self.kind == ChangeKind::Prior
    }

    /// Looks up a payload entry.
    #[must_use]
    pub fn get(&self, key: ChangeKey) -> Option<&AnyValue> {
        self.entries
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(v))
    }

    /// Shorthand for `get(ChangeKey::Old)`.
    #[must_use]
    #[inline]
    pub fn old_value(&self) -> Option<&AnyValue> {
        self.get(ChangeKey::Old)
    }

    /// Shorthand for `get(ChangeKey::New)`.
    #[must_use]
    #[inline]
    pub fn new_value(&self) -> Option<&AnyValue> {
        self.get(ChangeKey::New)
    }

    /// Returns the number of entries present.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the payload carries no values.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
