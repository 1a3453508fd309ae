// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The observation contract between observed objects and observers.
//!
//! [`KeyValueObserving`] is the low-level mechanism: it hands out an
//! [`ObservationToken`] per registration and dispatches [`Change`] payloads to
//! the registered handler. It knows nothing about replacing registrations or
//! cleaning up after observers; that bookkeeping lives in
//! [`ObservationRegistry`](crate::ObservationRegistry).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::fmt;

use crate::change::{Change, ObservingOptions};
use crate::error::InvalidPathError;
use crate::path::KeyPath;

/// Handler invoked with the observed path and the change payload.
pub type ChangeHandler = Rc<dyn Fn(&KeyPath, &Change)>;

/// Hook run while an observed object is being destroyed.
pub type TeardownHook = Box<dyn FnOnce()>;

/// Opaque handle for one observer registration on one object.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationToken(u64);

impl ObservationToken {
    /// Wraps a raw token value. Implementors of [`KeyValueObserving`] mint
    /// these; values only need to be unique per object.
    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token value.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservationToken").field(&self.0).finish()
    }
}

/// Handle for an attached [`TeardownHook`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeardownId(u64);

impl TeardownId {
    /// Wraps a raw id. Values only need to be unique per object.
    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TeardownId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TeardownId").field(&self.0).finish()
    }
}

/// An object whose attributes can be observed by key path.
///
/// # Contract
///
/// - `add_observer` validates `path` eagerly and fails with an
///   [`InvalidPathError`] instead of accepting a path it can never report on.
/// - After `remove_observer(token)` returns, the handler for `token` is never
///   invoked again, even by a dispatch that is already in progress.
/// - Attached teardown hooks run exactly once, while the object is being
///   destroyed, unless detached first.
/// - Handlers are called without any internal borrow held, so they may call
///   back into the object.
pub trait KeyValueObserving {
    /// Registers `handler` for changes of `path`.
    fn add_observer(
        &self,
        path: &KeyPath,
        options: ObservingOptions,
        handler: ChangeHandler,
    ) -> Result<ObservationToken, InvalidPathError>;

    /// Releases a registration. Returns `false` if `token` was not active.
    fn remove_observer(&self, token: ObservationToken) -> bool;

    /// Attaches a hook to run when this object is destroyed.
    fn attach_teardown(&self, hook: TeardownHook) -> TeardownId;

    /// Detaches a hook without running it. Returns `false` if `id` was not
    /// attached.
    fn detach_teardown(&self, id: TeardownId) -> bool;
}
