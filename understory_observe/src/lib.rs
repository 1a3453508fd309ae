// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Observe: key-path observation with managed registrations.
//!
//! This crate lets callers attach a change callback to a named attribute of an
//! object, and later detach it, without holding on to the underlying
//! observation handle themselves.
//!
//! ## Core Concepts
//!
//! ### Observed objects
//!
//! Anything implementing [`KeyValueObserving`] can be observed. The trait is
//! the low-level mechanism: register a [`ChangeHandler`] for a [`KeyPath`] and
//! get an [`ObservationToken`] back, remove a token, and attach teardown hooks
//! that run when the object is destroyed.
//!
//! [`ObservableObject`] is the stock implementation: attributes are declared
//! once in a [`Schema`], values are [`AnyValue`]s, and every write dispatches
//! a [`Change`] to the observers of that attribute. Application types embed an
//! `ObservableObject` and implement [`AttributeHost`] to become observable.
//!
//! ### Registry
//!
//! [`ObservationRegistry`] is the convenience layer on top:
//!
//! - `observe(target, path, callback)` registers a callback, replacing any
//!   callback already registered for that (target, path).
//! - `remove_observer(target, path)` removes it, and is a no-op if there is
//!   nothing to remove.
//! - When the target is dropped, its registrations are released with it.
//!
//! Callbacks receive a [`Weak`](alloc::rc::Weak) to the target plus the old
//! and new values, each `None` when the attribute had no value.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use understory_observe::{AnyValue, ObservableObject, ObservationRegistry, Schema};
//!
//! let mut schema = Schema::new("Window");
//! let title = schema.declare::<String>("title");
//! let window = Rc::new(ObservableObject::new(Rc::new(schema)));
//!
//! let registry = ObservationRegistry::new();
//! let titles = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&titles);
//! registry
//!     .observe(&window, "title", move |window, _old, new| {
//!         assert!(window.upgrade().is_some());
//!         sink.borrow_mut().push(new.and_then(AnyValue::get::<String>));
//!     })
//!     .unwrap();
//!
//! window.set(title, String::from("Untitled"));
//! assert_eq!(*titles.borrow(), [Some(String::from("Untitled"))]);
//!
//! // Dropping the window releases its registrations.
//! drop(window);
//! assert!(registry.is_empty());
//! ```
//!
//! ## Threading
//!
//! Everything here is single-threaded (`Rc` based). Notifications run
//! synchronously on the call that performs the write.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. It does not depend on `std`.

#![no_std]

extern crate alloc;

mod attribute;
mod change;
mod error;
mod object;
mod path;
mod registry;
mod schema;
mod source;
mod store;
mod value;

pub use attribute::{Attribute, SchemaId};
pub use change::{Change, ChangeKey, ChangeKind, ObservingOptions};
pub use error::{InvalidPathError, InvalidPathReason, KeyValueError};
pub use object::{AttributeHost, AttributeHostExt};
pub use path::{KeyPath, SEGMENT_SEPARATOR};
pub use registry::{ObservationRegistry, ObserveExt};
pub use schema::{AttributeDecl, Schema};
pub use source::{
    ChangeHandler, KeyValueObserving, ObservationToken, TeardownHook, TeardownId,
};
pub use store::ObservableObject;
pub use value::AnyValue;
