// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::string::String;
use core::fmt;

use crate::path::KeyPath;

/// Why a key path was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidPathReason {
    /// The path was the empty string.
    Empty,
    /// The path had an empty segment (`"a..b"`, `".a"`, `"a."`).
    EmptySegment,
    /// The path is well-formed but does not name an observable attribute of
    /// the target.
    NotObservable,
}

impl fmt::Display for InvalidPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Empty => "path is empty",
            Self::EmptySegment => "path contains an empty segment",
            Self::NotObservable => "no observable attribute at this path",
        })
    }
}

/// Error returned when a key path cannot be observed.
///
/// Raised at registration time, never deferred to the first notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidPathError {
    path: String,
    reason: InvalidPathReason,
}

impl InvalidPathError {
    /// Creates a new error for `path`.
    #[must_use]
    pub fn new(path: &str, reason: InvalidPathReason) -> Self {
        Self {
            path: String::from(path),
            reason,
        }
    }

    /// Shorthand for an error with [`InvalidPathReason::NotObservable`].
    #[must_use]
    pub fn not_observable(path: &KeyPath) -> Self {
        Self::new(path.as_str(), InvalidPathReason::NotObservable)
    }

    /// The rejected path, as given.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why the path was rejected.
    #[must_use]
    pub fn reason(&self) -> InvalidPathReason {
        self.reason
    }
}

impl fmt::Display for InvalidPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid key path `{}`: {}", self.path, self.reason)
    }
}

impl core::error::Error for InvalidPathError {}

/// Error returned by dynamic (by key path) value access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValueError {
    /// The key path is malformed or not declared.
    InvalidPath(InvalidPathError),
    /// The value does not have the attribute's declared type.
    TypeMismatch {
        /// The attribute that was written.
        path: KeyPath,
        /// The declared value type.
        expected: &'static str,
        /// The type of the value that was supplied.
        found: &'static str,
    },
}

impl From<InvalidPathError> for KeyValueError {
    fn from(err: InvalidPathError) -> Self {
        Self::InvalidPath(err)
    }
}

impl fmt::Display for KeyValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath(err) => fmt::Display::fmt(err, f),
            Self::TypeMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "value for `{path}` has type `{found}`, expected `{expected}`"
            ),
        }
    }
}

impl core::error::Error for KeyValueError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::InvalidPath(err) => Some(err),
            Self::TypeMismatch { .. } => None,
        }
    }
}
