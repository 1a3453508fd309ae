// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key paths.
//!
//! A [`KeyPath`] names an observable attribute. Paths are `.`-separated
//! segments (`"frame.width"`); a dotted path is just another attribute name
//! as far as lookup is concerned, the segments only matter for validation.

use alloc::rc::Rc;
use core::borrow::Borrow;
use core::fmt;
use core::str::FromStr;

use crate::error::{InvalidPathError, InvalidPathReason};

/// Separator between key path segments.
pub const SEGMENT_SEPARATOR: char = '.';

/// A validated, cheaply clonable key path.
///
/// # Example
///
/// ```rust
/// use understory_observe::KeyPath;
///
/// let path = KeyPath::parse("frame.width").unwrap();
/// assert_eq!(path.as_str(), "frame.width");
/// assert_eq!(path.depth(), 2);
/// assert_eq!(path.last_segment(), "width");
///
/// assert!(KeyPath::parse("").is_err());
/// assert!(KeyPath::parse("frame..width").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath(Rc<str>);

impl KeyPath {
    /// Parses and validates a key path.
    ///
    /// Fails with [`InvalidPathReason::Empty`] for an empty string and with
    /// [`InvalidPathReason::EmptySegment`] when any segment is empty
    /// (leading, trailing, or doubled separators).
    pub fn parse(path: &str) -> Result<Self, InvalidPathError> {
        if path.is_empty() {
            return Err(InvalidPathError::new(path, InvalidPathReason::Empty));
        }
        if path.split(SEGMENT_SEPARATOR).any(str::is_empty) {
            return Err(InvalidPathError::new(
                path,
                InvalidPathReason::EmptySegment,
            ));
        }
        Ok(Self(Rc::from(path)))
    }

    /// Returns the path as a string slice.
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the segments of this path, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.split(SEGMENT_SEPARATOR)
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Returns the innermost segment.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.0
            .rsplit(SEGMENT_SEPARATOR)
            .next()
            .unwrap_or(&self.0)
    }
}

impl Borrow<str> for KeyPath {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for KeyPath {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyPath {
    type Err = InvalidPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = InvalidPathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl fmt::Debug for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPath").field(&&*self.0).finish()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
