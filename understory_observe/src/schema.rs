// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute schemas.
//!
//! A [`Schema`] lists the attributes an [`ObservableObject`](crate::ObservableObject)
//! exposes. Only declared key paths can be observed; everything else is
//! rejected with [`InvalidPathReason::NotObservable`](crate::InvalidPathReason::NotObservable).

use alloc::vec::Vec;
use core::any::TypeId;
use hashbrown::HashMap;

use crate::attribute::{Attribute, SchemaId};
use crate::path::KeyPath;
use crate::value::AnyValue;

/// One declared attribute.
pub struct AttributeDecl {
    path: KeyPath,
    type_id: TypeId,
    type_name: &'static str,
    default: Option<AnyValue>,
}

impl AttributeDecl {
    /// Returns the attribute's key path.
    #[must_use]
    #[inline]
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// Returns the [`TypeId`] of the attribute's value type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the attribute's value type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the value reported while no explicit value is set.
    #[must_use]
    #[inline]
    pub fn default_value(&self) -> Option<&AnyValue> {
        self.default.as_ref()
    }
}

impl core::fmt::Debug for AttributeDecl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AttributeDecl")
            .field("path", &self.path)
            .field("type", &self.type_name)
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// The set of observable attributes of one kind of object.
///
/// Schemas are built once and then shared (usually behind an `Rc`) by every
/// object of that kind.
///
/// # Example
///
/// ```rust
/// use understory_observe::Schema;
///
/// let mut schema = Schema::new("Document");
/// let title = schema.declare::<String>("title");
/// let zoom = schema.declare_with_default("view.zoom", 1.0_f64);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.lookup("view.zoom"), Some(zoom.index()));
/// assert_eq!(schema.lookup("author"), None);
/// assert_eq!(schema.decl(title.index()).unwrap().type_name(), "alloc::string::String");
/// ```
pub struct Schema {
    id: SchemaId,
    name: &'static str,
    attributes: Vec<AttributeDecl>,
    by_path: HashMap<KeyPath, u16>,
}

impl Schema {
    /// Creates an empty schema. `name` is used for diagnostics only.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            id: SchemaId::next(),
            name,
            attributes: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    /// Returns this schema's identity.
    #[must_use]
    #[inline]
    pub fn id(&self) -> SchemaId {
        self.id
    }

    /// Returns the diagnostic name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declares an attribute with no default; it reads as absent until set.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid key path, if it is already declared,
    /// or if more than 65,535 attributes are declared.
    pub fn declare<T: 'static>(&mut self, path: &str) -> Attribute<T> {
        self.push::<T>(path, None)
    }

    /// Declares an attribute that reads as `default` until set.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Schema::declare`].
    pub fn declare_with_default<T: 'static>(&mut self, path: &str, default: T) -> Attribute<T> {
        self.push::<T>(path, Some(AnyValue::new(default)))
    }

    fn push<T: 'static>(&mut self, path: &str, default: Option<AnyValue>) -> Attribute<T> {
        let path = match KeyPath::parse(path) {
            Ok(path) => path,
            Err(err) => panic!("cannot declare attribute on `{}`: {err}", self.name),
        };
        assert!(
            !self.by_path.contains_key(path.as_str()),
            "Attribute '{path}' is already declared on `{}`",
            self.name
        );
        assert!(
            self.attributes.len() < u16::MAX as usize,
            "Too many attributes declared (max {})",
            u16::MAX
        );

        #[expect(clippy::cast_possible_truncation, reason = "checked above")]
        let index = self.attributes.len() as u16;

        self.by_path.insert(path.clone(), index);
        self.attributes.push(AttributeDecl {
            path,
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            default,
        });

        Attribute::new(self.id, index)
    }

    /// Returns the number of declared attributes.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if nothing is declared.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Looks up the declaration index for a key path.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<u16> {
        self.by_path.get(path).copied()
    }

    /// Returns the declaration at `index`.
    #[must_use]
    pub fn decl(&self, index: u16) -> Option<&AttributeDecl> {
        self.attributes.get(usize::from(index))
    }

    /// Returns `true` if `attribute` was declared by this schema.
    #[must_use]
    #[inline]
    pub fn owns<T>(&self, attribute: Attribute<T>) -> bool {
        attribute.schema_id() == self.id
    }

    /// Iterates over declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDecl> {
        self.attributes.iter()
    }
}

impl core::fmt::Debug for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Schema")
            .field("id", &self.id)
            .field("name", &self.name)
            .field(
                "attributes",
                &self.attributes.iter().map(|a| a.path.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
