// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Index key derivation: the codec that turns typed values into
//! byte-ordered keys, and the indexer objects that apply it to stored
//! objects and query arguments.
//!
//! # Key Concepts
//!
//! All encodings are chosen so that byte-wise comparison equals semantic
//! comparison and so that a prefix of an encoding is a valid search
//! prefix. Strings terminate with `0x00` to separate `"foo"` from
//! `"foobar"` on point lookups; prefix encodings omit the terminator.
//! Signed integers are big-endian with the sign bit flipped; unsigned are
//! plain big-endian. Both use the type's natural width.
//!
//! An [`Indexer`] is a tagged union over the two extraction shapes:
//! single-valued (at most one key per object) and multi-valued (a set of
//! keys per object). Schema validation inspects the tag, never the
//! concrete type. Field access is expressed as a typed closure over the
//! stored object type; the object is recovered from its erased
//! [`Object`](crate::Object) form via `downcast_ref`.
//!
//! # Example
//!
//! ```
//! use iridiumdb::index::{IndexArg, Indexer, StringFieldIndex};
//!
//! struct User { email: String }
//!
//! let idx = Indexer::single(StringFieldIndex::new(|u: &User| Some(u.email.clone())));
//! let key = idx.from_args(&[IndexArg::from("a@example.com")]).unwrap();
//! assert_eq!(key.last(), Some(&0u8));
//! ```

mod compound;
mod error;
mod field;
mod multi;

pub use compound::{CompoundIndex, CompoundMultiIndex};
pub use error::IndexError;
pub use field::{
    BoolFieldIndex, ConditionalIndex, FieldSetIndex, FixedInt, IntFieldIndex, StringFieldIndex,
    UuidFieldIndex,
};
pub use multi::{StringMapFieldIndex, StringSliceFieldIndex};

use std::any::Any;

use uuid::Uuid;

/// The string/compound component terminator byte.
pub(crate) const TERMINATOR: u8 = 0x00;

/// The erased object form indexers extract from.
pub type AnyObject = dyn Any + Send + Sync;

/// A typed query argument passed to `from_args` / `prefix_from_args`.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexArg {
    Str(String),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl From<&str> for IndexArg {
    fn from(s: &str) -> Self {
        IndexArg::Str(s.to_string())
    }
}

impl From<String> for IndexArg {
    fn from(s: String) -> Self {
        IndexArg::Str(s)
    }
}

impl From<bool> for IndexArg {
    fn from(b: bool) -> Self {
        IndexArg::Bool(b)
    }
}

impl From<Uuid> for IndexArg {
    fn from(u: Uuid) -> Self {
        IndexArg::Uuid(u)
    }
}

impl From<Vec<u8>> for IndexArg {
    fn from(b: Vec<u8>) -> Self {
        IndexArg::Bytes(b)
    }
}

impl From<&[u8]> for IndexArg {
    fn from(b: &[u8]) -> Self {
        IndexArg::Bytes(b.to_vec())
    }
}

macro_rules! arg_from_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for IndexArg {
            fn from(v: $ty) -> Self {
                IndexArg::$variant(v)
            }
        })*
    };
}

arg_from_int! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
}

/// Expects exactly one argument.
pub(crate) fn one_arg(args: &[IndexArg]) -> Result<&IndexArg, IndexError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(IndexError::WrongArgCount {
            want: 1,
            got: args.len(),
        }),
    }
}

/// Single-valued key derivation: at most one key per object.
pub trait SingleIndex: Send + Sync {
    /// Derives the key for `obj`, or `None` when the object has no value
    /// for this index.
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError>;

    /// Builds the exact lookup key from query arguments.
    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError>;

    /// Builds a search prefix from query arguments: the exact encoding
    /// without the trailing terminator of the last component.
    fn prefix_from_args(&self, _args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        Err(IndexError::PrefixUnsupported)
    }

    /// True if the exact encoding ends in the string terminator. Gate for
    /// longest-prefix lookups, which only make sense over raw encodings.
    fn terminated(&self) -> bool {
        false
    }
}

/// Multi-valued key derivation: a set of keys per object.
pub trait MultiIndex: Send + Sync {
    /// Derives every key for `obj`, or `None` when the object has no
    /// values for this index.
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<Vec<u8>>>, IndexError>;

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError>;

    fn prefix_from_args(&self, _args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        Err(IndexError::PrefixUnsupported)
    }

    fn terminated(&self) -> bool {
        false
    }
}

/// The tagged union of indexer shapes held by an index schema.
pub enum Indexer {
    Single(Box<dyn SingleIndex>),
    Multi(Box<dyn MultiIndex>),
}

impl Indexer {
    pub fn single(index: impl SingleIndex + 'static) -> Self {
        Indexer::Single(Box::new(index))
    }

    pub fn multi(index: impl MultiIndex + 'static) -> Self {
        Indexer::Multi(Box::new(index))
    }

    /// True for the single-valued shape.
    pub fn is_single(&self) -> bool {
        matches!(self, Indexer::Single(_))
    }

    /// Derives all keys for `obj`, normalized to a set. `None` means the
    /// object carries no value for this index.
    pub fn keys_from_object(&self, obj: &AnyObject) -> Result<Option<Vec<Vec<u8>>>, IndexError> {
        match self {
            Indexer::Single(ix) => Ok(ix.from_object(obj)?.map(|key| vec![key])),
            Indexer::Multi(ix) => match ix.from_object(obj)? {
                Some(keys) if !keys.is_empty() => Ok(Some(keys)),
                _ => Ok(None),
            },
        }
    }

    pub fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match self {
            Indexer::Single(ix) => ix.from_args(args),
            Indexer::Multi(ix) => ix.from_args(args),
        }
    }

    pub fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match self {
            Indexer::Single(ix) => ix.prefix_from_args(args),
            Indexer::Multi(ix) => ix.prefix_from_args(args),
        }
    }

    pub fn terminated(&self) -> bool {
        match self {
            Indexer::Single(ix) => ix.terminated(),
            Indexer::Multi(ix) => ix.terminated(),
        }
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indexer::Single(_) => f.write_str("Indexer::Single"),
            Indexer::Multi(_) => f.write_str("Indexer::Multi"),
        }
    }
}

/// Downcasts an erased object to the indexer's concrete type.
pub(crate) fn downcast<T: 'static>(obj: &AnyObject) -> Result<&T, IndexError> {
    obj.downcast_ref::<T>().ok_or(IndexError::WrongObjectType {
        want: std::any::type_name::<T>(),
    })
}
