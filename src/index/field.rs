// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Single-valued field indexers: strings, fixed-width integers, booleans,
//! UUIDs, presence flags and arbitrary predicates.

use uuid::Uuid;

use super::error::IndexError;
use super::{downcast, one_arg, AnyObject, IndexArg, SingleIndex, TERMINATOR};

/// Indexes a single string field.
///
/// The encoding is the UTF-8 bytes followed by a `0x00` terminator so that
/// `"foo"` and `"foobar"` stay distinct on point lookups. An empty or
/// absent value omits the object from the index.
pub struct StringFieldIndex<T> {
    get: Box<dyn Fn(&T) -> Option<String> + Send + Sync>,
    lowercase: bool,
}

impl<T> StringFieldIndex<T> {
    pub fn new(get: impl Fn(&T) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            get: Box::new(get),
            lowercase: false,
        }
    }

    /// Folds values (and query arguments) to lower case before encoding.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    fn encode(&self, value: &str, terminate: bool) -> Vec<u8> {
        let folded;
        let value = if self.lowercase {
            folded = value.to_lowercase();
            &folded
        } else {
            value
        };
        let mut out = Vec::with_capacity(value.len() + 1);
        out.extend_from_slice(value.as_bytes());
        if terminate {
            out.push(TERMINATOR);
        }
        out
    }
}

impl<T: 'static> SingleIndex for StringFieldIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        let value = (self.get)(downcast::<T>(obj)?);
        Ok(match value.as_deref() {
            Some("") | None => None,
            Some(s) => Some(self.encode(s, true)),
        })
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Str(s) => Ok(self.encode(s, true)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "string",
            }),
        }
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Str(s) => Ok(self.encode(s, false)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "string",
            }),
        }
    }

    fn terminated(&self) -> bool {
        true
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width integer usable as an index key component.
///
/// Encodings are big-endian at the type's natural width; signed types
/// flip the sign bit so that numeric order equals byte order.
pub trait FixedInt: Copy + Send + Sync + 'static + sealed::Sealed {
    #[doc(hidden)]
    const NAME: &'static str;
    #[doc(hidden)]
    fn encode(self) -> Vec<u8>;
    #[doc(hidden)]
    fn from_arg(arg: &IndexArg) -> Option<Self>;
}

macro_rules! fixed_int_signed {
    ($($ty:ty => $uns:ty, $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl FixedInt for $ty {
                const NAME: &'static str = $name;
                fn encode(self) -> Vec<u8> {
                    ((self as $uns) ^ (1 << (<$uns>::BITS - 1))).to_be_bytes().to_vec()
                }
                fn from_arg(arg: &IndexArg) -> Option<Self> {
                    match arg {
                        IndexArg::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

macro_rules! fixed_int_unsigned {
    ($($ty:ty => $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl FixedInt for $ty {
                const NAME: &'static str = $name;
                fn encode(self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
                fn from_arg(arg: &IndexArg) -> Option<Self> {
                    match arg {
                        IndexArg::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

fixed_int_signed! {
    i8 => u8, I8, "i8";
    i16 => u16, I16, "i16";
    i32 => u32, I32, "i32";
    i64 => u64, I64, "i64";
}

fixed_int_unsigned! {
    u8 => U8, "u8";
    u16 => U16, "u16";
    u32 => U32, "u32";
    u64 => U64, "u64";
}

/// Indexes a single fixed-width integer field, signed or unsigned.
pub struct IntFieldIndex<T, N> {
    get: Box<dyn Fn(&T) -> Option<N> + Send + Sync>,
}

impl<T, N: FixedInt> IntFieldIndex<T, N> {
    pub fn new(get: impl Fn(&T) -> Option<N> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl<T: 'static, N: FixedInt> SingleIndex for IntFieldIndex<T, N> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        Ok((self.get)(downcast::<T>(obj)?).map(FixedInt::encode))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        let arg = one_arg(args)?;
        N::from_arg(arg)
            .map(FixedInt::encode)
            .ok_or(IndexError::WrongArgType {
                pos: 0,
                want: N::NAME,
            })
    }
}

/// Indexes a single boolean field as one byte.
pub struct BoolFieldIndex<T> {
    get: Box<dyn Fn(&T) -> Option<bool> + Send + Sync>,
}

impl<T> BoolFieldIndex<T> {
    pub fn new(get: impl Fn(&T) -> Option<bool> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

fn bool_byte(b: bool) -> Vec<u8> {
    vec![u8::from(b)]
}

impl<T: 'static> SingleIndex for BoolFieldIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        Ok((self.get)(downcast::<T>(obj)?).map(bool_byte))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Bool(b) => Ok(bool_byte(*b)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "bool",
            }),
        }
    }
}

/// Indexes a single UUID field as its 16 raw bytes.
///
/// Query arguments may be a [`Uuid`], the canonical hyphenated string, or
/// the 16 raw bytes; prefix lookups accept partial hex with an even nibble
/// count.
pub struct UuidFieldIndex<T> {
    get: Box<dyn Fn(&T) -> Option<Uuid> + Send + Sync>,
}

impl<T> UuidFieldIndex<T> {
    pub fn new(get: impl Fn(&T) -> Option<Uuid> + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

fn parse_uuid_arg(arg: &IndexArg) -> Result<Vec<u8>, IndexError> {
    match arg {
        IndexArg::Uuid(u) => Ok(u.as_bytes().to_vec()),
        IndexArg::Str(s) => Ok(Uuid::parse_str(s)?.as_bytes().to_vec()),
        IndexArg::Bytes(b) if b.len() == 16 => Ok(b.clone()),
        IndexArg::Bytes(b) => Err(IndexError::InvalidUuidLength(b.len())),
        _ => Err(IndexError::WrongArgType {
            pos: 0,
            want: "uuid, hyphenated string, or 16 bytes",
        }),
    }
}

fn parse_uuid_prefix(input: &str) -> Result<Vec<u8>, IndexError> {
    let mut nibbles = Vec::with_capacity(32);
    for c in input.chars() {
        if c == '-' {
            continue;
        }
        let digit = c.to_digit(16).ok_or_else(|| IndexError::InvalidUuidPrefix {
            input: input.to_string(),
            reason: "not hexadecimal",
        })?;
        nibbles.push(digit as u8);
    }
    if nibbles.len() % 2 != 0 {
        return Err(IndexError::InvalidUuidPrefix {
            input: input.to_string(),
            reason: "odd number of hex digits",
        });
    }
    if nibbles.len() > 32 {
        return Err(IndexError::InvalidUuidPrefix {
            input: input.to_string(),
            reason: "longer than a uuid",
        });
    }
    Ok(nibbles.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
}

impl<T: 'static> SingleIndex for UuidFieldIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        Ok((self.get)(downcast::<T>(obj)?).map(|u| u.as_bytes().to_vec()))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        parse_uuid_arg(one_arg(args)?)
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Uuid(u) => Ok(u.as_bytes().to_vec()),
            IndexArg::Str(s) => parse_uuid_prefix(s),
            IndexArg::Bytes(b) if b.len() <= 16 => Ok(b.clone()),
            IndexArg::Bytes(b) => Err(IndexError::InvalidUuidLength(b.len())),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "uuid, hex string, or byte prefix",
            }),
        }
    }
}

/// Indexes whether a field is set: one byte, `0x01` when the predicate
/// reports a value, `0x00` otherwise.
pub struct FieldSetIndex<T> {
    get: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> FieldSetIndex<T> {
    pub fn new(get: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self { get: Box::new(get) }
    }
}

impl<T: 'static> SingleIndex for FieldSetIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        Ok(Some(bool_byte((self.get)(downcast::<T>(obj)?))))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Bool(b) => Ok(bool_byte(*b)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "bool",
            }),
        }
    }
}

/// Indexes the outcome of an arbitrary fallible predicate as one byte.
pub struct ConditionalIndex<T> {
    predicate: Box<dyn Fn(&T) -> Result<bool, String> + Send + Sync>,
}

impl<T> ConditionalIndex<T> {
    pub fn new(predicate: impl Fn(&T) -> Result<bool, String> + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl<T: 'static> SingleIndex for ConditionalIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        let value = (self.predicate)(downcast::<T>(obj)?).map_err(IndexError::Conditional)?;
        Ok(Some(bool_byte(value)))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Bool(b) => Ok(bool_byte(*b)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "bool",
            }),
        }
    }
}
