// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Multi-valued field indexers over slices and maps.

use super::error::IndexError;
use super::{downcast, one_arg, AnyObject, IndexArg, MultiIndex, TERMINATOR};

fn encode_str(value: &str, lowercase: bool, terminate: bool) -> Vec<u8> {
    let folded;
    let value = if lowercase {
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

/// Indexes a string-slice field: one key per element.
///
/// Empty elements are skipped; an object with no remaining elements is
/// omitted from the index. De-duplication across elements is left to the
/// trie, which stores non-unique entries under primary-id-suffixed keys.
pub struct StringSliceFieldIndex<T> {
    get: Box<dyn Fn(&T) -> Vec<String> + Send + Sync>,
    lowercase: bool,
}

impl<T> StringSliceFieldIndex<T> {
    pub fn new(get: impl Fn(&T) -> Vec<String> + Send + Sync + 'static) -> Self {
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
}

impl<T: 'static> MultiIndex for StringSliceFieldIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<Vec<u8>>>, IndexError> {
        let values = (self.get)(downcast::<T>(obj)?);
        let keys: Vec<Vec<u8>> = values
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| encode_str(s, self.lowercase, true))
            .collect();
        Ok(if keys.is_empty() { None } else { Some(keys) })
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Str(s) => Ok(encode_str(s, self.lowercase, true)),
            _ => Err(IndexError::WrongArgType {
                pos: 0,
                want: "string",
            }),
        }
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match one_arg(args)? {
            IndexArg::Str(s) => Ok(encode_str(s, self.lowercase, false)),
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

/// Indexes a string-map field: one key per entry, encoded as
/// map-key ‖ `0x00` ‖ map-value ‖ `0x00`.
///
/// Lookups take the map key alone (all entries under that key) or the
/// key-value pair (the exact entry).
pub struct StringMapFieldIndex<T> {
    get: Box<dyn Fn(&T) -> Vec<(String, String)> + Send + Sync>,
    lowercase: bool,
}

impl<T> StringMapFieldIndex<T> {
    pub fn new(get: impl Fn(&T) -> Vec<(String, String)> + Send + Sync + 'static) -> Self {
        Self {
            get: Box::new(get),
            lowercase: false,
        }
    }

    /// Folds keys and values (and query arguments) to lower case.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }
}

impl<T: 'static> MultiIndex for StringMapFieldIndex<T> {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<Vec<u8>>>, IndexError> {
        let entries = (self.get)(downcast::<T>(obj)?);
        let keys: Vec<Vec<u8>> = entries
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| {
                let mut out = encode_str(k, self.lowercase, true);
                out.extend_from_slice(&encode_str(v, self.lowercase, true));
                out
            })
            .collect();
        Ok(if keys.is_empty() { None } else { Some(keys) })
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        if args.is_empty() || args.len() > 2 {
            return Err(IndexError::WrongArgCount {
                want: 2,
                got: args.len(),
            });
        }
        let mut out = Vec::new();
        for (pos, arg) in args.iter().enumerate() {
            match arg {
                IndexArg::Str(s) => out.extend_from_slice(&encode_str(s, self.lowercase, true)),
                _ => {
                    return Err(IndexError::WrongArgType {
                        pos,
                        want: "string",
                    })
                }
            }
        }
        Ok(out)
    }

    fn terminated(&self) -> bool {
        true
    }
}
