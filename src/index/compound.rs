// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Compound indexers: concatenated sub-encodings and their Cartesian
//! products.

use super::error::IndexError;
use super::{AnyObject, IndexArg, Indexer, MultiIndex, SingleIndex};

/// Concatenates single-valued sub-indexers in declared order.
///
/// With `allow_missing`, extraction truncates at the first sub-indexer
/// that yields nothing and emits the (shorter) key built so far; without
/// it, a missing component omits the object from the index.
pub struct CompoundIndex {
    indexes: Vec<Box<dyn SingleIndex>>,
    allow_missing: bool,
}

impl CompoundIndex {
    pub fn new(indexes: Vec<Box<dyn SingleIndex>>) -> Self {
        Self {
            indexes,
            allow_missing: false,
        }
    }

    /// Permits truncated keys when a suffix component is missing.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }
}

impl SingleIndex for CompoundIndex {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        let mut out = Vec::new();
        for index in &self.indexes {
            match index.from_object(obj)? {
                Some(key) => out.extend_from_slice(&key),
                None if self.allow_missing => break,
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        if args.len() != self.indexes.len() {
            return Err(IndexError::WrongArgCount {
                want: self.indexes.len(),
                got: args.len(),
            });
        }
        let mut out = Vec::new();
        for (index, arg) in self.indexes.iter().zip(args) {
            out.extend_from_slice(&index.from_args(std::slice::from_ref(arg))?);
        }
        Ok(out)
    }

    /// Exact encodings for all but the last supplied argument, prefix
    /// encoding for the last. Fewer arguments than components are allowed.
    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        if args.len() > self.indexes.len() {
            return Err(IndexError::WrongArgCount {
                want: self.indexes.len(),
                got: args.len(),
            });
        }
        let mut out = Vec::new();
        for (pos, (index, arg)) in self.indexes.iter().zip(args).enumerate() {
            let part = if pos == args.len() - 1 {
                index.prefix_from_args(std::slice::from_ref(arg))?
            } else {
                index.from_args(std::slice::from_ref(arg))?
            };
            out.extend_from_slice(&part);
        }
        Ok(out)
    }

    fn terminated(&self) -> bool {
        self.indexes.last().is_some_and(|index| index.terminated())
    }
}

/// Cartesian product of sub-indexers, each of which may emit several keys.
///
/// The emitted set is the flattened product in declared order, so two
/// objects differing in any component produce disjoint key sets.
pub struct CompoundMultiIndex {
    indexes: Vec<Indexer>,
    allow_missing: bool,
}

impl CompoundMultiIndex {
    pub fn new(indexes: Vec<Indexer>) -> Self {
        Self {
            indexes,
            allow_missing: false,
        }
    }

    /// Permits truncated keys when a suffix component is missing.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }
}

impl MultiIndex for CompoundMultiIndex {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<Vec<u8>>>, IndexError> {
        let mut acc: Vec<Vec<u8>> = vec![Vec::new()];
        for index in &self.indexes {
            match index.keys_from_object(obj)? {
                Some(parts) => {
                    let mut next = Vec::with_capacity(acc.len() * parts.len());
                    for prefix in &acc {
                        for part in &parts {
                            let mut key = prefix.clone();
                            key.extend_from_slice(part);
                            next.push(key);
                        }
                    }
                    acc = next;
                }
                None if self.allow_missing => break,
                None => return Ok(None),
            }
        }
        Ok(Some(acc))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        if args.len() != self.indexes.len() {
            return Err(IndexError::WrongArgCount {
                want: self.indexes.len(),
                got: args.len(),
            });
        }
        let mut out = Vec::new();
        for (index, arg) in self.indexes.iter().zip(args) {
            out.extend_from_slice(&index.from_args(std::slice::from_ref(arg))?);
        }
        Ok(out)
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        if args.len() > self.indexes.len() {
            return Err(IndexError::WrongArgCount {
                want: self.indexes.len(),
                got: args.len(),
            });
        }
        let mut out = Vec::new();
        for (pos, (index, arg)) in self.indexes.iter().zip(args).enumerate() {
            let part = if pos == args.len() - 1 {
                index.prefix_from_args(std::slice::from_ref(arg))?
            } else {
                index.from_args(std::slice::from_ref(arg))?
            };
            out.extend_from_slice(&part);
        }
        Ok(out)
    }

    fn terminated(&self) -> bool {
        self.indexes.last().is_some_and(|index| index.terminated())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::super::field::StringFieldIndex;
    use super::super::multi::StringSliceFieldIndex;
    use super::*;

    struct TestObject {
        first: String,
        second: String,
        tags: Vec<String>,
    }

    fn test_obj() -> TestObject {
        TestObject {
            first: "foo".to_string(),
            second: "bar".to_string(),
            tags: vec!["x".to_string(), "y".to_string()],
        }
    }

    fn compound() -> CompoundIndex {
        CompoundIndex::new(vec![
            Box::new(StringFieldIndex::new(|o: &TestObject| Some(o.first.clone()))),
            Box::new(StringFieldIndex::new(|o: &TestObject| {
                Some(o.second.clone())
            })),
        ])
    }

    #[test]
    fn test_compound_from_object() {
        let obj = test_obj();
        let key = compound().from_object(&obj).unwrap().unwrap();
        assert_eq!(key, b"foo\x00bar\x00");
    }

    #[test]
    fn test_compound_missing_component() {
        let mut obj = test_obj();
        obj.second = String::new();

        // Without allow-missing the object is omitted.
        assert_eq!(compound().from_object(&obj).unwrap(), None);

        // With allow-missing the key truncates after the first component.
        let key = compound().allow_missing().from_object(&obj).unwrap();
        assert_eq!(key.unwrap(), b"foo\x00");
    }

    #[test]
    fn test_compound_from_args() {
        let idx = compound();
        assert!(idx.from_args(&["only-one".into()]).is_err());
        let key = idx.from_args(&["foo".into(), "bar".into()]).unwrap();
        assert_eq!(key, b"foo\x00bar\x00");
    }

    #[test]
    fn test_compound_prefix_from_args() {
        let idx = compound();

        // Full arity: exact first component, prefix last.
        let key = idx.prefix_from_args(&["foo".into(), "ba".into()]).unwrap();
        assert_eq!(key, b"foo\x00ba");

        // Partial arity: prefix over the first component only.
        let key = idx.prefix_from_args(&["fo".into()]).unwrap();
        assert_eq!(key, b"fo");

        assert!(idx
            .prefix_from_args(&["a".into(), "b".into(), "c".into()])
            .is_err());
    }

    #[test]
    fn test_compound_terminated() {
        assert!(compound().terminated());
    }

    fn compound_multi() -> CompoundMultiIndex {
        CompoundMultiIndex::new(vec![
            Indexer::single(StringFieldIndex::new(|o: &TestObject| {
                Some(o.first.clone())
            })),
            Indexer::multi(StringSliceFieldIndex::new(|o: &TestObject| o.tags.clone())),
        ])
    }

    #[test]
    fn test_compound_multi_product() {
        let obj = test_obj();
        let keys = compound_multi().from_object(&obj).unwrap().unwrap();
        assert_eq!(
            keys,
            vec![b"foo\x00x\x00".to_vec(), b"foo\x00y\x00".to_vec()]
        );
    }

    #[test]
    fn test_compound_multi_missing() {
        let mut obj = test_obj();
        obj.tags.clear();
        assert_eq!(compound_multi().from_object(&obj).unwrap(), None);

        let keys = compound_multi()
            .allow_missing()
            .from_object(&obj)
            .unwrap()
            .unwrap();
        assert_eq!(keys, vec![b"foo\x00".to_vec()]);
    }

    #[test]
    fn test_compound_multi_keys_unique() {
        // Distinct component values must never collide after flattening.
        let obj = TestObject {
            first: "a".to_string(),
            second: String::new(),
            tags: vec!["b".to_string(), "bb".to_string(), "c".to_string()],
        };
        let keys = compound_multi().from_object(&obj).unwrap().unwrap();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_compound_multi_from_args() {
        let idx = compound_multi();
        let key = idx.from_args(&["foo".into(), "x".into()]).unwrap();
        assert_eq!(key, b"foo\x00x\x00");

        let key = idx.prefix_from_args(&["foo".into(), "x".into()]).unwrap();
        assert_eq!(key, b"foo\x00x");
    }
}
