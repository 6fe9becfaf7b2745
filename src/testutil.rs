// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the crate's tests.

use std::sync::Arc;

use crate::db::MemDb;
use crate::index::{
    AnyObject, IndexArg, IndexError, Indexer, SingleIndex, StringFieldIndex,
    StringSliceFieldIndex,
};
use crate::schema::{DbSchema, IndexSchema, TableSchema};
use crate::Object;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestObject {
    pub id: String,
    pub foo: String,
    pub qux: Vec<String>,
}

pub(crate) fn test_obj(id: &str, foo: &str) -> Object {
    Arc::new(TestObject {
        id: id.to_string(),
        foo: foo.to_string(),
        qux: Vec::new(),
    })
}

pub(crate) fn test_obj_qux(id: &str, foo: &str, qux: &[&str]) -> Object {
    Arc::new(TestObject {
        id: id.to_string(),
        foo: foo.to_string(),
        qux: qux.iter().map(|s| s.to_string()).collect(),
    })
}

pub(crate) fn as_test(obj: &Object) -> &TestObject {
    obj.downcast_ref::<TestObject>().expect("test object")
}

/// `main` table: unique string `id`, non-unique `foo`, multi-valued `qux`.
pub(crate) fn test_schema() -> DbSchema {
    DbSchema::new().with_table(
        TableSchema::new("main")
            .with_index(
                IndexSchema::new(
                    "id",
                    Indexer::single(StringFieldIndex::new(|o: &TestObject| Some(o.id.clone()))),
                )
                .unique(),
            )
            .with_index(
                IndexSchema::new(
                    "foo",
                    Indexer::single(StringFieldIndex::new(|o: &TestObject| Some(o.foo.clone()))),
                )
                .allow_missing(),
            )
            .with_index(
                IndexSchema::new(
                    "qux",
                    Indexer::multi(StringSliceFieldIndex::new(|o: &TestObject| o.qux.clone())),
                )
                .allow_missing(),
            ),
    )
}

pub(crate) fn test_db() -> MemDb {
    MemDb::new(test_schema()).expect("valid schema")
}

/// A raw (unterminated) string index over `foo`, as longest-prefix
/// lookups require.
pub(crate) struct RawFooIndex;

impl SingleIndex for RawFooIndex {
    fn from_object(&self, obj: &AnyObject) -> Result<Option<Vec<u8>>, IndexError> {
        let obj = obj
            .downcast_ref::<TestObject>()
            .ok_or(IndexError::WrongObjectType { want: "TestObject" })?;
        Ok(Some(obj.foo.as_bytes().to_vec()))
    }

    fn from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        match args {
            [IndexArg::Str(s)] => Ok(s.as_bytes().to_vec()),
            _ => Err(IndexError::WrongArgCount {
                want: 1,
                got: args.len(),
            }),
        }
    }

    fn prefix_from_args(&self, args: &[IndexArg]) -> Result<Vec<u8>, IndexError> {
        self.from_args(args)
    }
}
