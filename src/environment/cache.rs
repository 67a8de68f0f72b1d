// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::Result;
use crate::value::Value;

use core::cell::{Cell, RefCell};
use std::collections::HashMap;

use log::debug;

/// Memo table of one evaluation pass, keyed by canonical expression text.
///
/// Failures are memoized too. Interior mutability makes the cache `!Sync`:
/// it cannot be shared between threads evaluating concurrently.
#[derive(Debug, Default)]
pub struct EvalCache {
    entries: RefCell<HashMap<String, Result<Value>>>,
    misses: Cell<usize>,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized outcome for `key`, invoking `resolve` only when
    /// the key has never been seen.
    pub fn get_or_insert_with<F>(&self, key: &str, resolve: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        if let Some(entry) = self.entries.borrow().get(key) {
            debug!("cache hit: {key}");
            return entry.clone();
        }

        // The borrow is released while resolving; a resolver may itself
        // consult the cache for a nested call.
        debug!("cache miss: {key}");
        self.misses.set(self.misses.get() + 1);
        let outcome = resolve();
        self.entries
            .borrow_mut()
            .entry(key.to_string())
            .or_insert(outcome)
            .clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times a resolver was invoked.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }
}
