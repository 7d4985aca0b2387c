//! Best-score persistence seam.
//!
//! The engine only needs a tiny integer key-value store. Implementations are
//! best-effort: a store that cannot read returns `None` (the engine then starts
//! from 0) and a store that cannot write keeps going without failing the move.

use std::collections::HashMap;

/// Integer key-value store used for the best score.
pub trait ScoreStore {
    /// Read an integer; `None` when the key is absent or unreadable.
    fn get_integer(&self, key: &str) -> Option<u64>;

    /// Write an integer. Failures are handled by the implementation.
    fn set_integer(&mut self, key: &str, value: u64);
}

/// Process-local store. Default collaborator of the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value.
    pub fn with_value(key: &str, value: u64) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value);
        store
    }
}

impl ScoreStore for MemoryStore {
    fn get_integer(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    fn set_integer(&mut self, key: &str, value: u64) {
        self.values.insert(key.to_string(), value);
    }
}

impl<S: ScoreStore + ?Sized> ScoreStore for Box<S> {
    fn get_integer(&self, key: &str) -> Option<u64> {
        (**self).get_integer(key)
    }

    fn set_integer(&mut self, key: &str, value: u64) {
        (**self).set_integer(key, value)
    }
}
