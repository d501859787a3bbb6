//! Deterministic stand-ins for the registration environment.

use crate::draft_store::{KeyValueStorage, StorageError};
use crate::ticket::{BarcodeSource, BarcodeValue};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Always returns the same identifier
#[derive(Clone, Debug)]
pub struct FixedBarcodeSource {
    value: BarcodeValue,
}

impl FixedBarcodeSource {
    /// Source that always yields `value`
    #[must_use]
    pub const fn new(value: BarcodeValue) -> Self {
        Self { value }
    }
}

impl BarcodeSource for FixedBarcodeSource {
    fn next_value(&self) -> BarcodeValue {
        self.value.clone()
    }
}

/// Yields queued identifiers in order, then repeats the last one
#[derive(Debug)]
pub struct ScriptedBarcodeSource {
    queue: Mutex<VecDeque<BarcodeValue>>,
    last: BarcodeValue,
}

impl ScriptedBarcodeSource {
    /// Source over `values`; falls back to the minimum identifier when empty
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = BarcodeValue>) -> Self {
        let queue: VecDeque<_> = values.into_iter().collect();
        let last = queue.back().cloned().unwrap_or_else(BarcodeValue::lowest);
        Self {
            queue: Mutex::new(queue),
            last,
        }
    }
}

impl BarcodeSource for ScriptedBarcodeSource {
    fn next_value(&self) -> BarcodeValue {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| self.last.clone())
    }
}

/// Storage whose every operation fails
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingStorage;

impl KeyValueStorage for FailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage disabled".to_string()))
    }
}
