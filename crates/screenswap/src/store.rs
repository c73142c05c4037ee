//! Session-scoped field persistence used by screen scripts.
//!
//! Values are kept as JSON text, one entry per field key. A failure to read
//! or write an entry is logged and otherwise ignored; screens treat a missing
//! value and an unreadable one the same way.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub trait FieldStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn clear_all(&self);
}

impl<S: FieldStore + ?Sized> FieldStore for &S {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) {
        (**self).set(key, value)
    }

    fn clear_all(&self) {
        (**self).clear_all()
    }
}

impl<S: FieldStore + ?Sized> FieldStore for Rc<S> {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) {
        (**self).set(key, value)
    }

    fn clear_all(&self) {
        (**self).clear_all()
    }
}

/// Typed access on top of any [`FieldStore`].
pub trait FieldStoreExt: FieldStore {
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(error) => {
                log::error!("field '{key}' has an unexpected shape: {error}");
                None
            }
        }
    }

    fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value),
            Err(error) => log::error!("failed to save field '{key}': {error}"),
        }
    }
}

impl<S: FieldStore + ?Sized> FieldStoreExt for S {}

/// Parses a stored entry, logging entries that are not valid JSON.
pub fn decode_entry(key: &str, text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(error) => {
            log::error!("failed to read field '{key}': {error}");
            None
        }
    }
}

/// Serialises a value for storage.
pub fn encode_entry(value: &Value) -> String {
    value.to_string()
}

/// Store that lives as long as the process. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw text under `key`, bypassing JSON encoding.
    pub fn insert_raw(&self, key: impl Into<String>, text: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), text.into());
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl FieldStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let text = self.entries.borrow().get(key).cloned()?;
        decode_entry(key, &text)
    }

    fn set(&self, key: &str, value: Value) {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), encode_entry(&value));
    }

    fn clear_all(&self) {
        self.entries.borrow_mut().clear();
    }
}
