use screenswap::FieldStore;
use serde_json::Value;
use zoon::{WebStorage, session_storage};

/// Field values kept in `sessionStorage` for the lifetime of the tab.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStore;

impl FieldStore for SessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        match session_storage().get(key) {
            None => None,
            Some(Ok(value)) => Some(value),
            Some(Err(error)) => {
                zoon::eprintln!("Failed to read field '{key}': {error:#}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) {
        if let Err(error) = session_storage().insert(key, &value) {
            zoon::eprintln!("Failed to save field '{key}': {error:#}");
        }
    }

    fn clear_all(&self) {
        if let Err(error) = session_storage().clear() {
            zoon::eprintln!("Failed to clear session storage: {error:#}");
        }
    }
}
