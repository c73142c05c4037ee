//! File-based field persistence for CLI runs.

use std::fs;
use std::io;
use std::path::PathBuf;

use screenswap::FieldStore;
use screenswap::store::{decode_entry, encode_entry};
use serde_json::Value;

/// One `<key>.json` file per field below a state directory.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            log::error!("field key '{key}' cannot be used as a file name");
            return None;
        }
        Some(self.base_path.join(format!("{key}.json")))
    }

    pub fn keys(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|extension| extension != "json") {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                keys.push(stem.to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        let Some(path) = self.path(key) else {
            return Ok(());
        };
        fs::create_dir_all(&self.base_path)?;
        fs::write(path, value)
    }

    fn remove_all(&self) -> io::Result<()> {
        for key in self.keys()? {
            if let Some(path) = self.path(&key) {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

impl FieldStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        let path = self.path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => decode_entry(key, &text),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                log::error!("failed to read {}: {error}", path.display());
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) {
        if let Err(error) = self.save(key, &encode_entry(&value)) {
            log::error!("failed to save field '{key}': {error}");
        }
    }

    fn clear_all(&self) {
        if let Err(error) = self.remove_all() {
            log::error!("failed to clear {}: {error}", self.base_path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenswap::FieldStoreExt;
    use serde_json::json;

    #[test]
    fn fields_persist_as_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));
        assert_eq!(store.keys().unwrap(), Vec::<String>::new());

        store.set("eventType", json!("concert"));
        store.set_as("eventTags", &["Music"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("state/eventType.json")).unwrap(),
            "\"concert\""
        );

        let reopened = FileStore::new(dir.path().join("state"));
        assert_eq!(reopened.get("eventType"), Some(json!("concert")));
        assert_eq!(reopened.keys().unwrap(), ["eventTags", "eventType"]);

        reopened.clear_all();
        assert_eq!(store.get("eventTags"), None);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn unsafe_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store.set("../escape", json!(1));
        assert_eq!(store.get("../escape"), None);
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert_eq!(store.get("broken"), None);
    }
}
