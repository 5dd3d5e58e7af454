use anyhow::{Result, anyhow};
use gloo_storage::Storage as _;

use super::Storage;

/// `window.localStorage`, origin-scoped and persistent across reloads.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    raw: web_sys::Storage,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            raw: gloo_storage::LocalStorage::raw(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.raw.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Reading {key} from local storage failed: {e:?}");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.raw
            .set_item(key, value)
            .map_err(|e| anyhow!("writing {key} to local storage: {e:?}"))
    }

    fn remove_item(&self, key: &str) {
        if let Err(e) = self.raw.remove_item(key) {
            tracing::warn!("Removing {key} from local storage failed: {e:?}");
        }
    }
}
