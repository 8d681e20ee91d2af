//! Process-local page store for dry runs and tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use changedoc_shared::{ChangeDocError, PageStore, Result};

/// Pages held in a map. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: RwLock<BTreeMap<String, String>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing pages.
    pub fn with_pages<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pages: RwLock::new(
                pages
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, String>>> {
        self.pages
            .read()
            .map_err(|_| ChangeDocError::Store("memory store lock poisoned".into()))
    }
}

impl PageStore for MemoryPageStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn get(&self, page_id: &str) -> Result<Option<String>> {
        Ok(self.read()?.get(page_id).cloned())
    }

    fn put(&self, page_id: &str, content: &str) -> Result<()> {
        self.pages
            .write()
            .map_err(|_| ChangeDocError::Store("memory store lock poisoned".into()))?
            .insert(page_id.to_string(), content.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_and_list() {
        let store = MemoryPageStore::with_pages([("Schema", "# Schema\n")]);
        assert_eq!(store.get("Missing").expect("get"), None);

        store.put("API Reference", "# API\n").expect("put");
        store.put("Schema", "# Schema v2\n").expect("put");

        assert_eq!(store.list().expect("list"), vec!["API Reference", "Schema"]);
        assert_eq!(store.get("Schema").expect("get").as_deref(), Some("# Schema v2\n"));
    }
}
