//! Per-category subcategory vocabulary.
//!
//! The registry is persisted under its own key, independently of the task
//! collection. Names can only be added; there is no rename or delete.

use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::fields::Category;
use crate::storage::{load_record, save_record, KeyValueStore, SUBCATEGORIES_KEY};

pub struct SubcategoryRegistry<S: KeyValueStore> {
    map: BTreeMap<Category, Vec<String>>,
    storage: S,
}

impl<S: KeyValueStore> SubcategoryRegistry<S> {
    /// Load the map, starting every category empty if nothing was stored yet.
    pub fn load(storage: S) -> Result<Self, StorageError> {
        let mut map: BTreeMap<Category, Vec<String>> =
            load_record(&storage, SUBCATEGORIES_KEY)?.unwrap_or_default();
        for category in Category::ALL {
            map.entry(category).or_default();
        }
        tracing::debug!(
            entries = map.values().map(Vec::len).sum::<usize>(),
            "subcategory registry loaded"
        );
        Ok(SubcategoryRegistry { map, storage })
    }

    /// Subcategories registered under `category`, in insertion order.
    pub fn subcategories(&self, category: Category) -> &[String] {
        self.map.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Register `name` under `category`.
    ///
    /// Returns `Ok(false)` without writing when the name is blank or already
    /// registered for that category.
    pub fn register(&mut self, category: Category, name: &str) -> Result<bool, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(false);
        }
        let entries = self.map.entry(category).or_default();
        if entries.iter().any(|s| s == name) {
            tracing::debug!(%category, name, "subcategory already registered");
            return Ok(false);
        }
        entries.push(name.to_string());
        save_record(&mut self.storage, SUBCATEGORIES_KEY, &self.map)?;
        tracing::info!(%category, name, "subcategory registered");
        Ok(true)
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}
