use crate::error::Result;
use dashmap::DashMap;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// IBC denom hash -> base denom, persisted between runs as a JSON object.
#[derive(Debug, Default)]
pub struct AddressCache {
    path: Option<PathBuf>,
    ibc_addresses: DashMap<String, String>,
}

impl AddressCache {
    pub fn in_memory() -> Self {
        AddressCache::default()
    }

    /// Opens the cache file. A missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ibc_addresses = DashMap::new();

        if path.exists() {
            let data = fs::read_to_string(&path)?;
            let entries: BTreeMap<String, String> = serde_json::from_str(&data)?;
            for (hash, base) in entries {
                ibc_addresses.insert(hash, base);
            }
            info!(
                "Loaded {} ibc_addresses from cache {}",
                ibc_addresses.len(),
                path.display()
            );
        }

        Ok(AddressCache {
            path: Some(path),
            ibc_addresses,
        })
    }

    pub fn get(&self, hash: &str) -> Option<String> {
        self.ibc_addresses.get(hash).map(|v| v.value().clone())
    }

    pub fn insert(&self, hash: &str, base_denom: &str) {
        self.ibc_addresses
            .insert(hash.to_string(), base_denom.to_string());
    }

    pub fn len(&self) -> usize {
        self.ibc_addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ibc_addresses.is_empty()
    }

    /// Writes the cache back to its file; no-op for in-memory caches.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let entries: BTreeMap<String, String> = self
            .ibc_addresses
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        debug!("Saved {} ibc_addresses to {}", entries.len(), path.display());
        Ok(())
    }
}
