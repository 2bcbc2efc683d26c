use anyhow::Result;
use async_trait::async_trait;
use rocksdb::{DB, Options};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

const DISPLAY_NAME_KEY: &str = "yd-display-name";

/// Last display name the user chose. A rendering hint only; the profile
/// registry stays the source of truth.
#[async_trait]
pub trait DisplayNameStore: Send + Sync {
    async fn save_display_name(&self, name: &str) -> Result<()>;
    async fn load_display_name(&self) -> Result<Option<String>>;
    async fn clear_display_name(&self) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryDisplayNameStore {
    name: RwLock<Option<String>>,
}

#[async_trait]
impl DisplayNameStore for InMemoryDisplayNameStore {
    async fn save_display_name(&self, name: &str) -> Result<()> {
        *self.name.write().await = Some(name.to_owned());
        Ok(())
    }

    async fn load_display_name(&self) -> Result<Option<String>> {
        Ok(self.name.read().await.clone())
    }

    async fn clear_display_name(&self) -> Result<()> {
        *self.name.write().await = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayNameRecord {
    pub display_name: String,
    pub updated_epoch_ms: u128,
}

pub struct RocksDbDisplayNameStore {
    db: Arc<DB>,
}

impl RocksDbDisplayNameStore {
    pub fn open_default(path: &str) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn load_record(&self) -> Result<Option<DisplayNameRecord>> {
        match self.db.get(DISPLAY_NAME_KEY.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice::<DisplayNameRecord>(&raw)?)),
            None => Ok(None),
        }
    }
}

fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[async_trait]
impl DisplayNameStore for RocksDbDisplayNameStore {
    async fn save_display_name(&self, name: &str) -> Result<()> {
        let record = DisplayNameRecord {
            display_name: name.to_owned(),
            updated_epoch_ms: now_epoch_ms(),
        };
        let value = serde_json::to_vec(&record)?;
        self.db.put(DISPLAY_NAME_KEY.as_bytes(), value)?;
        Ok(())
    }

    async fn load_display_name(&self) -> Result<Option<String>> {
        Ok(self.load_record()?.map(|record| record.display_name))
    }

    async fn clear_display_name(&self) -> Result<()> {
        self.db.delete(DISPLAY_NAME_KEY.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_overwrites_and_clears() {
        let store = InMemoryDisplayNameStore::default();
        assert_eq!(store.load_display_name().await.unwrap(), None);
        store.save_display_name("Ada").await.unwrap();
        store.save_display_name("Grace").await.unwrap();
        assert_eq!(store.load_display_name().await.unwrap().as_deref(), Some("Grace"));
        store.clear_display_name().await.unwrap();
        assert_eq!(store.load_display_name().await.unwrap(), None);
    }

    #[tokio::test]
    async fn rocksdb_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names");
        let path = path.to_str().unwrap();
        {
            let store = RocksDbDisplayNameStore::open_default(path).unwrap();
            store.save_display_name("YD Builder").await.unwrap();
        }
        let store = RocksDbDisplayNameStore::open_default(path).unwrap();
        assert_eq!(store.load_display_name().await.unwrap().as_deref(), Some("YD Builder"));
        assert!(store.load_record().unwrap().unwrap().updated_epoch_ms > 0);
    }
}
