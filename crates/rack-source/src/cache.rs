//! Time-based cache in front of the sheet fetch.
//!
//! Every search would otherwise download the whole sheet. Entries stay fresh
//! for the configured TTL; an admin refresh drops them early.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rack_core::RawTable;
use tokio::sync::Mutex;

use crate::client::SheetClient;
use crate::error::FetchError;
use crate::sheet::SheetRef;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A cache hit. `is_stale` is set once the entry has outlived the TTL; the
/// value is still returned so callers can choose to use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<V> {
    pub value: V,
    pub is_stale: bool,
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: std::hash::Hash + Eq,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, key: &K) -> Option<Cached<V>> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| Cached {
            value: entry.value.clone(),
            is_stale: entry.stored_at.elapsed() >= self.ttl,
        })
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn remove(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

/// [`SheetClient`] behind a [`TtlCache`], keyed by sheet ID and tab name.
pub struct CachedSheetSource {
    client: SheetClient,
    cache: TtlCache<SheetRef, Arc<RawTable>>,
}

impl CachedSheetSource {
    #[must_use]
    pub fn new(client: SheetClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: TtlCache::new(ttl),
        }
    }

    /// Returns the cached table while fresh, otherwise fetches and caches it.
    ///
    /// A failed fetch leaves any stale entry in place and returns the error.
    ///
    /// # Errors
    ///
    /// See [`SheetClient::fetch`].
    pub async fn fetch(&self, sheet: &SheetRef) -> Result<Arc<RawTable>, FetchError> {
        if let Some(hit) = self.cache.get(sheet).await {
            if !hit.is_stale {
                tracing::debug!(sheet_id = %sheet.sheet_id, "sheet cache hit");
                return Ok(hit.value);
            }
        }

        let table = Arc::new(self.client.fetch_sheet(sheet).await?);
        self.cache.insert(sheet.clone(), Arc::clone(&table)).await;
        Ok(table)
    }

    /// The cached entry for `sheet`, fresh or stale, without touching the network.
    pub async fn cached(&self, sheet: &SheetRef) -> Option<Cached<Arc<RawTable>>> {
        self.cache.get(sheet).await
    }

    /// Drops every cached table so the next read goes to the network.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
        tracing::info!("sheet cache invalidated");
    }
}
