//! Blob map behind a single reader/writer lock
//!
//! Readers (`get`) proceed concurrently; writers (`put`) are exclusive.
//! Concurrent writes to one ID resolve last-writer-wins. There is no size
//! limit and no eviction: memory grows with every distinct ID stored.

use std::collections::HashMap;
use std::sync::Arc;

use sealpost_core::{SealpostError, SealpostResult};
use tokio::sync::RwLock;
use tracing::debug;

/// Change in store size caused by one `put`.
///
/// Deltas from concurrent writers commute, so applying them in any order
/// converges on the true totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeDelta {
    pub blobs: i64,
    pub bytes: i64,
}

/// Cheaply clonable handle to one store. Clones share the same map;
/// separate `BlobStore::new()` calls are fully independent.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `id`, replacing any existing blob. Returns how the
    /// blob count and byte total changed, measured under the write lock.
    pub async fn put(&self, id: impl Into<String>, data: Vec<u8>) -> SizeDelta {
        let id = id.into();
        let bytes = data.len();
        let previous = self.blobs.write().await.insert(id.clone(), data);
        debug!(id = %id, bytes, replaced = previous.is_some(), "blob stored");

        match previous {
            Some(old) => SizeDelta {
                blobs: 0,
                bytes: bytes as i64 - old.len() as i64,
            },
            None => SizeDelta {
                blobs: 1,
                bytes: bytes as i64,
            },
        }
    }

    /// Copy of the blob under `id`.
    pub async fn get(&self, id: &str) -> SealpostResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SealpostError::NotFound(id.to_string()))
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.blobs.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Sum of all stored blob sizes
    pub async fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .await
            .values()
            .map(|b| b.len() as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = BlobStore::new();
        store.put("id1", vec![1, 2, 3]).await;

        assert_eq!(store.get("id1").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = BlobStore::new();
        let err = store.get("missing").await.unwrap_err();

        assert!(matches!(err, SealpostError::NotFound(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = BlobStore::new();
        store.put("id1", vec![1]).await;
        store.put("id1", vec![2, 2]).await;

        assert_eq!(store.get("id1").await.unwrap(), vec![2, 2]);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.total_bytes().await, 2);
    }

    #[tokio::test]
    async fn test_put_reports_size_delta() {
        let store = BlobStore::new();

        assert_eq!(store.put("a", vec![0; 3]).await, SizeDelta { blobs: 1, bytes: 3 });
        assert_eq!(store.put("a", vec![0; 5]).await, SizeDelta { blobs: 0, bytes: 2 });
        assert_eq!(store.put("a", vec![0; 1]).await, SizeDelta { blobs: 0, bytes: -4 });
        assert_eq!(store.put("b", vec![]).await, SizeDelta { blobs: 1, bytes: 0 });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deltas_sum_to_totals() {
        let store = BlobStore::new();
        let mut handles = Vec::new();
        for i in 0..48usize {
            let store = store.clone();
            // Eight IDs, each overwritten six times with varying sizes
            handles.push(tokio::spawn(async move {
                store.put(format!("blob-{}", i % 8), vec![0; i]).await
            }));
        }

        let mut blobs = 0i64;
        let mut bytes = 0i64;
        for h in handles {
            let delta = h.await.unwrap();
            blobs += delta.blobs;
            bytes += delta.bytes;
        }

        assert_eq!(blobs, store.len().await as i64);
        assert_eq!(bytes, store.total_bytes().await as i64);
    }

    #[tokio::test]
    async fn test_get_is_non_destructive() {
        let store = BlobStore::new();
        store.put("id1", vec![9; 4]).await;

        for _ in 0..3 {
            assert_eq!(store.get("id1").await.unwrap(), vec![9; 4]);
        }
        assert!(store.contains("id1").await);
    }

    #[tokio::test]
    async fn test_get_returns_copy() {
        let store = BlobStore::new();
        store.put("id1", vec![1, 2, 3]).await;

        let mut copy = store.get("id1").await.unwrap();
        copy[0] = 0xFF;

        assert_eq!(store.get("id1").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_independent_stores() {
        let a = BlobStore::new();
        let b = BlobStore::new();
        a.put("shared-name", vec![1]).await;

        assert!(b.get("shared-name").await.is_err());
        assert!(b.is_empty().await);

        // Clones share the map
        let a2 = a.clone();
        assert_eq!(a2.get("shared-name").await.unwrap(), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_distinct_ids() {
        let store = BlobStore::new();
        let mut handles = Vec::new();
        for i in 0..64u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(format!("blob-{i}"), i.to_be_bytes().to_vec()).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.len().await, 64);
        for i in 0..64u32 {
            assert_eq!(
                store.get(&format!("blob-{i}")).await.unwrap(),
                i.to_be_bytes().to_vec()
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_same_id() {
        let store = BlobStore::new();
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put("contended", vec![i; 8]).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Exactly one writer wins, and its value is intact
        let value = store.get("contended").await.unwrap();
        assert_eq!(value.len(), 8);
        assert!(value.iter().all(|b| *b == value[0]));
        assert_eq!(store.len().await, 1);
    }
}
