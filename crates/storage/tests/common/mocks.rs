use aifriend_storage::error::{StorageError, StorageResult};
use aifriend_storage::traits::ObjectStore;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory object store.
#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<HashMap<String, Bytes>>,
}

#[allow(dead_code)]
impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn insert(&self, key: &str, data: &'static [u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), Bytes::from_static(data));
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Ok(false);
        }
        objects.insert(key.to_string(), data);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Wraps a backend and injects write/delete failures on demand.
pub struct FlakyBackend {
    inner: Arc<dyn ObjectStore>,
    fail_writes_after: AtomicUsize,
    fail_deletes: AtomicBool,
    pub writes: AtomicUsize,
    pub collisions: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyBackend {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_writes_after: AtomicUsize::new(usize::MAX),
            fail_deletes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            collisions: AtomicUsize::new(0),
        })
    }

    /// Let `n` more writes succeed, then fail every write.
    pub fn fail_writes_after(&self, n: usize) {
        let done = self.writes.load(Ordering::SeqCst);
        self.fail_writes_after.store(done + n, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Report the next `n` writes as name collisions.
    pub fn collide_next(&self, n: usize) {
        self.collisions.store(n, Ordering::SeqCst);
    }

    fn check_write(&self) -> StorageResult<()> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.fail_writes_after.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "injected write failure",
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FlakyBackend {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool> {
        let pending = self.collisions.load(Ordering::SeqCst);
        if pending > 0 {
            self.collisions.store(pending - 1, Ordering::SeqCst);
            return Ok(false);
        }
        self.check_write()?;
        self.inner.put_if_not_exists(key, data).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other(
                "injected delete failure",
            )));
        }
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
