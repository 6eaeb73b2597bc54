#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kvdoc::{
    memory::InMemoryKv,
    prelude::*,
};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

/// Wraps the in-memory store, counting calls and failing chosen operations.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryKv,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    scans: AtomicUsize,
    failing_deletes: Mutex<HashSet<String>>,
    failing_gets: AtomicBool,
    failing_scans: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_gets(&self) {
        self.failing_gets.store(true, Ordering::SeqCst);
    }

    pub fn fail_scans(&self) {
        self.failing_scans.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.gets() + self.sets() + self.deletes() + self.scans()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KvStore for CountingStore {
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        if self.failing_gets.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend(format!("get of {key} refused")));
        }

        self.inner.get(key).await
    }

    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &Key) -> DocumentStoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);

        let failing = key
            .last()
            .is_some_and(|id| self.failing_deletes.lock().unwrap().contains(id));

        if failing {
            return Err(DocumentStoreError::Backend(format!("delete of {key} refused")));
        }

        self.inner.delete(key).await
    }

    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>> {
        self.scans.fetch_add(1, Ordering::SeqCst);

        if self.failing_scans.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend(format!("scan of {prefix} refused")));
        }

        self.inner.scan(prefix).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }
}

impl FixedClock {
    pub fn bson(&self) -> Bson {
        Bson::DateTime(bson::DateTime::from_millis(self.0.timestamp_millis()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A store over an instrumented backend with a fixed clock.
pub fn counting_store(
    relations: RelationRegistry,
) -> (DocumentStore<Arc<CountingStore>>, Arc<CountingStore>) {
    let backend = CountingStore::new();
    let store = DocumentStore::builder(backend.clone())
        .relations(relations)
        .clock(FixedClock::default())
        .build()
        .unwrap();

    (store, backend)
}

pub fn memory_store() -> DocumentStore<InMemoryKv> {
    DocumentStore::builder(InMemoryKv::new())
        .clock(FixedClock::default())
        .build()
        .unwrap()
}

pub fn id_of(record: &Record) -> String {
    record_id(record).unwrap().to_string()
}
