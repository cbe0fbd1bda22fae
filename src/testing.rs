//! Shared test doubles.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::error::StorageError;
use crate::storage::KeyValueStore;

/// Volatile store that counts its writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a write.
    pub fn with_record(mut self, key: &str, value: &str) -> Self {
        self.records.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.records.get(key).map(String::as_str)
    }

    /// Number of writes performed since construction.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.records.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.records.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_millis(ms: i64) -> Self {
        FixedClock(Utc.timestamp_millis_opt(ms).single().expect("valid timestamp"))
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that moves one second forward each time a UTC timestamp is taken.
#[derive(Debug)]
pub struct TickingClock(AtomicI64);

impl TickingClock {
    pub fn starting_at_millis(ms: i64) -> Self {
        TickingClock(AtomicI64::new(ms))
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).single().expect("valid timestamp")
    }
}

impl Clock for TickingClock {
    fn local(&self) -> DateTime<Local> {
        Self::at(self.0.load(Ordering::SeqCst)).with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        Self::at(self.0.fetch_add(1000, Ordering::SeqCst))
    }
}

/// A store that has nothing stored and rejects every write.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn write(&mut self, key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io {
            key: key.to_string(),
            path: PathBuf::from(format!("{key}.json")),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"),
        })
    }
}
