//! Durable storage for cadence configuration
//!
//! Cadence parameters are the only engine state that survives a reset.
//! [`PersistentStore`] is the narrow seam to whatever the platform offers
//! (NVRAM, flash KV, filesystem); [`CadenceStore`] is the adapter that maps
//! sensor identities to stable keys and runs the fixed binary codec.
//!
//! Persistence failures are never fatal: a failed or corrupt load leaves
//! the compiled-in default config in place, and a failed save is reported
//! while the in-memory config stays authoritative for the session.

use crate::{
    cadence::{CadenceConfig, ENCODED_LEN},
    errors::StorageError,
    sensors::SensorId,
};

/// Stable storage key for one durable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreKey(pub u16);

/// First key reserved for cadence records
const CADENCE_KEY_BASE: u16 = 0x0200;

/// Key stride between per-sensor cadence records
const CADENCE_KEY_STRIDE: u16 = 0x0018;

/// Storage key of the cadence record for a sensor
pub fn cadence_key(id: SensorId) -> StoreKey {
    StoreKey(CADENCE_KEY_BASE + id.0 as u16 * CADENCE_KEY_STRIDE)
}

/// Platform key-value store seam
///
/// Calls are synchronous and expected to be fast; all failures map to
/// [`StorageError`] and degrade per the module contract.
pub trait PersistentStore {
    /// Read the record at `key` into `buf`; `Ok(None)` when absent
    fn load(&mut self, key: StoreKey, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    /// Write a record, replacing any previous value; returns bytes written
    fn save(&mut self, key: StoreKey, data: &[u8]) -> Result<usize, StorageError>;

    /// Remove the record at `key`; removing an absent key is not an error
    fn delete(&mut self, key: StoreKey) -> Result<(), StorageError>;
}

/// Maximum record size the in-memory store accepts
pub const MEMORY_STORE_RECORD_LEN: usize = 64;

/// Maximum number of records in the in-memory store (power of two)
pub const MEMORY_STORE_CAPACITY: usize = 8;

/// RAM-backed store: heapless, no_std, loses contents on reset
///
/// Useful for tests and as a fallback when the platform store is absent.
#[derive(Default)]
pub struct MemoryStore {
    records: heapless::FnvIndexMap<
        u16,
        heapless::Vec<u8, MEMORY_STORE_RECORD_LEN>,
        MEMORY_STORE_CAPACITY,
    >,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn load(&mut self, key: StoreKey, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        match self.records.get(&key.0) {
            None => Ok(None),
            Some(record) => {
                if record.len() > buf.len() {
                    return Err(StorageError::ReadFailed);
                }
                buf[..record.len()].copy_from_slice(record);
                Ok(Some(record.len()))
            }
        }
    }

    fn save(&mut self, key: StoreKey, data: &[u8]) -> Result<usize, StorageError> {
        let record =
            heapless::Vec::from_slice(data).map_err(|_| StorageError::WriteFailed)?;
        // Replacing an existing record never fails; only new keys can hit
        // the capacity limit.
        match self.records.insert(key.0, record) {
            Ok(_) => Ok(data.len()),
            Err(_) => Err(StorageError::Full),
        }
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StorageError> {
        self.records.remove(&key.0);
        Ok(())
    }
}

/// File-backed store: one file per key under a directory (std only)
#[cfg(feature = "std")]
pub struct FileStore {
    dir: std::path::PathBuf,
}

#[cfg(feature = "std")]
impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|_| StorageError::WriteFailed)?;
        Ok(Self { dir })
    }

    fn path(&self, key: StoreKey) -> std::path::PathBuf {
        self.dir.join(format!("{:04x}.bin", key.0))
    }
}

#[cfg(feature = "std")]
impl PersistentStore for FileStore {
    fn load(&mut self, key: StoreKey, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        match std::fs::read(self.path(key)) {
            Ok(data) => {
                if data.len() > buf.len() {
                    return Err(StorageError::ReadFailed);
                }
                buf[..data.len()].copy_from_slice(&data);
                Ok(Some(data.len()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(_) => Err(StorageError::ReadFailed),
        }
    }

    fn save(&mut self, key: StoreKey, data: &[u8]) -> Result<usize, StorageError> {
        std::fs::write(self.path(key), data).map_err(|_| StorageError::WriteFailed)?;
        Ok(data.len())
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(_) => Err(StorageError::DeleteFailed),
        }
    }
}

/// Persistence adapter: cadence records keyed by sensor identity
pub struct CadenceStore<P: PersistentStore> {
    store: P,
}

impl<P: PersistentStore> CadenceStore<P> {
    /// Wrap a platform store
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Restore the cadence config for a sensor
    ///
    /// `Ok(None)` when no record exists. A record that exists but does not
    /// decode is `StorageError::Corrupt` — the caller falls back to the
    /// default config either way.
    pub fn load(&mut self, id: SensorId) -> Result<Option<CadenceConfig>, StorageError> {
        let mut buf = [0u8; ENCODED_LEN];
        match self.store.load(cadence_key(id), &mut buf)? {
            None => Ok(None),
            Some(len) if len == ENCODED_LEN => {
                CadenceConfig::from_bytes(&buf)
                    .map(Some)
                    .ok_or(StorageError::Corrupt)
            }
            Some(_) => Err(StorageError::Corrupt),
        }
    }

    /// Persist the cadence config for a sensor; returns bytes written
    pub fn save(&mut self, id: SensorId, config: &CadenceConfig) -> Result<usize, StorageError> {
        self.store.save(cadence_key(id), &config.to_bytes())
    }

    /// Remove the persisted record for a sensor
    pub fn delete(&mut self, id: SensorId) -> Result<(), StorageError> {
        self.store.delete(cadence_key(id))
    }
}
