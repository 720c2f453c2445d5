//! Caller-side LRU cache over a [`Database`]
//!
//! The database itself never caches: its buffer is immutable and a lookup is
//! a handful of bounds-checked reads. Callers that see the same addresses
//! repeatedly (request middleware, log enrichment) can wrap it in a
//! [`CachedDatabase`] to skip the record assembly.
//!
//! Only successful lookups are cached, including "not found". Errors are
//! returned every time.

use crate::database::{Database, LookupResult};
use crate::error::LookupError;
use crate::records::{GeoRecord, Record};
use lru::LruCache;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Cache hit and miss counters
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: AtomicU64,
    /// Lookups that went to the database
    pub misses: AtomicU64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// A database with an LRU cache of lookup results keyed by address
#[derive(Debug)]
pub struct CachedDatabase {
    db: Database,
    cache: Option<Mutex<LruCache<IpAddr, Option<LookupResult>>>>,
    stats: CacheStats,
}

impl CachedDatabase {
    /// Wrap `db` with a cache of `capacity` entries; 0 disables caching
    pub fn new(db: Database, capacity: usize) -> Self {
        Self {
            db,
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            stats: CacheStats::default(),
        }
    }

    /// The wrapped database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Hit and miss counters
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.cache
            .as_ref()
            .map(|cache| cache.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Cached [`Database::lookup_entry`]
    pub fn lookup_entry(&self, ip: IpAddr) -> Result<Option<LookupResult>, LookupError> {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return self.db.lookup_entry(ip),
        };

        if let Some(hit) = cache.lock().unwrap_or_else(PoisonError::into_inner).get(&ip) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        // Decode outside the lock; concurrent misses on one address both decode
        let entry = self.db.lookup_entry(ip)?;
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(ip, entry.clone());
        Ok(entry)
    }

    /// Cached [`Database::lookup`]
    pub fn lookup(&self, ip: IpAddr) -> Result<Option<Record>, LookupError> {
        Ok(self.lookup_entry(ip)?.map(|entry| entry.record))
    }

    /// Cached [`Database::lookup_as`]
    pub fn lookup_as<T: GeoRecord>(&self, ip: IpAddr) -> Result<Option<T>, LookupError> {
        if self.db.kind() != Some(T::KIND) {
            return Err(LookupError::KindMismatch {
                requested: T::KIND,
                actual: self.db.metadata().database_type.clone(),
            });
        }
        Ok(self.lookup(ip)?.and_then(T::from_record))
    }
}
