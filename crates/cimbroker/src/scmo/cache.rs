// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared cache of compact class definitions.
//!
//! Classes are keyed by case-folded `(namespace, class name)` and built at
//! most once: lookups peek under the read lock, then re-check under the
//! write lock before invoking the [`ClassLoader`]. Failed loads are cached
//! too, so a missing class costs one loader call until it is evicted.

use super::{CompactClass, ScmoError};
use crate::cim::name::fold_name;
use crate::cim::CimClass;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of class definitions (typically the repository).
pub trait ClassLoader: Send + Sync {
    fn load_class(&self, namespace: &str, class_name: &str) -> Option<CimClass>;
}

impl<F> ClassLoader for F
where
    F: Fn(&str, &str) -> Option<CimClass> + Send + Sync,
{
    fn load_class(&self, namespace: &str, class_name: &str) -> Option<CimClass> {
        self(namespace, class_name)
    }
}

type ClassKey = (String, String);

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loader invocations that produced a class.
    pub loads: u64,
    /// Loader invocations that produced nothing.
    pub failures: u64,
}

pub struct ClassCache {
    loader: Box<dyn ClassLoader>,
    entries: RwLock<HashMap<ClassKey, Option<Arc<CompactClass>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
}

impl ClassCache {
    pub fn new(loader: impl ClassLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn key(namespace: &str, class_name: &str) -> ClassKey {
        (fold_name(namespace), fold_name(class_name))
    }

    /// Compact class for `(namespace, class_name)`, loading it on first use.
    ///
    /// Concurrent callers for the same key observe a single loader call and
    /// share the resulting `Arc`.
    pub fn get(&self, namespace: &str, class_name: &str) -> Result<Arc<CompactClass>, ScmoError> {
        let key = Self::key(namespace, class_name);

        if let Some(entry) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.clone().ok_or(ScmoError::ClassNotFound);
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.clone().ok_or(ScmoError::ClassNotFound);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let loaded = self
            .loader
            .load_class(namespace, class_name)
            .map(|class| Arc::new(CompactClass::from_class(&class, namespace)));
        match &loaded {
            Some(_) => {
                self.loads.fetch_add(1, Ordering::Relaxed);
                log::debug!("[scmo] class cache loaded {}:{}", namespace, class_name);
            }
            None => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::debug!("[scmo] class cache miss {}:{} (no definition)", namespace, class_name);
            }
        }
        entries.insert(key, loaded.clone());
        loaded.ok_or(ScmoError::ClassNotFound)
    }

    /// Cached entry without invoking the loader.
    pub fn peek(&self, namespace: &str, class_name: &str) -> Option<Arc<CompactClass>> {
        self.entries
            .read()
            .get(&Self::key(namespace, class_name))
            .cloned()
            .flatten()
    }

    /// Drop one entry (positive or negative); returns whether it existed.
    pub fn remove(&self, namespace: &str, class_name: &str) -> bool {
        self.entries
            .write()
            .remove(&Self::key(namespace, class_name))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ClassCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassCache")
            .field("entries", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cim::{CimType, CimValue, Property};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting_loader(calls: Arc<AtomicUsize>) -> impl ClassLoader {
        move |_ns: &str, class: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            if class.eq_ignore_ascii_case("CIM_Missing") {
                return None;
            }
            CimClass::new(class)
                .with_property(Property::new("Name", CimValue::null(CimType::String, false)))
                .ok()
        }
    }

    #[test]
    fn test_single_load_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ClassCache::new(counting_loader(Arc::clone(&calls)));

        let a = cache.get("root/cimv2", "CIM_Foo").unwrap();
        let b = cache.get("ROOT/CIMV2", "cim_foo").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
    }

    #[test]
    fn test_negative_entries_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ClassCache::new(counting_loader(Arc::clone(&calls)));

        assert!(matches!(cache.get("root", "CIM_Missing"), Err(ScmoError::ClassNotFound)));
        assert!(matches!(cache.get("root", "CIM_Missing"), Err(ScmoError::ClassNotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().failures, 1);

        assert!(cache.remove("root", "CIM_Missing"));
        assert!(cache.get("root", "CIM_Missing").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_get_shares_class() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(ClassCache::new(counting_loader(Arc::clone(&calls))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get("root/cimv2", "CIM_Shared").unwrap())
            })
            .collect();
        let classes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(classes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_clear_and_peek() {
        let cache = ClassCache::new(counting_loader(Arc::new(AtomicUsize::new(0))));
        assert!(cache.peek("root", "CIM_Foo").is_none());
        cache.get("root", "CIM_Foo").unwrap();
        assert!(cache.peek("root", "cim_foo").is_some());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
