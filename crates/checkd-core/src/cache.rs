//! Memoizing routine cache.
//!
//! Read-heavy, rarely invalidated. Loading happens under the write lock, so a
//! miss is resolved by exactly one loader call even when many requests race on
//! the same not-yet-cached name.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use tracing::debug;

use crate::loader::{LoadError, RoutineLoader};
use crate::routine::CheckRoutine;

/// Cache mapping check names to loaded routines.
pub struct RoutineCache {
    loader: Box<dyn RoutineLoader>,
    routines: RwLock<HashMap<String, Arc<dyn CheckRoutine>>>,
}

impl RoutineCache {
    pub fn new(loader: Box<dyn RoutineLoader>) -> Self {
        Self {
            loader,
            routines: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a check name, loading and memoizing on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn CheckRoutine>, LoadError> {
        if let Some(routine) = self.routines.read().unwrap().get(name) {
            return Ok(Arc::clone(routine));
        }

        let mut routines = self.routines.write().unwrap();
        // Another resolver may have won the race for the write lock.
        if let Some(routine) = routines.get(name) {
            return Ok(Arc::clone(routine));
        }

        let routine = self.loader.load(name)?;
        debug!(check = %name, "routine loaded");
        routines.insert(name.to_string(), Arc::clone(&routine));
        Ok(routine)
    }

    /// Drop the cached entry for `name`, forcing a reload on next resolve.
    ///
    /// Returns whether an entry was present. Never fails.
    pub fn invalidate(&self, name: &str) -> bool {
        self.routines.write().unwrap().remove(name).is_some()
    }

    /// Number of cached routines.
    pub fn len(&self) -> usize {
        self.routines.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticLoader;
    use crate::routine::{CheckContext, CheckResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Loader that counts how many loads actually happened.
    struct CountingLoader {
        inner: StaticLoader,
        loads: Arc<AtomicUsize>,
    }

    impl RoutineLoader for CountingLoader {
        fn load(&self, name: &str) -> Result<Arc<dyn CheckRoutine>, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(name)
        }
    }

    fn noop_routine() -> Arc<dyn CheckRoutine> {
        Arc::new(|ctx: &mut CheckContext, _args: &[String]| -> CheckResult {
            ctx.write_line("OK");
            Ok(())
        })
    }

    fn counting_cache() -> (RoutineCache, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let cache = RoutineCache::new(Box::new(CountingLoader {
            inner: StaticLoader::new().with_routine("demo", noop_routine()),
            loads: Arc::clone(&loads),
        }));
        (cache, loads)
    }

    #[test]
    fn test_resolve_memoizes() {
        let (cache, loads) = counting_cache();

        let first = cache.resolve("demo").expect("first resolve");
        let second = cache.resolve("demo").expect("second resolve");
        assert!(Arc::ptr_eq(&first, &second), "cached handle should be reused");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let (cache, loads) = counting_cache();

        cache.resolve("demo").expect("resolve");
        assert!(cache.invalidate("demo"));
        cache.resolve("demo").expect("resolve after invalidate");
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        assert!(!cache.invalidate("never-cached"));
    }

    #[test]
    fn test_missing_name_surfaces_not_found() {
        let cache = RoutineCache::new(Box::new(StaticLoader::new()));
        assert!(matches!(
            cache.resolve("ghost"),
            Err(LoadError::NotFound { .. })
        ));
        assert!(cache.is_empty());
    }
}
