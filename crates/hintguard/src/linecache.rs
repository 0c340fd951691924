//! Sources of generated wrappers, keyed by their synthetic filename.
//!
//! Mirrors what `linecache.cache` holds for generated code: debuggers and
//! tracebacks look a wrapper's filename up here to show its source.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use ahash::AHashMap;

static CACHE: LazyLock<RwLock<AHashMap<String, Arc<str>>>> = LazyLock::new(Default::default);

/// Registers (or replaces) the source of `filename`.
pub fn register(filename: &str, source: &str) {
    CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(filename.to_owned(), Arc::from(source));
}

/// The full source registered for `filename`.
#[must_use]
pub fn lookup(filename: &str) -> Option<Arc<str>> {
    CACHE.read().unwrap_or_else(PoisonError::into_inner).get(filename).cloned()
}

/// `linecache.getline`: the 1-based line `lineno` of `filename`, or `None`.
#[must_use]
pub fn getline(filename: &str, lineno: usize) -> Option<String> {
    let source = lookup(filename)?;
    source.lines().nth(lineno.checked_sub(1)?).map(str::to_owned)
}

/// Drops the source of `filename`.
pub fn forget(filename: &str) {
    CACHE.write().unwrap_or_else(PoisonError::into_inner).remove(filename);
}
