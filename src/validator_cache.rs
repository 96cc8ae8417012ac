//! # Schema Validator Cache Module
//!
//! Thread-safe caching of compiled JSON Schema validators so that request and response
//! validation never compiles a schema on the hot path.
//!
//! ## Overview
//!
//! Compiling a JSON Schema is far more expensive than running it. Routes declare at most
//! three schemas each, and those schemas never change after startup, so every distinct
//! schema is compiled once and the compiled validator is shared through an `Arc`.
//!
//! ## Cache Key
//!
//! The key is the schema's compact JSON serialization, so two routes declaring the same
//! schema document share one entry.
//!
//! ## Thread Safety
//!
//! The cache is an `Arc<RwLock<HashMap>>`:
//! - lookups take the read lock only
//! - a miss compiles outside any lock, then re-checks under the write lock
//! - a poisoned lock is recovered, since the map holds no partially written state
//!
//! ## Configuration
//!
//! `BENDF_SCHEMA_CACHE=off` disables caching; every call then compiles afresh.

use crate::validator::ValidationError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Shared, compiled JSON Schema validator.
pub type CompiledSchema = Arc<jsonschema::Validator>;

/// Thread-safe cache of compiled JSON Schema validators keyed by schema content.
///
/// # Example
///
/// ```rust
/// use bendf::validator_cache::ValidatorCache;
/// use serde_json::json;
///
/// let cache = ValidatorCache::new(true);
/// let schema = json!({"type": "object", "properties": {"name": {"type": "string"}}});
///
/// let validator = cache.get_or_compile(&schema).unwrap();
/// assert!(validator.is_valid(&json!({"name": "rex"})));
/// assert_eq!(cache.size(), 1);
/// ```
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, CompiledSchema>>>,
    enabled: bool,
}

impl ValidatorCache {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        info!(enabled = enabled, "Initializing JSON Schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn cache_key(schema: &Value) -> String {
        schema.to_string()
    }

    fn compile(schema: &Value) -> Result<CompiledSchema, ValidationError> {
        jsonschema::validator_for(schema)
            .map(Arc::new)
            .map_err(|e| {
                error!(error = %e, "Failed to compile JSON Schema");
                ValidationError::InvalidSchema(e.to_string())
            })
    }

    /// Get a cached validator or compile and cache a new one.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidSchema`] when `schema` does not compile. Failed
    /// compilations are not cached.
    ///
    /// # Performance
    ///
    /// - Cache hit: read lock + `HashMap` lookup, plus serializing the schema for the key
    /// - Cache miss: compilation + write lock
    pub fn get_or_compile(&self, schema: &Value) -> Result<CompiledSchema, ValidationError> {
        if !self.enabled {
            return Self::compile(schema);
        }

        let key = Self::cache_key(schema);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&key) {
                debug!(key_len = key.len(), "Schema validator cache hit");
                return Ok(Arc::clone(validator));
            }
        }

        let compiled = Self::compile(schema)?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        // Another coroutine may have compiled the same schema while we were compiling.
        if let Some(existing) = cache.get(&key) {
            debug!(key_len = key.len(), "Schema validator compiled concurrently");
            return Ok(Arc::clone(existing));
        }

        cache.insert(key, Arc::clone(&compiled));
        info!(cache_size = cache.len(), "Schema validator compiled and cached");
        Ok(compiled)
    }

    /// Compile and cache every schema up front.
    ///
    /// Invalid schemas are logged and skipped. Returns the number of schemas that
    /// compiled.
    pub fn precompile<'a>(&self, schemas: impl IntoIterator<Item = &'a Value>) -> usize {
        if !self.enabled {
            info!("Schema cache disabled, skipping precompilation");
            return 0;
        }

        let compiled_count = schemas
            .into_iter()
            .filter(|schema| self.get_or_compile(schema).is_ok())
            .count();

        info!(
            compiled_count = compiled_count,
            cache_size = self.size(),
            "Precompiled schemas at startup"
        );
        compiled_count
    }

    /// Number of cached validators.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = cache.len();
        cache.clear();
        info!(dropped = dropped, "Schema validator cache cleared");
    }
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new(true)
    }
}
