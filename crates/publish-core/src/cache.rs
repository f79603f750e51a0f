//! Query cache for read-only SDK methods

use crate::caller::Query;
use crate::rpc::RpcResponse;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// Methods whose results only depend on their params
pub const DEFAULT_CACHEABLE_METHODS: &[&str] = &["resolve", "claim_search"];

/// Default number of cached responses
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Cache consulted by the RPC client around dispatch
pub trait QueryCache: Send + Sync {
    /// Cached response for `query`, if any
    fn get(&self, query: &Query) -> Option<RpcResponse>;

    /// Remember `response` for `query`
    fn set(&self, query: &Query, response: &RpcResponse);
}

/// In-process LRU cache keyed by a BLAKE3 digest of method and params
pub struct MemoryQueryCache {
    entries: Mutex<LruCache<String, RpcResponse>>,
    methods: HashSet<String>,
}

impl MemoryQueryCache {
    /// Create a cache holding at most `capacity` responses. Zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self::with_methods(capacity, DEFAULT_CACHEABLE_METHODS.iter().copied())
    }

    pub fn with_methods<'a>(capacity: usize, methods: impl IntoIterator<Item = &'a str>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            methods: methods.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn is_cacheable(&self, method: &str) -> bool {
        self.methods.contains(method)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn key(query: &Query) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(query.method().as_bytes());
        hasher.update(b"\0");
        if let Some(params) = &query.request.params {
            hasher.update(params.to_string().as_bytes());
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl Default for MemoryQueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl QueryCache for MemoryQueryCache {
    fn get(&self, query: &Query) -> Option<RpcResponse> {
        if !self.is_cacheable(query.method()) {
            return None;
        }
        let mut response = self.entries.lock().get(&Self::key(query))?.clone();
        response.id = query.request.id.clone();
        Some(response)
    }

    fn set(&self, query: &Query, response: &RpcResponse) {
        if !self.is_cacheable(query.method()) || response.is_error() {
            return;
        }
        self.entries.lock().put(Self::key(query), response.clone());
    }
}
