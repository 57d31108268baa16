//! Session store — the single application-state container.
//!
//! Replaces the original's free-floating module-level caches with one owned
//! object and defined accessors. Holds the base snapshot (single writer: only
//! an inventory upload replaces it), a per-snapshot-hash result cache, and
//! the chat history. Everything here is a discardable cache or session state;
//! `reset` returns the store to its session-start condition.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::forecast::DemandForecast;
use crate::inventory::{compute_metrics, snapshot_hash, InventoryMetrics, Product};
use crate::strategies::OptimizationStrategy;

/// The immutable base inventory state all diffs are computed against.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub hash: String,
    pub products: Vec<Product>,
    pub loaded_at: DateTime<Utc>,
}

/// Cached per-snapshot results, keyed by inventory-content hash. Safe to
/// discard at any time; the next call recomputes or refetches.
#[derive(Debug, Clone, Default)]
struct CachedResults {
    metrics: Option<InventoryMetrics>,
    strategies: Option<Vec<OptimizationStrategy>>,
    selected_ids: Vec<String>,
    forecast: Option<Vec<DemandForecast>>,
}

/// One chat turn kept in session history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct SessionState {
    snapshot: Option<Snapshot>,
    cache: HashMap<String, CachedResults>,
    chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears snapshot, cache, and chat history (session start semantics).
    pub fn reset(&self) {
        let mut state = self.write();
        *state = SessionState::default();
    }

    /// Installs a new base snapshot. Cached results for the same content hash
    /// survive, so returning to a previously-seen inventory reuses prior
    /// strategies and metrics without refetching. Returns the snapshot hash,
    /// its metrics, and whether a cache entry already existed.
    pub fn set_snapshot(&self, products: Vec<Product>) -> (String, InventoryMetrics, bool) {
        let hash = snapshot_hash(&products);
        let mut state = self.write();
        let seen_before = state.cache.contains_key(&hash);
        let entry = state.cache.entry(hash.clone()).or_default();
        let metrics = entry
            .metrics
            .get_or_insert_with(|| compute_metrics(&products))
            .clone();
        state.snapshot = Some(Snapshot {
            hash: hash.clone(),
            products,
            loaded_at: Utc::now(),
        });
        (hash, metrics, seen_before)
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.read().snapshot.clone()
    }

    pub fn metrics(&self, hash: &str) -> Option<InventoryMetrics> {
        self.read().cache.get(hash)?.metrics.clone()
    }

    pub fn cached_strategies(&self, hash: &str) -> Option<Vec<OptimizationStrategy>> {
        self.read().cache.get(hash)?.strategies.clone()
    }

    pub fn put_strategies(&self, hash: &str, strategies: Vec<OptimizationStrategy>) {
        let mut state = self.write();
        state.cache.entry(hash.to_string()).or_default().strategies = Some(strategies);
    }

    pub fn selected_ids(&self, hash: &str) -> Vec<String> {
        self.read()
            .cache
            .get(hash)
            .map(|c| c.selected_ids.clone())
            .unwrap_or_default()
    }

    pub fn set_selected_ids(&self, hash: &str, selected_ids: Vec<String>) {
        let mut state = self.write();
        state
            .cache
            .entry(hash.to_string())
            .or_default()
            .selected_ids = selected_ids;
    }

    pub fn cached_forecast(&self, hash: &str) -> Option<Vec<DemandForecast>> {
        self.read().cache.get(hash)?.forecast.clone()
    }

    pub fn put_forecast(&self, hash: &str, forecast: Vec<DemandForecast>) {
        let mut state = self.write();
        state.cache.entry(hash.to_string()).or_default().forecast = Some(forecast);
    }

    pub fn chat_history(&self) -> Vec<ChatTurn> {
        self.read().chat_history.clone()
    }

    pub fn push_chat_turn(&self, role: &str, content: &str) {
        let mut state = self.write();
        state.chat_history.push(ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
            at: Utc::now(),
        });
    }
}
