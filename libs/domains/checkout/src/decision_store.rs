//! Persistence of the user's last credit choice.
//!
//! Decisions are keyed by booking id when one exists (human-identifiable and
//! stable across edits that don't change identity), else by the stable
//! serialization of the quote payload. Reads and writes are best-effort:
//! storage problems degrade to "no stored decision", never to a failure of
//! the checkout flow.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::models::{QuotePayloadBase, StoredCreditDecision};
use crate::stable_json::stable_serialize;

const KEY_PREFIX: &str = "checkout:credit";

/// Per-session key-value store for credit decisions.
///
/// Synchronous and best-effort: implementations swallow quota or availability
/// errors rather than surface them.
#[cfg_attr(test, mockall::automock)]
pub trait DecisionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

impl<T: DecisionStore + ?Sized> DecisionStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}

/// Session-scoped in-memory store
#[derive(Debug, Default)]
pub struct InMemoryDecisionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecisionStore for InMemoryDecisionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Derive the storage key for a checkout's credit decision.
///
/// Returns `None` when there is nothing to key on yet (no booking and no
/// quote payload, e.g. before a draft has enough data).
pub fn decision_key(
    booking_id: Option<&str>,
    quote_base: Option<&QuotePayloadBase>,
) -> Option<String> {
    if let Some(id) = booking_id.filter(|id| !id.is_empty()) {
        return Some(format!("{KEY_PREFIX}:booking:{id}"));
    }
    let base = quote_base?;
    let serialized = stable_serialize(base).ok()?;
    Some(format!("{KEY_PREFIX}:quote:{serialized}"))
}

/// Read a stored decision; any parse or storage error yields `None`.
pub fn read_decision<S: DecisionStore + ?Sized>(
    store: &S,
    key: &str,
) -> Option<StoredCreditDecision> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(decision) => Some(decision),
        Err(error) => {
            debug!(key, %error, "Discarding unparseable stored credit decision");
            None
        }
    }
}

/// Persist a decision, clamping the credit amount to a non-negative integer.
pub fn write_decision<S: DecisionStore + ?Sized>(
    store: &S,
    key: &str,
    decision: &StoredCreditDecision,
) {
    let sanitized = StoredCreditDecision {
        last_credit_cents: decision.last_credit_cents.max(0),
        explicitly_removed: decision.explicitly_removed,
    };
    match serde_json::to_string(&sanitized) {
        Ok(raw) => store.set(key, &raw),
        Err(error) => debug!(key, %error, "Skipping unserializable credit decision"),
    }
}

/// Best-effort delete
pub fn remove_decision<S: DecisionStore + ?Sized>(store: &S, key: &str) {
    store.remove(key);
}
