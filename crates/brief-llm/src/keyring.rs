//! Round-robin rotation over multiple API keys for the same provider
//!
//! Free-tier quotas are enforced per key, so operators configure several
//! keys per provider: `OPENROUTER_API_KEY` plus `OPENROUTER_API_KEY_1`
//! through `OPENROUTER_API_KEY_5`, and similarly for Gemini and OpenAI.
//! Cycling through them spreads requests across quotas.

use brief_utils::env_nonempty;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A rotating set of API keys for one provider.
///
/// `next_key` hands out keys round-robin; the cursor is atomic so a ring
/// shared behind an `Arc` stays consistent across tasks.
#[derive(Debug)]
pub struct KeyRing {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRing {
    /// Create a ring from an explicit key list.
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load keys from the environment.
    ///
    /// Reads `var` first, then `var_1` through `var_<max_numbered>`,
    /// trimming whitespace and skipping unset or blank entries.
    pub fn from_env(var: &str, max_numbered: usize) -> Self {
        let mut keys = Vec::new();

        if let Some(key) = env_nonempty(var) {
            keys.push(key);
        }
        for i in 1..=max_numbered {
            if let Some(key) = env_nonempty(&format!("{var}_{i}")) {
                keys.push(key);
            }
        }

        Self::new(keys)
    }

    /// Get the next key and advance the rotation cursor.
    ///
    /// Returns `None` when no keys are configured.
    pub fn next_key(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(self.keys[index].clone())
    }

    /// Number of configured keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys are configured
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reset the rotation cursor to the first key
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::Relaxed);
    }
}
