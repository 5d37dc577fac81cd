//! In-memory token store.

use std::sync::{Arc, Mutex};

use crate::auth::TokenBundle;
use crate::cache::TokenStore;

/// Token store that lives in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    bundle: Option<TokenBundle>,
    saves: usize,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a bundle.
    pub fn with_bundle(bundle: TokenBundle) -> Self {
        let store = Self::new();
        store.lock().bundle = Some(bundle);
        store
    }

    /// Number of times [`TokenStore::save`] accepted a bundle.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        // A poisoned slot still holds a whole bundle or none.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenBundle> {
        self.lock().bundle.clone().filter(TokenBundle::is_complete)
    }

    fn save(&self, bundle: &TokenBundle) {
        if !bundle.is_complete() {
            return;
        }
        let mut slot = self.lock();
        slot.bundle = Some(bundle.clone());
        slot.saves += 1;
    }
}
