//! Token bundle persistence.
//!
//! A [`TokenStore`] mirrors the in-memory token bundle so a restarted process
//! can skip the sign-in sequence. It is a best-effort cache: failures are
//! logged and degrade to a fresh sign-in, never to an error.
//!
//! - [`FileTokenStore`]: JSON file, replaced atomically on save
//! - [`MemoryTokenStore`]: in-process stub for tests and embedders

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

use crate::auth::TokenBundle;

/// Load/save a token bundle.
pub trait TokenStore: Send + Sync {
    /// Load the stored bundle, or `None` when absent, unreadable or incomplete.
    fn load(&self) -> Option<TokenBundle>;

    /// Persist a bundle, replacing whatever was stored. Never fails.
    fn save(&self, bundle: &TokenBundle);
}

impl<T: TokenStore + ?Sized> TokenStore for Box<T> {
    fn load(&self) -> Option<TokenBundle> {
        (**self).load()
    }

    fn save(&self, bundle: &TokenBundle) {
        (**self).save(bundle)
    }
}
