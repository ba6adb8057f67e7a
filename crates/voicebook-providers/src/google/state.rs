//! Persisted single-use OAuth state tokens.
//!
//! Every authorization URL carries a freshly minted state. The callback
//! must present one of them, and presenting it spends it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderResult;
use crate::store::JsonFileStore;

/// Random bytes per state token, before base64url encoding.
pub const STATE_TOKEN_BYTES: usize = 24;

/// On-disk shape: `{"states": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StateSet {
    #[serde(default)]
    states: BTreeSet<String>,
}

/// File-backed set of outstanding OAuth state tokens.
#[derive(Debug, Clone)]
pub struct StateTokenCache {
    store: JsonFileStore<StateSet>,
}

impl StateTokenCache {
    /// Creates a cache persisted at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonFileStore::new(path),
        }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Mints a new state token and records it.
    pub fn allocate(&self) -> ProviderResult<String> {
        let token = generate_state();
        let stored = token.clone();
        self.store.update(move |set| {
            set.states.insert(stored);
        })?;
        debug!(path = %self.path().display(), "allocated OAuth state");
        Ok(token)
    }

    /// Spends a state token. Returns false if it was never issued or was
    /// already used.
    pub fn consume(&self, token: &str) -> ProviderResult<bool> {
        let consumed = self.store.update(|set| set.states.remove(token))?;
        debug!(consumed, "consumed OAuth state");
        Ok(consumed)
    }

    /// Returns true if the token is outstanding.
    pub fn contains(&self, token: &str) -> bool {
        self.load().states.contains(token)
    }

    /// Number of outstanding tokens.
    pub fn len(&self) -> usize {
        self.load().states.len()
    }

    /// Returns true if no tokens are outstanding.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load(&self) -> StateSet {
        self.store.load().unwrap_or_default()
    }
}

/// Generates a random URL-safe state string for CSRF protection.
fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_TOKEN_BYTES).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
