// ============================================================================
// TRX LOTTO - PERSISTENCE ADAPTER
// ============================================================================
//
// The ledger persists six JSON documents under fixed keys. Every mutation
// rewrites all of them (full-document overwrite, no incremental writes).
//
// BACKENDS:
// ┌──────────────────┬──────────────────────────────────────────────┐
// │ MemoryStore      │ tests, ephemeral demo runs                   │
// │ JsonDirStore     │ one file per key, temp-file + rename, .bak   │
// │ RedbStore        │ ReDB table, all keys in one write txn        │
// └──────────────────┴──────────────────────────────────────────────┘
//
// ============================================================================

pub mod json_dir;
pub mod memory;
pub mod redb_store;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::ledger::{LedgerState, Theme};

// ============================================================================
// DOCUMENT KEYS
// ============================================================================

pub const USERS_KEY: &str = "trx_users";
pub const BETS_KEY: &str = "trx_bets";
pub const LOTTERY_KEY: &str = "trx_lottery";
pub const PENDING_DEPOSITS_KEY: &str = "trx_pending_deposits";
pub const PENDING_WITHDRAWALS_KEY: &str = "trx_pending_withdrawals";
pub const THEME_KEY: &str = "trx_theme";

pub const ALL_KEYS: [&str; 6] = [
    USERS_KEY,
    BETS_KEY,
    LOTTERY_KEY,
    PENDING_DEPOSITS_KEY,
    PENDING_WITHDRAWALS_KEY,
    THEME_KEY,
];

// ============================================================================
// ERRORS
// ============================================================================

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt document {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// String-keyed store of serialized JSON documents.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Write several documents. Backends with transactions override this to
    /// make the flush all-or-nothing.
    fn put_all(&self, entries: &[(&str, String)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

fn read_doc<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> StorageResult<T> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        }),
        None => Ok(T::default()),
    }
}

/// The browser client stored the theme as a bare token (`dark`), not JSON.
fn read_theme(store: &dyn KeyValueStore) -> StorageResult<Theme> {
    match store.get(THEME_KEY)? {
        Some(raw) => serde_json::from_str(&raw).or_else(|source| {
            serde_json::from_value(serde_json::Value::String(raw.trim().to_string())).map_err(|_| {
                StorageError::Corrupt {
                    key: THEME_KEY.to_string(),
                    source,
                }
            })
        }),
        None => Ok(Theme::default()),
    }
}

fn encode<T: Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Read every document; a missing key yields that document's default.
pub fn load_state(store: &dyn KeyValueStore) -> StorageResult<LedgerState> {
    let state = LedgerState {
        users: read_doc(store, USERS_KEY)?,
        bets: read_doc(store, BETS_KEY)?,
        lottery: read_doc(store, LOTTERY_KEY)?,
        pending_deposits: read_doc(store, PENDING_DEPOSITS_KEY)?,
        pending_withdrawals: read_doc(store, PENDING_WITHDRAWALS_KEY)?,
        theme: read_theme(store)?,
    };
    debug!(
        users = state.users.len(),
        bets = state.bets.len(),
        pending_deposits = state.pending_deposits.len(),
        pending_withdrawals = state.pending_withdrawals.len(),
        "ledger state loaded"
    );
    Ok(state)
}

/// Overwrite every document with the current state.
pub fn persist_state(store: &dyn KeyValueStore, state: &LedgerState) -> StorageResult<()> {
    let entries = [
        (USERS_KEY, encode(&state.users)?),
        (BETS_KEY, encode(&state.bets)?),
        (LOTTERY_KEY, encode(&state.lottery)?),
        (PENDING_DEPOSITS_KEY, encode(&state.pending_deposits)?),
        (PENDING_WITHDRAWALS_KEY, encode(&state.pending_withdrawals)?),
        (THEME_KEY, encode(&state.theme)?),
    ];
    store.put_all(&entries)
}
