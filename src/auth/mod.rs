//! Credentials and admin authorization.
//!
//! Player passwords and the admin PIN are stored only as Argon2id hashes.
//! Admin ledger operations take an [`AdminToken`], which only
//! [`AdminGuard::authorize`] can mint.

pub mod security;

pub use security::{verify_secret, HashCost, SecretHasher};

use tracing::warn;

use crate::ledger::{LedgerError, LedgerResult};

/// Proof that the caller presented the admin PIN.
#[derive(Debug)]
pub struct AdminToken {
    _private: (),
}

/// Checks the admin PIN against its stored hash.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    pin_hash: String,
}

impl AdminGuard {
    /// Guard for an already-hashed PIN (PHC string).
    pub fn from_hash(pin_hash: impl Into<String>) -> Self {
        Self { pin_hash: pin_hash.into() }
    }

    /// Hash a plaintext PIN and guard it.
    pub fn from_pin(pin: &str, hasher: &SecretHasher) -> LedgerResult<Self> {
        let pin_hash = hasher.hash_secret(pin).map_err(LedgerError::Credential)?;
        Ok(Self { pin_hash })
    }

    pub fn authorize(&self, pin: &str) -> LedgerResult<AdminToken> {
        if verify_secret(pin, &self.pin_hash) {
            Ok(AdminToken { _private: () })
        } else {
            warn!("admin PIN rejected");
            Err(LedgerError::Unauthorized)
        }
    }
}
