//! Environment-driven configuration (`.env` is honoured via dotenv).
//!
//! | Variable                  | Default                 |
//! |---------------------------|-------------------------|
//! | `LOTTO_BIND_ADDR`         | `127.0.0.1:8080`        |
//! | `LOTTO_STORAGE`           | `json`                  |
//! | `LOTTO_DATA_DIR`          | `./lotto_data`          |
//! | `LOTTO_ADMIN_PIN_HASH`    | (one of hash/pin required) |
//! | `LOTTO_ADMIN_PIN`         |                         |
//! | `LOTTO_DEPOSIT_ADDRESS`   | platform TRX wallet     |
//! | `LOTTO_PAYOUT_MULTIPLIER` | `10`                    |
//! | `LOTTO_ARGON2_MEMORY_KIB` | Argon2 default          |
//! | `LOTTO_ARGON2_ITERATIONS` | Argon2 default          |
//! | `LOTTO_SESSION_TTL_SECS`  | `86400`                 |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::HashCost;
use crate::ledger::{LedgerSettings, DEFAULT_DEPOSIT_ADDRESS};
use crate::settlement::PAYOUT_MULTIPLIER;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Admin PIN not configured: set LOTTO_ADMIN_PIN_HASH or LOTTO_ADMIN_PIN")]
    MissingAdminPin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    JsonDir,
    Redb,
}

impl FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" => Ok(Self::JsonDir),
            "redb" => Ok(Self::Redb),
            _ => Err(()),
        }
    }
}

/// Where the admin PIN comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPinSource {
    /// PHC string, used as-is.
    Hash(String),
    /// Plaintext, hashed once at startup.
    Plain(String),
}

#[derive(Debug, Clone)]
pub struct LottoConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub data_dir: PathBuf,
    pub admin_pin: AdminPinSource,
    pub deposit_address: String,
    pub payout_multiplier: f64,
    pub hash_cost: HashCost,
    pub session_ttl: Duration,
}

impl LottoConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let admin_pin = match (get("LOTTO_ADMIN_PIN_HASH"), get("LOTTO_ADMIN_PIN")) {
            (Some(hash), _) => AdminPinSource::Hash(hash.to_string()),
            (None, Some(pin)) => AdminPinSource::Plain(pin.to_string()),
            (None, None) => return Err(ConfigError::MissingAdminPin),
        };

        let defaults = HashCost::default();
        let payout_multiplier = parse_or(vars, "LOTTO_PAYOUT_MULTIPLIER", PAYOUT_MULTIPLIER)?;
        if !(payout_multiplier.is_finite() && payout_multiplier > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "LOTTO_PAYOUT_MULTIPLIER",
                value: payout_multiplier.to_string(),
            });
        }

        let session_ttl_secs: u64 = parse_or(vars, "LOTTO_SESSION_TTL_SECS", 24 * 60 * 60)?;
        if session_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LOTTO_SESSION_TTL_SECS",
                value: session_ttl_secs.to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse_or(vars, "LOTTO_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?,
            storage: parse_or(vars, "LOTTO_STORAGE", StorageBackend::JsonDir)?,
            data_dir: get("LOTTO_DATA_DIR").unwrap_or("./lotto_data").into(),
            admin_pin,
            deposit_address: get("LOTTO_DEPOSIT_ADDRESS")
                .unwrap_or(DEFAULT_DEPOSIT_ADDRESS)
                .to_string(),
            payout_multiplier,
            hash_cost: HashCost {
                memory_kib: parse_or(vars, "LOTTO_ARGON2_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(vars, "LOTTO_ARGON2_ITERATIONS", defaults.iterations)?,
            },
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            payout_multiplier: self.payout_multiplier,
            deposit_address: self.deposit_address.clone(),
            hash_cost: self.hash_cost,
        }
    }
}

fn parse_or<T: FromStr>(vars: &HashMap<String, String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = LottoConfig::from_vars(&vars(&[("LOTTO_ADMIN_PIN", "1234")])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.storage, StorageBackend::JsonDir);
        assert_eq!(config.data_dir, PathBuf::from("./lotto_data"));
        assert_eq!(config.admin_pin, AdminPinSource::Plain("1234".to_string()));
        assert_eq!(config.deposit_address, DEFAULT_DEPOSIT_ADDRESS);
        assert_eq!(config.payout_multiplier, 10.0);
        assert_eq!(config.hash_cost, HashCost::default());
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_session_ttl_must_be_positive() {
        let config = LottoConfig::from_vars(&vars(&[("LOTTO_ADMIN_PIN", "1"), ("LOTTO_SESSION_TTL_SECS", "900")]))
            .unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(900));

        for bad in ["0", "-5", "soon"] {
            let err = LottoConfig::from_vars(&vars(&[("LOTTO_ADMIN_PIN", "1"), ("LOTTO_SESSION_TTL_SECS", bad)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: "LOTTO_SESSION_TTL_SECS", .. }));
        }
    }

    #[test]
    fn test_hash_wins_over_plain_pin() {
        let config = LottoConfig::from_vars(&vars(&[
            ("LOTTO_ADMIN_PIN", "1234"),
            ("LOTTO_ADMIN_PIN_HASH", "$argon2id$v=19$m=8,t=1,p=1$c2FsdA$aGFzaA"),
        ]))
        .unwrap();
        assert!(matches!(config.admin_pin, AdminPinSource::Hash(_)));
    }

    #[test]
    fn test_missing_pin_is_an_error() {
        let err = LottoConfig::from_vars(&vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingAdminPin));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = LottoConfig::from_vars(&vars(&[
            ("LOTTO_ADMIN_PIN", "1"),
            ("LOTTO_STORAGE", "ReDB"),
            ("LOTTO_BIND_ADDR", "0.0.0.0:9000"),
            ("LOTTO_PAYOUT_MULTIPLIER", "70"),
        ]))
        .unwrap();
        assert_eq!(config.storage, StorageBackend::Redb);
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.ledger_settings().payout_multiplier, 70.0);

        let err = LottoConfig::from_vars(&vars(&[("LOTTO_ADMIN_PIN", "1"), ("LOTTO_STORAGE", "sqlite")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "LOTTO_STORAGE", .. }));

        let err = LottoConfig::from_vars(&vars(&[("LOTTO_ADMIN_PIN", "1"), ("LOTTO_PAYOUT_MULTIPLIER", "-2")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "LOTTO_PAYOUT_MULTIPLIER", .. }));
    }
}
