//! Process configuration from the environment (a `.env` file is loaded first).
//!
//! | variable            | default         |
//! |---------------------|-----------------|
//! | `OBRAS_JWT_SECRET`  | required        |
//! | `OBRAS_BIND`        | `0.0.0.0:11111` |
//! | `OBRAS_DATA_DIR`    | `obras_data`    |
//! | `OBRAS_BCRYPT_COST` | bcrypt default  |
//! | `OBRAS_LOG_JSON`    | `true`          |
//! | `OBRAS_LOG_DIR`     | unset (stdout)  |

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

const DEFAULT_BIND: &str = "0.0.0.0:11111";
const DEFAULT_DATA_DIR: &str = "obras_data";

/// Where data lives and how passwords are hashed. Shared by the server and
/// the `load_data` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub bcrypt_cost: u32,
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub log_json: bool,
    pub log_dir: Option<PathBuf>,
    pub store: StoreConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("log_json", &self.log_json)
            .field("log_dir", &self.log_dir)
            .field("store", &self.store)
            .finish()
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup("OBRAS_DATA_DIR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let bcrypt_cost = match lookup("OBRAS_BCRYPT_COST") {
            None => bcrypt::DEFAULT_COST,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::Invalid {
                    key: "OBRAS_BCRYPT_COST",
                    value: raw,
                })?,
        };
        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            bcrypt_cost,
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// A missing or empty secret is an error; there is no fallback key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("OBRAS_JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let bind_raw = lookup("OBRAS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "OBRAS_BIND",
            value: bind_raw.clone(),
        })?;

        let log_json = match lookup("OBRAS_LOG_JSON") {
            Some(raw) => parse_bool("OBRAS_LOG_JSON", &raw)?,
            None => true,
        };
        let log_dir = lookup("OBRAS_LOG_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            jwt_secret,
            bind_addr,
            log_json,
            log_dir,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_secret_aborts() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingSecret
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("OBRAS_JWT_SECRET", "  ")])).unwrap_err(),
            ConfigError::MissingSecret
        );
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("OBRAS_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:11111".parse().unwrap());
        assert!(config.log_json);
        assert_eq!(config.log_dir, None);
        assert_eq!(config.store.data_dir, PathBuf::from("obras_data"));
        assert_eq!(config.store.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = Config::from_lookup(lookup(&[
            ("OBRAS_JWT_SECRET", "s3cret"),
            ("OBRAS_BCRYPT_COST", "2"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "OBRAS_BCRYPT_COST",
                value: "2".to_string()
            }
        );

        let err = Config::from_lookup(lookup(&[
            ("OBRAS_JWT_SECRET", "s3cret"),
            ("OBRAS_LOG_JSON", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "OBRAS_LOG_JSON", .. }));
    }
}
