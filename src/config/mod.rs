use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vesting_core::pubkey::Pubkey;

use crate::schedule::{Tier, MAX_RELEASES};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed config {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{0}")]
    Invalid(String),
    #[error("unknown tier {0}")]
    UnknownTier(String),
    #[error("invalid execution date {0:?}, expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")]
    InvalidDate(String),
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_decimals() -> u8 {
    9
}

/// Settings shared by every subcommand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_rpc_url")]
    pub json_rpc_url: String,
    #[serde(default)]
    pub keypair_path: Option<PathBuf>,
    #[serde(with = "base58")]
    pub program_id: Pubkey,
    #[serde(default, with = "base58::option")]
    pub metadata_program_id: Option<Pubkey>,
    #[serde(with = "base58")]
    pub mint: Pubkey,
    #[serde(default = "default_decimals")]
    pub mint_decimals: u8,
    /// Start of every schedule, UTC.
    pub execution_date: String,
    #[serde(default)]
    pub tiers: Vec<Tier>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|err| match err {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.execution_timestamp()?;
        for (i, tier) in self.tiers.iter().enumerate() {
            if self.tiers[..i].iter().any(|other| other.id == tier.id) {
                return Err(ConfigError::Invalid(format!(
                    "tier id {} appears more than once",
                    tier.id
                )));
            }
            if tier.periods() > MAX_RELEASES {
                return Err(ConfigError::Invalid(format!(
                    "tier {} has {} releases, at most {MAX_RELEASES} fit in one transaction",
                    tier.name,
                    tier.periods()
                )));
            }
        }
        Ok(())
    }

    /// `$HOME/.config/vesting/config.yml`
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("vesting")
                .join("config.yml")
        })
    }

    /// Execution date as unix seconds.
    pub fn execution_timestamp(&self) -> Result<i64, ConfigError> {
        let raw = self.execution_date.trim();
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Ok(datetime.and_utc().timestamp());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|datetime| datetime.and_utc().timestamp())
            .ok_or_else(|| ConfigError::InvalidDate(self.execution_date.clone()))
    }

    /// Tier by numeric id or by name.
    pub fn tier(&self, key: &str) -> Result<&Tier, ConfigError> {
        let id = key.parse::<u8>().ok();
        self.tiers
            .iter()
            .find(|tier| Some(tier.id) == id || tier.name.eq_ignore_ascii_case(key))
            .ok_or_else(|| ConfigError::UnknownTier(key.to_string()))
    }
}

/// Addresses as base58 text.
mod base58 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use vesting_core::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|err| D::Error::custom(format!("invalid address {text:?}: {err}")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.collect_str(key),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| {
                    text.parse().map_err(|err| {
                        D::Error::custom(format!("invalid address {text:?}: {err}"))
                    })
                })
                .transpose()
        }
    }
}
