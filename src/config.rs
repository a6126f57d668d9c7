use std::{collections::HashSet, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::api::{DEFAULT_REGISTRY_URL, DEFAULT_TIMEOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    #[error("Chain `{0}` is configured more than once")]
    DuplicateChain(String),
    #[error("Account `{0}` is configured more than once")]
    DuplicateAccount(String),
    #[error("Chain `{chain}` lists unknown account `{account}`")]
    UnknownAccount { chain: String, account: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub registry_url: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    pub id: String,
    /// Chain registry name; no asset list is fetched without it.
    pub registry_name: Option<String>,
    pub rest: String,
    /// Fetched from the node when absent.
    pub bech32_prefix: Option<String>,
    /// Used when the staking params query fails.
    pub bond_denom: Option<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub name: String,
    /// Bech32 address of any prefix, or hex encoded key bytes.
    pub address: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        raw.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut accounts = HashSet::new();
        for account in &self.accounts {
            if !accounts.insert(account.name.as_str()) {
                return Err(ConfigError::DuplicateAccount(account.name.clone()));
            }
        }
        let mut chains = HashSet::new();
        for chain in &self.chains {
            if !chains.insert(chain.id.to_lowercase()) {
                return Err(ConfigError::DuplicateChain(chain.id.clone()));
            }
            if let Some(unknown) = chain
                .accounts
                .iter()
                .find(|name| !accounts.contains(name.as_str()))
            {
                return Err(ConfigError::UnknownAccount {
                    chain: chain.id.clone(),
                    account: unknown.clone(),
                });
            }
        }
        Ok(())
    }

    /// Accounts listed under `chain`, in the chain's configured order.
    pub fn accounts_of<'c>(
        &'c self,
        chain: &'c ChainConfig,
    ) -> impl Iterator<Item = &'c AccountConfig> {
        chain
            .accounts
            .iter()
            .filter_map(|name| self.accounts.iter().find(|acc| &acc.name == name))
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
