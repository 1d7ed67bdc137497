/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Node-local settings of the wasm keeper, kept in `config/wasm.toml`.
//!
//! Unlike [Params](crate::params::Params), these are not part of consensus: two nodes with different
//! configs still agree on state. They may answer external queries differently.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Default file name of the config, relative to the node's config directory.
pub const CONFIG_FILE_NAME: &str = "wasm.toml";

pub const DEFAULT_CONTRACT_QUERY_GAS_LIMIT: u64 = 3_000_000;

/// Allow-list value that matches every contract.
pub const LOG_ALL_CONTRACTS: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("decoding from TOML error: {0}")]
    DecodingFromToml(#[from] toml::de::Error),
    #[error("encoding to TOML error: {0}")]
    EncodingToToml(#[from] toml::ser::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
// Disallow unknown fields to ensure config files contain valid keys.
#[serde(deny_unknown_fields, default)]
pub struct WasmConfig {
    /// Native gas ceiling of a smart query arriving from outside the chain.
    pub contract_query_gas_limit: u64,
    /// Comma separated contract addresses whose events are emitted and logged, or `*` for all.
    pub contract_logging_whitelist: String,
    /// Upper bound of a contract's linear memory, in bytes.
    pub contract_memory_limit: Option<usize>,
    /// Directory for compiled module artifacts. Modules are only cached in memory when unset.
    pub cache_dir: Option<PathBuf>,
}

impl Default for WasmConfig {
    fn default() -> Self {
        WasmConfig {
            contract_query_gas_limit: DEFAULT_CONTRACT_QUERY_GAS_LIMIT,
            contract_logging_whitelist: LOG_ALL_CONTRACTS.to_string(),
            contract_memory_limit: None,
            cache_dir: None,
        }
    }
}

impl WasmConfig {
    /// load reads the config at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(WasmConfig::default());
        }
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_slice(&bytes)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let encoded = toml::to_string_pretty(self)?;
        std::fs::write(path, encoded).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn logging_whitelist(&self) -> LoggingWhitelist {
        LoggingWhitelist::parse(&self.contract_logging_whitelist)
    }
}

/// Parsed form of `contract_logging_whitelist`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoggingWhitelist {
    All,
    Only(HashSet<Address>),
}

impl LoggingWhitelist {
    /// Entries that are not valid addresses are skipped.
    pub fn parse(list: &str) -> Self {
        let list = list.trim();
        if list == LOG_ALL_CONTRACTS {
            return LoggingWhitelist::All;
        }
        LoggingWhitelist::Only(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| Address::parse(s).ok())
                .collect(),
        )
    }

    pub fn contains(&self, contract: &Address) -> bool {
        match self {
            LoggingWhitelist::All => true,
            LoggingWhitelist::Only(set) => set.contains(contract),
        }
    }
}
