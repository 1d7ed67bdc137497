/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Chain-wide limits of the wasm keeper.
//!
//! Params are changed only through governance, so the keeper reads them through a [ParamSource]
//! on every execution path instead of caching them.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::WasmError;

pub const DEFAULT_MAX_CONTRACT_SIZE: u64 = 500 * 1024;
pub const DEFAULT_MAX_CONTRACT_GAS: u64 = 900_000_000;
pub const DEFAULT_MAX_CONTRACT_MSG_SIZE: u64 = 10 * 1024;
pub const DEFAULT_GAS_MULTIPLIER: u64 = 100;

/// Upper bound of `max_contract_gas` accepted by the VM.
pub const MAX_CONTRACT_GAS_CEILING: u64 = 900_000_000;
pub const MAX_CONTRACT_SIZE_CEILING: u64 = 500 * 1024;
pub const MAX_CONTRACT_MSG_SIZE_CEILING: u64 = 64 * 1024;
const MIN_SIZE: u64 = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Largest accepted upload, in bytes, measured before decompression.
    pub max_contract_size: u64,
    /// VM gas ceiling of a single contract execution.
    pub max_contract_gas: u64,
    /// Largest init, execute or migrate message, in bytes.
    pub max_contract_msg_size: u64,
    /// VM gas units per native gas unit.
    pub gas_multiplier: u64,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            max_contract_size: DEFAULT_MAX_CONTRACT_SIZE,
            max_contract_gas: DEFAULT_MAX_CONTRACT_GAS,
            max_contract_msg_size: DEFAULT_MAX_CONTRACT_MSG_SIZE,
            gas_multiplier: DEFAULT_GAS_MULTIPLIER,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), WasmError> {
        if self.max_contract_size < MIN_SIZE || self.max_contract_size > MAX_CONTRACT_SIZE_CEILING
        {
            return Err(WasmError::InvalidParams(format!(
                "max contract byte size {} must be between [1KB, 500KB]",
                self.max_contract_size
            )));
        }
        if self.max_contract_msg_size < MIN_SIZE
            || self.max_contract_msg_size > MAX_CONTRACT_MSG_SIZE_CEILING
        {
            return Err(WasmError::InvalidParams(format!(
                "max contract msg byte size {} must be between [1KB, 64KB]",
                self.max_contract_msg_size
            )));
        }
        if self.gas_multiplier == 0 {
            return Err(WasmError::InvalidParams(
                "gas multiplier must be positive".to_string(),
            ));
        }
        if self.max_contract_gas > MAX_CONTRACT_GAS_CEILING {
            return Err(WasmError::InvalidParams(format!(
                "max contract gas {} must be equal or smaller than {}",
                self.max_contract_gas, MAX_CONTRACT_GAS_CEILING
            )));
        }
        Ok(())
    }
}

/// ParamSource is the parameter subspace the keeper reads its [Params] from.
pub trait ParamSource: Send + Sync {
    fn params(&self, ctx: &Context) -> Params;
    fn set_params(&self, ctx: &Context, params: Params);
}

/// StaticParams serves one fixed parameter set. `set_params` is ignored.
#[derive(Clone, Debug, Default)]
pub struct StaticParams(pub Params);

impl ParamSource for StaticParams {
    fn params(&self, _: &Context) -> Params {
        self.0.clone()
    }

    fn set_params(&self, _: &Context, _: Params) {}
}

/// StoreParams keeps the parameter set in the context store under a fixed key, so that
/// parameter changes follow the same commit and rollback rules as every other write.
#[derive(Clone, Debug)]
pub struct StoreParams {
    key: Vec<u8>,
}

impl StoreParams {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        StoreParams { key: key.into() }
    }
}

impl Default for StoreParams {
    fn default() -> Self {
        StoreParams::new(b"params/wasm".to_vec())
    }
}

impl ParamSource for StoreParams {
    fn params(&self, ctx: &Context) -> Params {
        ctx.store_get(&self.key)
            .and_then(|bz| serde_json::from_slice(&bz).ok())
            .unwrap_or_default()
    }

    fn set_params(&self, ctx: &Context, params: Params) {
        if let Ok(bz) = serde_json::to_vec(&params) {
            ctx.store_set(&self.key, &bz);
        }
    }
}
