/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Transaction messages of the wasm module.
//!
//! `validate_basic` only performs stateless checks against hard caps. The keeper checks the same
//! sizes again against the current [Params](crate::params::Params).

use serde::{Deserialize, Serialize};

use crate::error::WasmError;
use crate::params::{MAX_CONTRACT_MSG_SIZE_CEILING, MAX_CONTRACT_SIZE_CEILING};
use crate::types::{validate_coins, Address, Binary, Coins};

/// Largest upload any parameter set can allow.
pub const ENFORCED_MAX_CONTRACT_SIZE: u64 = MAX_CONTRACT_SIZE_CEILING;

/// Largest contract message any parameter set can allow.
pub const ENFORCED_MAX_CONTRACT_MSG_SIZE: u64 = MAX_CONTRACT_MSG_SIZE_CEILING;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgStoreCode {
    pub sender: Address,
    /// Raw or gzip-compressed bytecode.
    pub wasm_byte_code: Binary,
}

impl MsgStoreCode {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        if self.wasm_byte_code.is_empty() {
            return Err(WasmError::InvalidMsg("empty wasm code".to_string()));
        }
        if self.wasm_byte_code.len() as u64 > ENFORCED_MAX_CONTRACT_SIZE {
            return Err(WasmError::InvalidMsg("wasm code too large".to_string()));
        }
        Ok(())
    }

    pub fn signers(&self) -> Vec<Address> {
        vec![self.sender]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgInstantiateContract {
    pub owner: Address,
    pub code_id: u64,
    pub init_msg: Binary,
    #[serde(default)]
    pub init_coins: Coins,
    #[serde(default)]
    pub migratable: bool,
}

impl MsgInstantiateContract {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        validate_coins(&self.init_coins)?;
        validate_contract_msg(&self.init_msg)
    }

    pub fn signers(&self) -> Vec<Address> {
        vec![self.owner]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: Address,
    pub contract: Address,
    pub execute_msg: Binary,
    #[serde(default)]
    pub coins: Coins,
}

impl MsgExecuteContract {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        validate_coins(&self.coins)?;
        validate_contract_msg(&self.execute_msg)
    }

    pub fn signers(&self) -> Vec<Address> {
        vec![self.sender]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMigrateContract {
    pub owner: Address,
    pub contract: Address,
    pub new_code_id: u64,
    pub migrate_msg: Binary,
}

impl MsgMigrateContract {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        if self.new_code_id == 0 {
            return Err(WasmError::InvalidMsg("missing new_code_id".to_string()));
        }
        validate_contract_msg(&self.migrate_msg)
    }

    pub fn signers(&self) -> Vec<Address> {
        vec![self.owner]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateContractOwner {
    pub owner: Address,
    pub new_owner: Address,
    pub contract: Address,
}

impl MsgUpdateContractOwner {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        Ok(())
    }

    pub fn signers(&self) -> Vec<Address> {
        vec![self.owner]
    }
}

/// Contract messages must be JSON documents no larger than the hard cap.
fn validate_contract_msg(msg: &Binary) -> Result<(), WasmError> {
    if msg.len() as u64 > ENFORCED_MAX_CONTRACT_MSG_SIZE {
        return Err(WasmError::InvalidMsg(
            "wasm msg byte size is too huge".to_string(),
        ));
    }
    if serde_json::from_slice::<serde::de::IgnoredAny>(msg.as_slice()).is_err() {
        return Err(WasmError::InvalidMsg(
            "wasm msg byte format is invalid json".to_string(),
        ));
    }
    Ok(())
}
