/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Import and export of the complete module state.

use serde::{Deserialize, Serialize};

use super::Keeper;
use crate::context::Context;
use crate::error::WasmError;
use crate::params::Params;
use crate::types::{Binary, CodeInfo, ContractInfo, Model};

/// Code is a stored piece of bytecode together with its metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub code_info: CodeInfo,
    pub code_bytes: Binary,
}

/// Contract is an instantiated contract together with the full content of its store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_info: ContractInfo,
    pub contract_store: Vec<Model>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub last_code_id: u64,
    pub last_instance_id: u64,
    pub codes: Vec<Code>,
    pub contracts: Vec<Contract>,
}

impl GenesisState {
    /// validate performs the checks that do not need a keeper.
    pub fn validate(&self) -> Result<(), WasmError> {
        self.params.validate()?;

        for code in &self.codes {
            if code.code_bytes.is_empty() {
                return Err(WasmError::InvalidGenesis(format!(
                    "code {} has no bytes",
                    code.code_info.code_id
                )));
            }
            if code.code_info.code_id > self.last_code_id {
                return Err(WasmError::InvalidGenesis(format!(
                    "code id {} is beyond last code id {}",
                    code.code_info.code_id, self.last_code_id
                )));
            }
        }

        for contract in &self.contracts {
            if contract.contract_info.code_id > self.last_code_id {
                return Err(WasmError::InvalidGenesis(format!(
                    "contract {} refers to code id {} beyond last code id {}",
                    contract.contract_info.address,
                    contract.contract_info.code_id,
                    self.last_code_id
                )));
            }
        }
        Ok(())
    }
}

impl Keeper {
    /// init_genesis loads `state` into the store. Every piece of code is recompiled and must hash
    /// to the value recorded in its code info.
    pub fn init_genesis(&self, ctx: &Context, state: &GenesisState) -> Result<(), WasmError> {
        state.validate()?;

        for code in &state.codes {
            let code_hash = self
                .vm
                .create(code.code_bytes.as_slice())
                .map_err(|e| WasmError::InvalidGenesis(e.to_string()))?;
            if code_hash != code.code_info.code_hash.as_slice() {
                return Err(WasmError::InvalidGenesis(format!(
                    "code hash mismatch for code id {}",
                    code.code_info.code_id
                )));
            }
            self.set_code_info(ctx, &code.code_info)?;
        }

        for contract in &state.contracts {
            let address = &contract.contract_info.address;
            self.set_contract_info(ctx, &contract.contract_info)?;
            self.set_contract_models(ctx, address, &contract.contract_store);
        }

        self.set_last_code_id(ctx, state.last_code_id);
        self.set_last_instance_id(ctx, state.last_instance_id);
        self.set_params(ctx, state.params.clone());

        tracing::debug!(
            codes = state.codes.len(),
            contracts = state.contracts.len(),
            "initialized wasm genesis"
        );
        Ok(())
    }

    /// export_genesis dumps the module state in a form that [Keeper::init_genesis] restores exactly.
    pub fn export_genesis(&self, ctx: &Context) -> Result<GenesisState, WasmError> {
        let codes = self
            .code_infos(ctx)?
            .into_iter()
            .map(|code_info| {
                let code_bytes = self.get_byte_code(ctx, code_info.code_id)?;
                Ok(Code {
                    code_info,
                    code_bytes: Binary(code_bytes),
                })
            })
            .collect::<Result<Vec<_>, WasmError>>()?;

        let contracts = self
            .contract_infos(ctx)?
            .into_iter()
            .map(|contract_info| Contract {
                contract_store: self.contract_models(ctx, &contract_info.address),
                contract_info,
            })
            .collect();

        Ok(GenesisState {
            params: self.params(ctx),
            last_code_id: self.get_last_code_id(ctx)?,
            last_instance_id: self.get_last_instance_id(ctx)?,
            codes,
            contracts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;

    fn code(code_id: u64, bytes: &[u8]) -> Code {
        Code {
            code_info: CodeInfo {
                code_id,
                code_hash: Binary(vec![code_id as u8; 32]),
                creator: Address([1; 20]),
            },
            code_bytes: Binary(bytes.to_vec()),
        }
    }

    #[test]
    fn default_genesis_is_valid() {
        assert!(GenesisState::default().validate().is_ok());
    }

    #[test]
    fn empty_code_is_rejected() {
        let state = GenesisState {
            last_code_id: 1,
            codes: vec![code(1, b"")],
            ..Default::default()
        };
        assert!(matches!(state.validate(), Err(WasmError::InvalidGenesis(_))));
    }

    #[test]
    fn contract_code_id_must_not_pass_last_code_id() {
        let state = GenesisState {
            last_code_id: 1,
            codes: vec![code(1, b"\0asm")],
            contracts: vec![Contract {
                contract_info: ContractInfo {
                    address: Address([2; 20]),
                    owner: Address([1; 20]),
                    code_id: 2,
                    init_msg: Binary(b"{}".to_vec()),
                    migratable: false,
                },
                contract_store: Vec::new(),
            }],
            ..Default::default()
        };
        assert!(matches!(state.validate(), Err(WasmError::InvalidGenesis(_))));
    }
}
