/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Read-only queries served to clients outside of transaction execution.
//!
//! A query names one of the routes below and carries its parameters as a JSON document. The answer
//! is JSON too, except for [ROUTE_RAW_STORE] which returns the stored bytes as they are.

use serde::{Deserialize, Serialize};

use super::Keeper;
use crate::context::Context;
use crate::error::{recover_out_of_gas, WasmError};
use crate::gas::GasMeter;
use crate::types::{Address, Binary};

pub const ROUTE_BYTE_CODE: &str = "bytecode";
pub const ROUTE_CODE_INFO: &str = "codeInfo";
pub const ROUTE_CONTRACT_INFO: &str = "contractInfo";
pub const ROUTE_RAW_STORE: &str = "rawStore";
pub const ROUTE_CONTRACT_STORE: &str = "contractStore";
pub const ROUTE_PARAMETERS: &str = "parameters";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCodeIdParams {
    pub code_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContractAddressParams {
    pub contract_address: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRawStoreParams {
    pub contract_address: Address,
    pub key: Binary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContractParams {
    pub contract_address: Address,
    pub msg: Binary,
}

impl Keeper {
    /// query answers the external query `route` with JSON parameters `data`.
    pub fn query(&self, ctx: &Context, route: &str, data: &[u8]) -> Result<Vec<u8>, WasmError> {
        tracing::trace!(route, "external wasm query");
        match route {
            ROUTE_BYTE_CODE => {
                let params: QueryCodeIdParams = parse_params(data)?;
                let byte_code = self.get_byte_code(ctx, params.code_id)?;
                Ok(serde_json::to_vec(&Binary(byte_code))?)
            }
            ROUTE_CODE_INFO => {
                let params: QueryCodeIdParams = parse_params(data)?;
                Ok(serde_json::to_vec(&self.get_code_info(ctx, params.code_id)?)?)
            }
            ROUTE_CONTRACT_INFO => {
                let params: QueryContractAddressParams = parse_params(data)?;
                let contract_info = self.get_contract_info(ctx, &params.contract_address)?;
                Ok(serde_json::to_vec(&contract_info)?)
            }
            ROUTE_RAW_STORE => {
                let params: QueryRawStoreParams = parse_params(data)?;
                Ok(self.query_raw(ctx, &params.contract_address, params.key.as_slice()))
            }
            ROUTE_CONTRACT_STORE => {
                let params: QueryContractParams = parse_params(data)?;
                self.query_contract_store(ctx, &params.contract_address, params.msg.as_slice())
            }
            ROUTE_PARAMETERS => Ok(serde_json::to_vec(&self.params(ctx))?),
            _ => Err(WasmError::InvalidMsg(format!(
                "unknown wasm query endpoint: {}",
                route
            ))),
        }
    }

    /// query_contract_store runs a smart query on a meter of its own, limited by the node's
    /// `contract_query_gas_limit`. Running that meter dry is reported as [WasmError::OutOfGas].
    pub fn query_contract_store(
        &self,
        ctx: &Context,
        contract: &Address,
        msg: &[u8],
    ) -> Result<Vec<u8>, WasmError> {
        let meter = GasMeter::new(self.config().contract_query_gas_limit);
        let ctx = ctx.with_gas_meter(meter.clone());

        let result = recover_out_of_gas(|| self.query_smart(&ctx, contract, msg));
        if let Err(WasmError::OutOfGas(descriptor)) = &result {
            tracing::warn!(
                contract = %contract,
                location = %descriptor,
                gas_wanted = meter.limit(),
                gas_used = meter.consumed(),
                "contract query ran out of gas"
            );
        }
        result.map(Vec::from)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, WasmError> {
    serde_json::from_slice(data).map_err(|e| WasmError::InvalidMsg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_must_be_json() {
        assert!(matches!(
            parse_params::<QueryCodeIdParams>(b"code 1"),
            Err(WasmError::InvalidMsg(_))
        ));
        assert_eq!(
            parse_params::<QueryCodeIdParams>(br#"{"code_id":7}"#).unwrap(),
            QueryCodeIdParams { code_id: 7 }
        );
    }
}
