/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wasm route: contracts calling, creating and migrating other contracts, and reading their
//! state.

use super::{parse_address, to_binary, LedgerMsg, WasmMsgParser, WasmQuerier};
use crate::context::Context;
use crate::error::WasmError;
use crate::keeper::{Keeper, MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract};
use crate::types::{Address, Binary};
use crate::vm::{CosmosMsg, QueryRequest, WasmMsg, WasmQuery};

/// Sub-contract messages are sent with the emitting contract as sender and owner.
pub struct ContractMsgParser;

impl WasmMsgParser for ContractMsgParser {
    fn parse(&self, contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError> {
        let CosmosMsg::Wasm(msg) = msg else {
            return Err(WasmError::InvalidMsg("unknown variant of Wasm".to_string()));
        };
        let msg = match msg {
            WasmMsg::Execute {
                contract_addr,
                msg,
                send,
            } => LedgerMsg::ExecuteContract(MsgExecuteContract {
                sender: *contract,
                contract: parse_address(contract_addr)?,
                execute_msg: msg.clone(),
                coins: send.clone(),
            }),
            WasmMsg::Instantiate {
                code_id,
                msg,
                send,
                migratable,
            } => LedgerMsg::InstantiateContract(MsgInstantiateContract {
                owner: *contract,
                code_id: *code_id,
                init_msg: msg.clone(),
                init_coins: send.clone(),
                migratable: *migratable,
            }),
            WasmMsg::Migrate {
                contract_addr,
                new_code_id,
                msg,
            } => LedgerMsg::MigrateContract(MsgMigrateContract {
                owner: *contract,
                contract: parse_address(contract_addr)?,
                new_code_id: *new_code_id,
                migrate_msg: msg.clone(),
            }),
        };
        Ok(vec![msg])
    }
}

pub struct ContractQuerier;

impl WasmQuerier for ContractQuerier {
    fn query(
        &self,
        keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError> {
        let QueryRequest::Wasm(query) = request else {
            return Err(WasmError::InvalidMsg("unknown variant of Wasm".to_string()));
        };
        match query {
            WasmQuery::Smart { contract_addr, msg } => {
                keeper.query_smart(ctx, &parse_address(contract_addr)?, msg.as_slice())
            }
            WasmQuery::Raw { contract_addr, key } => Ok(Binary(keeper.query_raw(
                ctx,
                &parse_address(contract_addr)?,
                key.as_slice(),
            ))),
            WasmQuery::ContractInfo { contract_addr } => {
                to_binary(&keeper.get_contract_info(ctx, &parse_address(contract_addr)?)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coin;

    #[test]
    fn execute_is_sent_by_the_contract() {
        let contract = Address([1; 20]);
        let target = Address([2; 20]);
        let msg = CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: target.to_string(),
            msg: Binary(b"{}".to_vec()),
            send: vec![Coin::new(3, "uusd")],
        });
        let msgs = ContractMsgParser.parse(&contract, &msg).unwrap();
        assert_eq!(
            msgs,
            vec![LedgerMsg::ExecuteContract(MsgExecuteContract {
                sender: contract,
                contract: target,
                execute_msg: Binary(b"{}".to_vec()),
                coins: vec![Coin::new(3, "uusd")],
            })]
        );
    }

    #[test]
    fn instantiate_is_owned_by_the_contract() {
        let contract = Address([1; 20]);
        let msg = CosmosMsg::Wasm(WasmMsg::Instantiate {
            code_id: 4,
            msg: Binary(b"{}".to_vec()),
            send: vec![],
            migratable: true,
        });
        let msgs = ContractMsgParser.parse(&contract, &msg).unwrap();
        assert_eq!(msgs[0].signers(), vec![contract]);
    }
}
