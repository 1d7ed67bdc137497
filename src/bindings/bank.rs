/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Bank route: coin transfers out of a contract, and balance queries.

use std::sync::Arc;

use super::{parse_address, to_binary, LedgerMsg, WasmMsgParser, WasmQuerier};
use crate::collaborators::BankKeeper;
use crate::context::Context;
use crate::error::WasmError;
use crate::keeper::Keeper;
use crate::types::{validate_coins, Address, Binary};
use crate::vm::{AllBalancesResponse, BalanceResponse, BankMsg, BankQuery, CosmosMsg, QueryRequest};

pub struct BankMsgParser;

impl WasmMsgParser for BankMsgParser {
    fn parse(&self, _contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError> {
        let CosmosMsg::Bank(BankMsg::Send {
            from_address,
            to_address,
            amount,
        }) = msg
        else {
            return Err(WasmError::InvalidMsg("unknown variant of Bank".to_string()));
        };
        if amount.is_empty() {
            return Ok(Vec::new());
        }
        validate_coins(amount)?;
        Ok(vec![LedgerMsg::BankSend {
            from_address: parse_address(from_address)?,
            to_address: parse_address(to_address)?,
            amount: amount.clone(),
        }])
    }
}

pub struct BankQuerier {
    bank: Arc<dyn BankKeeper>,
}

impl BankQuerier {
    pub fn new(bank: Arc<dyn BankKeeper>) -> Self {
        Self { bank }
    }
}

impl WasmQuerier for BankQuerier {
    fn query(
        &self,
        _keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError> {
        let QueryRequest::Bank(query) = request else {
            return Err(WasmError::InvalidMsg("unknown variant of Bank".to_string()));
        };
        match query {
            BankQuery::Balance { address, denom } => {
                let amount = self.bank.balance(ctx, &parse_address(address)?, denom);
                to_binary(&BalanceResponse { amount })
            }
            BankQuery::AllBalances { address } => {
                let amount = self.bank.all_balances(ctx, &parse_address(address)?);
                to_binary(&AllBalancesResponse { amount })
            }
        }
    }
}
