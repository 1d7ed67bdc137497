/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! JSON interface between contracts and the ledger: what a contract returns from an entry point,
//! the messages it asks the ledger to run on its behalf, and the queries it may issue.
//!
//! Addresses here are plain strings because they come from untrusted contract output. They are
//! parsed (and rejected) by the message parsers and queriers, not during deserialization.

use serde::{Deserialize, Serialize};

use crate::types::{Attribute, Binary, Coin, Coins, ContractInfo, Event};

/// ContractResponse is what `instantiate`, `execute` and `migrate` hand back.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContractResponse {
    /// Ledger messages dispatched under the contract's authority once the call succeeds.
    pub messages: Vec<CosmosMsg>,
    /// Attributes of the `wasm` event.
    pub attributes: Vec<Attribute>,
    /// Custom events, emitted as `wasm-<type>`.
    pub events: Vec<Event>,
    pub data: Option<Binary>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    Bank(BankMsg),
    Staking(StakingMsg),
    Wasm(WasmMsg),
    Custom(CustomMsg),
}

impl CosmosMsg {
    /// route names the parser responsible for this message.
    pub fn route(&self) -> &str {
        match self {
            CosmosMsg::Bank(_) => ROUTE_BANK,
            CosmosMsg::Staking(_) => ROUTE_STAKING,
            CosmosMsg::Wasm(_) => ROUTE_WASM,
            CosmosMsg::Custom(custom) => &custom.route,
        }
    }
}

pub const ROUTE_BANK: &str = "bank";
pub const ROUTE_STAKING: &str = "staking";
pub const ROUTE_MARKET: &str = "market";
pub const ROUTE_ORACLE: &str = "oracle";
pub const ROUTE_TREASURY: &str = "treasury";
pub const ROUTE_WASM: &str = "wasm";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    Send {
        from_address: String,
        to_address: String,
        amount: Coins,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingMsg {
    Delegate {
        validator: String,
        amount: Coin,
    },
    Undelegate {
        validator: String,
        amount: Coin,
    },
    Redelegate {
        src_validator: String,
        dst_validator: String,
        amount: Coin,
    },
    /// Withdraws rewards from `validator`, optionally redirecting them to `recipient` first.
    Withdraw {
        validator: String,
        #[serde(default)]
        recipient: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Execute {
        contract_addr: String,
        msg: Binary,
        #[serde(default)]
        send: Coins,
    },
    Instantiate {
        code_id: u64,
        msg: Binary,
        #[serde(default)]
        send: Coins,
        #[serde(default)]
        migratable: bool,
    },
    Migrate {
        contract_addr: String,
        new_code_id: u64,
        msg: Binary,
    },
}

/// A message for a route that is not built into the contract interface. `msg_data` is handed
/// untouched to the parser registered under `route`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomMsg {
    pub route: String,
    pub msg_data: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRequest {
    Bank(BankQuery),
    Staking(StakingQuery),
    Wasm(WasmQuery),
    Custom(CustomQuery),
}

impl QueryRequest {
    pub fn route(&self) -> &str {
        match self {
            QueryRequest::Bank(_) => ROUTE_BANK,
            QueryRequest::Staking(_) => ROUTE_STAKING,
            QueryRequest::Wasm(_) => ROUTE_WASM,
            QueryRequest::Custom(custom) => &custom.route,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankQuery {
    Balance { address: String, denom: String },
    AllBalances { address: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingQuery {
    BondedDenom {},
    Validators {},
    AllDelegations { delegator: String },
    Delegation { delegator: String, validator: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmQuery {
    /// Runs the `query` entry point of another contract.
    Smart { contract_addr: String, msg: Binary },
    /// Reads one key of another contract's store. A missing key answers with empty bytes.
    Raw { contract_addr: String, key: Binary },
    ContractInfo { contract_addr: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomQuery {
    pub route: String,
    pub query_data: serde_json::Value,
}

/// Envelope written back to the contract for every `query_chain` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryResult {
    Ok(Binary),
    Error(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllBalancesResponse {
    pub amount: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondedDenomResponse {
    pub denom: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: String,
    /// Decimal string, e.g. "0.05".
    pub commission: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorsResponse {
    pub validators: Vec<Validator>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: String,
    pub validator: String,
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationsResponse {
    pub delegations: Vec<Delegation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationResponse {
    pub delegation: Option<Delegation>,
}

pub type ContractInfoResponse = ContractInfo;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_externally_tagged() {
        let json = r#"{"bank":{"send":{"from_address":"a","to_address":"b","amount":[{"denom":"uluna","amount":"5"}]}}}"#;
        let msg: CosmosMsg = serde_json::from_str(json).unwrap();
        assert_eq!(msg.route(), ROUTE_BANK);

        let json = r#"{"custom":{"route":"market","msg_data":{"swap":{}}}}"#;
        let msg: CosmosMsg = serde_json::from_str(json).unwrap();
        assert_eq!(msg.route(), ROUTE_MARKET);
    }

    #[test]
    fn empty_response_is_accepted() {
        let res: ContractResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(res, ContractResponse::default());
        assert!(serde_json::from_str::<ContractResponse>(r#"{"log":[]}"#).is_err());
    }

    #[test]
    fn unit_like_queries_take_empty_objects() {
        let q: QueryRequest = serde_json::from_str(r#"{"staking":{"validators":{}}}"#).unwrap();
        assert_eq!(q, QueryRequest::Staking(StakingQuery::Validators {}));
    }
}
