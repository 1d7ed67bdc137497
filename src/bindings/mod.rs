/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Translation between the contract interface and the ledger.
//!
//! Outbound, a [WasmMsgParser] turns a contract's [CosmosMsg] into the [LedgerMsg]s that the
//! message router executes. Inbound, a [WasmQuerier] answers a contract's [QueryRequest]. Both are
//! looked up by route in a registry assembled once at startup and handed to the
//! [Keeper](crate::keeper::Keeper). The built-in routes are:
//! - [bank]: coin transfers and balances.
//! - [staking]: delegation, undelegation, redelegation and reward withdrawal.
//! - [wasm]: calls into other contracts.
//! - [market]: token swaps, registered as a custom route.

pub mod bank;
pub mod market;
pub mod staking;
pub mod wasm;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::{BankKeeper, StakingKeeper};
use crate::context::Context;
use crate::error::WasmError;
use crate::keeper::{
    Keeper, MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract, MsgStoreCode,
    MsgUpdateContractOwner,
};
use crate::types::{validate_coins, Address, Binary, Coin, Coins};
use crate::vm::{CosmosMsg, QueryRequest, ROUTE_BANK, ROUTE_MARKET, ROUTE_STAKING, ROUTE_WASM};

/// Route of reward withdrawal messages, which live in their own ledger module.
pub const ROUTE_DISTRIBUTION: &str = "distribution";

/// A message the ledger's router knows how to execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerMsg {
    BankSend {
        from_address: Address,
        to_address: Address,
        amount: Coins,
    },
    Delegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    Undelegate {
        delegator: Address,
        validator: Address,
        amount: Coin,
    },
    BeginRedelegate {
        delegator: Address,
        src_validator: Address,
        dst_validator: Address,
        amount: Coin,
    },
    SetWithdrawAddress {
        delegator: Address,
        withdraw_address: Address,
    },
    WithdrawDelegatorReward {
        delegator: Address,
        validator: Address,
    },
    Swap {
        trader: Address,
        offer_coin: Coin,
        ask_denom: String,
    },
    SwapSend {
        from_address: Address,
        to_address: Address,
        offer_coin: Coin,
        ask_denom: String,
    },
    StoreCode(MsgStoreCode),
    InstantiateContract(MsgInstantiateContract),
    ExecuteContract(MsgExecuteContract),
    MigrateContract(MsgMigrateContract),
    UpdateContractOwner(MsgUpdateContractOwner),
}

impl LedgerMsg {
    /// route names the ledger module that executes this message.
    pub fn route(&self) -> &'static str {
        match self {
            LedgerMsg::BankSend { .. } => ROUTE_BANK,
            LedgerMsg::Delegate { .. }
            | LedgerMsg::Undelegate { .. }
            | LedgerMsg::BeginRedelegate { .. } => ROUTE_STAKING,
            LedgerMsg::SetWithdrawAddress { .. } | LedgerMsg::WithdrawDelegatorReward { .. } => {
                ROUTE_DISTRIBUTION
            }
            LedgerMsg::Swap { .. } | LedgerMsg::SwapSend { .. } => ROUTE_MARKET,
            LedgerMsg::StoreCode(_)
            | LedgerMsg::InstantiateContract(_)
            | LedgerMsg::ExecuteContract(_)
            | LedgerMsg::MigrateContract(_)
            | LedgerMsg::UpdateContractOwner(_) => ROUTE_WASM,
        }
    }

    /// signers are the accounts whose authority the message acts under.
    pub fn signers(&self) -> Vec<Address> {
        match self {
            LedgerMsg::BankSend { from_address, .. } | LedgerMsg::SwapSend { from_address, .. } => {
                vec![*from_address]
            }
            LedgerMsg::Delegate { delegator, .. }
            | LedgerMsg::Undelegate { delegator, .. }
            | LedgerMsg::BeginRedelegate { delegator, .. }
            | LedgerMsg::SetWithdrawAddress { delegator, .. }
            | LedgerMsg::WithdrawDelegatorReward { delegator, .. } => vec![*delegator],
            LedgerMsg::Swap { trader, .. } => vec![*trader],
            LedgerMsg::StoreCode(msg) => msg.signers(),
            LedgerMsg::InstantiateContract(msg) => msg.signers(),
            LedgerMsg::ExecuteContract(msg) => msg.signers(),
            LedgerMsg::MigrateContract(msg) => msg.signers(),
            LedgerMsg::UpdateContractOwner(msg) => msg.signers(),
        }
    }

    /// validate_basic performs the stateless checks of the message.
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        match self {
            LedgerMsg::BankSend { amount, .. } => {
                validate_coins(amount)?;
                if amount.is_empty() || amount.iter().any(|c| c.amount == 0) {
                    return Err(WasmError::InvalidCoins(
                        "send amount must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            LedgerMsg::Delegate { amount, .. }
            | LedgerMsg::Undelegate { amount, .. }
            | LedgerMsg::BeginRedelegate { amount, .. } => validate_positive(amount),
            LedgerMsg::SetWithdrawAddress { .. } | LedgerMsg::WithdrawDelegatorReward { .. } => {
                Ok(())
            }
            LedgerMsg::Swap {
                offer_coin,
                ask_denom,
                ..
            }
            | LedgerMsg::SwapSend {
                offer_coin,
                ask_denom,
                ..
            } => {
                validate_positive(offer_coin)?;
                if ask_denom.is_empty() || *ask_denom == offer_coin.denom {
                    return Err(WasmError::InvalidMsg(format!(
                        "cannot swap {} into {:?}",
                        offer_coin.denom, ask_denom
                    )));
                }
                Ok(())
            }
            LedgerMsg::StoreCode(msg) => msg.validate_basic(),
            LedgerMsg::InstantiateContract(msg) => msg.validate_basic(),
            LedgerMsg::ExecuteContract(msg) => msg.validate_basic(),
            LedgerMsg::MigrateContract(msg) => msg.validate_basic(),
            LedgerMsg::UpdateContractOwner(msg) => msg.validate_basic(),
        }
    }
}

fn validate_positive(coin: &Coin) -> Result<(), WasmError> {
    if coin.denom.is_empty() || coin.amount == 0 {
        return Err(WasmError::InvalidCoins(coin.to_string()));
    }
    Ok(())
}

/// WasmMsgParser translates messages of one route emitted by `contract`.
pub trait WasmMsgParser: Send + Sync {
    /// parse may return no message at all, e.g. for a transfer of nothing.
    fn parse(&self, contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError>;
}

/// WasmQuerier answers queries of one route.
///
/// The keeper is passed in rather than held so that the wasm querier can re-enter it without a
/// reference cycle.
pub trait WasmQuerier: Send + Sync {
    fn query(
        &self,
        keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError>;
}

#[derive(Default, Clone)]
pub struct MsgParserRegistry {
    parsers: HashMap<String, Arc<dyn WasmMsgParser>>,
}

impl MsgParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// with_defaults registers the bank, staking and wasm parsers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ROUTE_BANK, Arc::new(bank::BankMsgParser));
        registry.register(ROUTE_STAKING, Arc::new(staking::StakingMsgParser));
        registry.register(ROUTE_WASM, Arc::new(wasm::ContractMsgParser));
        registry
    }

    pub fn register(&mut self, route: impl Into<String>, parser: Arc<dyn WasmMsgParser>) {
        self.parsers.insert(route.into(), parser);
    }

    /// parse hands `msg` to the parser of its route.
    pub fn parse(&self, contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError> {
        let parser = self
            .parsers
            .get(msg.route())
            .ok_or_else(|| WasmError::NoRegisteredParser(msg.route().to_string()))?;
        parser.parse(contract, msg)
    }
}

#[derive(Default, Clone)]
pub struct QuerierRegistry {
    queriers: HashMap<String, Arc<dyn WasmQuerier>>,
}

impl QuerierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// with_defaults registers the bank, staking and wasm queriers.
    pub fn with_defaults(bank: Arc<dyn BankKeeper>, staking: Arc<dyn StakingKeeper>) -> Self {
        let mut registry = Self::new();
        registry.register(ROUTE_BANK, Arc::new(bank::BankQuerier::new(bank)));
        registry.register(ROUTE_STAKING, Arc::new(staking::StakingQuerier::new(staking)));
        registry.register(ROUTE_WASM, Arc::new(wasm::ContractQuerier));
        registry
    }

    pub fn register(&mut self, route: impl Into<String>, querier: Arc<dyn WasmQuerier>) {
        self.queriers.insert(route.into(), querier);
    }

    pub fn query(
        &self,
        keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError> {
        let querier = self
            .queriers
            .get(request.route())
            .ok_or_else(|| WasmError::NoRegisteredQuerier(request.route().to_string()))?;
        tracing::trace!(route = request.route(), "contract query");
        querier.query(keeper, ctx, request)
    }
}

/// parse_address reads a bech32 account address supplied by a contract.
pub(crate) fn parse_address(s: &str) -> Result<Address, WasmError> {
    Address::parse(s)
}

pub(crate) fn parse_validator(s: &str) -> Result<Address, WasmError> {
    Address::parse_validator(s)
}

/// to_binary serializes a query answer.
pub(crate) fn to_binary<T: Serialize>(value: &T) -> Result<Binary, WasmError> {
    Ok(Binary(serde_json::to_vec(value)?))
}
