/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The wasm keeper: owner of all contract state and the only way in or out of a contract.
//!
//! A [Keeper] is assembled once at startup from its collaborators and is cheap to clone. Each
//! operation takes the [Context] of the message being executed and leaves its writes in that
//! context's store. Rolling back a failed message is the caller's business, see
//! [Router::deliver](crate::collaborators::Router::deliver).
//!
//! The operations are spread over submodules:
//! - [code]: uploading bytecode.
//! - [contract]: instantiating, executing, migrating and querying contracts.
//! - [dispatch]: running the ledger messages a contract returns.
//! - [querier]: answering the ledger queries a contract issues.
//! - [query_service]: the read-only query routes of the module.
//! - [genesis]: import and export of the whole module state.
//! - [msg_server]: the transaction message handler.

pub mod code;

pub mod contract;

pub mod dispatch;

pub mod genesis;
pub use genesis::*;

pub mod keys;

pub mod msg_server;
pub use msg_server::*;

pub mod msgs;
pub use msgs::*;

pub mod querier;
pub use querier::*;

pub mod query_service;
pub use query_service::*;

use std::sync::Arc;

use crate::bindings::{MsgParserRegistry, QuerierRegistry};
use crate::collaborators::{AccountKeeper, BankKeeper, MessageRouter};
use crate::config::{LoggingWhitelist, WasmConfig};
use crate::context::Context;
use crate::error::WasmError;
use crate::params::{ParamSource, Params};
use crate::store::PrefixStore;
use crate::types::{Address, Binary, CodeInfo, ContractInfo, Model};
use crate::vm::WasmVm;

#[derive(Clone)]
pub struct Keeper {
    vm: Arc<dyn WasmVm>,
    params: Arc<dyn ParamSource>,
    accounts: Arc<dyn AccountKeeper>,
    bank: Arc<dyn BankKeeper>,
    router: Arc<dyn MessageRouter>,
    parsers: Arc<MsgParserRegistry>,
    queriers: Arc<QuerierRegistry>,
    config: Arc<WasmConfig>,
    logging_whitelist: Arc<LoggingWhitelist>,
}

impl Keeper {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vm: Arc<dyn WasmVm>,
        params: Arc<dyn ParamSource>,
        accounts: Arc<dyn AccountKeeper>,
        bank: Arc<dyn BankKeeper>,
        router: Arc<dyn MessageRouter>,
        parsers: MsgParserRegistry,
        queriers: QuerierRegistry,
        config: WasmConfig,
    ) -> Self {
        let logging_whitelist = Arc::new(config.logging_whitelist());
        Self {
            vm,
            params,
            accounts,
            bank,
            router,
            parsers: Arc::new(parsers),
            queriers: Arc::new(queriers),
            config: Arc::new(config),
            logging_whitelist,
        }
    }

    pub fn config(&self) -> &WasmConfig {
        &self.config
    }

    pub fn params(&self, ctx: &Context) -> Params {
        self.params.params(ctx)
    }

    pub fn set_params(&self, ctx: &Context, params: Params) {
        self.params.set_params(ctx, params)
    }

    pub fn get_last_code_id(&self, ctx: &Context) -> Result<u64, WasmError> {
        read_id(ctx, keys::LAST_CODE_ID_KEY, "last code id")
    }

    pub fn set_last_code_id(&self, ctx: &Context, id: u64) {
        ctx.store_set(keys::LAST_CODE_ID_KEY, &id.to_be_bytes())
    }

    pub fn get_last_instance_id(&self, ctx: &Context) -> Result<u64, WasmError> {
        read_id(ctx, keys::LAST_INSTANCE_ID_KEY, "last instance id")
    }

    pub fn set_last_instance_id(&self, ctx: &Context, id: u64) {
        ctx.store_set(keys::LAST_INSTANCE_ID_KEY, &id.to_be_bytes())
    }

    pub fn get_code_info(&self, ctx: &Context, code_id: u64) -> Result<CodeInfo, WasmError> {
        let bz = ctx
            .store_get(&keys::code_key(code_id))
            .ok_or_else(|| WasmError::NotFound(format!("code id {}", code_id)))?;
        Ok(serde_json::from_slice(&bz)?)
    }

    pub fn set_code_info(&self, ctx: &Context, code_info: &CodeInfo) -> Result<(), WasmError> {
        ctx.store_set(
            &keys::code_key(code_info.code_id),
            &serde_json::to_vec(code_info)?,
        );
        Ok(())
    }

    pub fn get_contract_info(
        &self,
        ctx: &Context,
        address: &Address,
    ) -> Result<ContractInfo, WasmError> {
        let bz = ctx
            .store_get(&keys::contract_info_key(address))
            .ok_or_else(|| WasmError::NotFound(format!("contract {}", address)))?;
        Ok(serde_json::from_slice(&bz)?)
    }

    pub fn has_contract_info(&self, ctx: &Context, address: &Address) -> bool {
        ctx.store_get(&keys::contract_info_key(address)).is_some()
    }

    pub fn set_contract_info(
        &self,
        ctx: &Context,
        contract_info: &ContractInfo,
    ) -> Result<(), WasmError> {
        ctx.store_set(
            &keys::contract_info_key(&contract_info.address),
            &serde_json::to_vec(contract_info)?,
        );
        Ok(())
    }

    /// code_infos lists every stored code in ascending code id order.
    pub fn code_infos(&self, ctx: &Context) -> Result<Vec<CodeInfo>, WasmError> {
        ctx.store_prefix_entries(keys::CODE_KEY_PREFIX)
            .into_iter()
            .map(|(_, bz)| serde_json::from_slice(&bz).map_err(WasmError::from))
            .collect()
    }

    /// contract_infos lists every contract in ascending address order.
    pub fn contract_infos(&self, ctx: &Context) -> Result<Vec<ContractInfo>, WasmError> {
        ctx.store_prefix_entries(keys::CONTRACT_INFO_KEY_PREFIX)
            .into_iter()
            .map(|(_, bz)| serde_json::from_slice(&bz).map_err(WasmError::from))
            .collect()
    }

    /// contract_store returns a handle confined to the namespace of `address`.
    pub fn contract_store(&self, ctx: &Context, address: &Address) -> PrefixStore {
        PrefixStore::new(ctx.store().clone(), keys::contract_store_prefix(address))
    }

    /// contract_models dumps the store of `address` in ascending key order.
    pub fn contract_models(&self, ctx: &Context, address: &Address) -> Vec<Model> {
        self.contract_store(ctx, address)
            .entries()
            .into_iter()
            .map(|(key, value)| Model {
                key: Binary(key),
                value: Binary(value),
            })
            .collect()
    }

    pub fn set_contract_models(&self, ctx: &Context, address: &Address, models: &[Model]) {
        let store = self.contract_store(ctx, address);
        for model in models {
            store.write(model.key.as_slice(), model.value.as_slice());
        }
    }

    /// query_raw reads one key of a contract's store. A missing key reads as empty.
    pub fn query_raw(&self, ctx: &Context, address: &Address, key: &[u8]) -> Vec<u8> {
        self.contract_store(ctx, address)
            .read(key)
            .unwrap_or_default()
    }

    /// next_code_id allocates a code id.
    fn next_code_id(&self, ctx: &Context) -> Result<u64, WasmError> {
        let id = self.get_last_code_id(ctx)? + 1;
        self.set_last_code_id(ctx, id);
        Ok(id)
    }

    fn next_instance_id(&self, ctx: &Context) -> Result<u64, WasmError> {
        let id = self.get_last_instance_id(ctx)? + 1;
        self.set_last_instance_id(ctx, id);
        Ok(id)
    }
}

fn read_id(ctx: &Context, key: &[u8], name: &str) -> Result<u64, WasmError> {
    let bz = ctx
        .store_get(key)
        .ok_or_else(|| WasmError::InvalidGenesis(format!("{} not initialized", name)))?;
    let bytes: [u8; 8] = bz
        .as_slice()
        .try_into()
        .map_err(|_| WasmError::InvalidGenesis(format!("malformed {}", name)))?;
    Ok(u64::from_be_bytes(bytes))
}
