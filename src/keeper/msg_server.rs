/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Handler of the wasm module's transaction messages.

use super::contract::ATTRIBUTE_KEY_CONTRACT_ADDRESS;
use super::{
    Keeper, MsgExecuteContract, MsgInstantiateContract, MsgMigrateContract, MsgStoreCode,
    MsgUpdateContractOwner,
};
use crate::bindings::LedgerMsg;
use crate::collaborators::Handler;
use crate::context::{Context, EventManager, EVENT_TYPE_MESSAGE};
use crate::error::WasmError;
use crate::types::Event;
use crate::vm::ROUTE_WASM;

pub const EVENT_TYPE_STORE_CODE: &str = "store_code";
pub const EVENT_TYPE_INSTANTIATE_CONTRACT: &str = "instantiate_contract";
pub const EVENT_TYPE_EXECUTE_CONTRACT: &str = "execute_contract";
pub const EVENT_TYPE_MIGRATE_CONTRACT: &str = "migrate_contract";
pub const EVENT_TYPE_UPDATE_CONTRACT_OWNER: &str = "update_contract_owner";

pub const ATTRIBUTE_KEY_SENDER: &str = "sender";
pub const ATTRIBUTE_KEY_OWNER: &str = "owner";
pub const ATTRIBUTE_KEY_NEW_OWNER: &str = "new_owner";
pub const ATTRIBUTE_KEY_CODE_ID: &str = "code_id";
pub const ATTRIBUTE_KEY_MODULE: &str = "module";

/// WasmHandler executes the wasm route of the ledger router.
///
/// The events of a message are the message's own event, then the generic `message` event, then
/// whatever the contract and the messages it dispatched emitted.
#[derive(Clone)]
pub struct WasmHandler {
    keeper: Keeper,
}

impl WasmHandler {
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }

    pub fn store_code(&self, ctx: &Context, msg: &MsgStoreCode) -> Result<Vec<Event>, WasmError> {
        let code_id = self
            .keeper
            .store_code(ctx, &msg.sender, msg.wasm_byte_code.as_slice())?;
        Ok(vec![
            Event::new(EVENT_TYPE_STORE_CODE)
                .add_attribute(ATTRIBUTE_KEY_SENDER, msg.sender.to_string())
                .add_attribute(ATTRIBUTE_KEY_CODE_ID, code_id.to_string()),
            message_event(msg.sender.to_string()),
        ])
    }

    pub fn instantiate_contract(
        &self,
        ctx: &Context,
        msg: &MsgInstantiateContract,
    ) -> Result<Vec<Event>, WasmError> {
        let (sub_ctx, sub_events) = sub_context(ctx);
        let (address, _) = self.keeper.instantiate(
            &sub_ctx,
            msg.code_id,
            &msg.owner,
            msg.init_msg.as_slice(),
            &msg.init_coins,
            msg.migratable,
        )?;

        let mut events = vec![
            Event::new(EVENT_TYPE_INSTANTIATE_CONTRACT)
                .add_attribute(ATTRIBUTE_KEY_OWNER, msg.owner.to_string())
                .add_attribute(ATTRIBUTE_KEY_CODE_ID, msg.code_id.to_string())
                .add_attribute(ATTRIBUTE_KEY_CONTRACT_ADDRESS, address.to_string()),
            message_event(msg.owner.to_string()),
        ];
        events.extend(sub_events.take());
        Ok(events)
    }

    pub fn execute_contract(
        &self,
        ctx: &Context,
        msg: &MsgExecuteContract,
    ) -> Result<Vec<Event>, WasmError> {
        let (sub_ctx, sub_events) = sub_context(ctx);
        self.keeper.execute(
            &sub_ctx,
            &msg.contract,
            &msg.sender,
            msg.execute_msg.as_slice(),
            &msg.coins,
        )?;

        let mut events = vec![
            Event::new(EVENT_TYPE_EXECUTE_CONTRACT)
                .add_attribute(ATTRIBUTE_KEY_SENDER, msg.sender.to_string())
                .add_attribute(ATTRIBUTE_KEY_CONTRACT_ADDRESS, msg.contract.to_string()),
            message_event(msg.sender.to_string()),
        ];
        events.extend(sub_events.take());
        Ok(events)
    }

    pub fn migrate_contract(
        &self,
        ctx: &Context,
        msg: &MsgMigrateContract,
    ) -> Result<Vec<Event>, WasmError> {
        let (sub_ctx, sub_events) = sub_context(ctx);
        self.keeper.migrate(
            &sub_ctx,
            &msg.contract,
            &msg.owner,
            msg.new_code_id,
            msg.migrate_msg.as_slice(),
        )?;

        let mut events = vec![
            Event::new(EVENT_TYPE_MIGRATE_CONTRACT)
                .add_attribute(ATTRIBUTE_KEY_OWNER, msg.owner.to_string())
                .add_attribute(ATTRIBUTE_KEY_CODE_ID, msg.new_code_id.to_string())
                .add_attribute(ATTRIBUTE_KEY_CONTRACT_ADDRESS, msg.contract.to_string()),
            message_event(msg.owner.to_string()),
        ];
        events.extend(sub_events.take());
        Ok(events)
    }

    pub fn update_contract_owner(
        &self,
        ctx: &Context,
        msg: &MsgUpdateContractOwner,
    ) -> Result<Vec<Event>, WasmError> {
        self.keeper
            .update_contract_owner(ctx, &msg.contract, &msg.owner, &msg.new_owner)?;
        Ok(vec![
            Event::new(EVENT_TYPE_UPDATE_CONTRACT_OWNER)
                .add_attribute(ATTRIBUTE_KEY_OWNER, msg.owner.to_string())
                .add_attribute(ATTRIBUTE_KEY_NEW_OWNER, msg.new_owner.to_string())
                .add_attribute(ATTRIBUTE_KEY_CONTRACT_ADDRESS, msg.contract.to_string()),
            message_event(msg.owner.to_string()),
        ])
    }
}

impl Handler for WasmHandler {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
        match msg {
            LedgerMsg::StoreCode(msg) => self.store_code(ctx, msg),
            LedgerMsg::InstantiateContract(msg) => self.instantiate_contract(ctx, msg),
            LedgerMsg::ExecuteContract(msg) => self.execute_contract(ctx, msg),
            LedgerMsg::MigrateContract(msg) => self.migrate_contract(ctx, msg),
            LedgerMsg::UpdateContractOwner(msg) => self.update_contract_owner(ctx, msg),
            other => Err(WasmError::UnknownRoute(format!(
                "{} message sent to {}",
                other.route(),
                ROUTE_WASM
            ))),
        }
    }
}

/// sub_context collects the keeper's events apart so that they follow the message's own events.
fn sub_context(ctx: &Context) -> (Context, EventManager) {
    let events = EventManager::new();
    (ctx.with_event_manager(events.clone()), events)
}

fn message_event(sender: String) -> Event {
    Event::new(EVENT_TYPE_MESSAGE)
        .add_attribute(ATTRIBUTE_KEY_MODULE, ROUTE_WASM)
        .add_attribute(ATTRIBUTE_KEY_SENDER, sender)
}
