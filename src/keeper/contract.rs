/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Contract lifecycle: instantiate, execute, migrate, owner update and smart queries.
//!
//! Every entry into the VM follows the same steps. The instance loading cost is charged first,
//! then the VM gets `min(remaining gas, max_contract_gas) * gas_multiplier` VM gas. Whatever the VM
//! reports as used is charged back on the context's meter, plus one native unit, before its result
//! is looked at. A failed call is never free, and a VM that exhausts the meter's remaining gas
//! aborts the whole message.

use std::sync::Arc;

use super::{keys, ContextQuerier, Keeper};
use crate::context::Context;
use crate::error::WasmError;
use crate::gas;
use crate::params::Params;
use crate::types::{
    coins_is_zero, Address, Attribute, Binary, Coin, ContractInfo, Env, Event, MessageInfo,
};
use crate::vm::{ContractResponse, VmCall};

/// Type of the event carrying a contract's attributes.
pub const EVENT_TYPE_WASM: &str = "wasm";

/// Attribute key every contract event is tagged with. Contracts can not set it themselves.
pub const ATTRIBUTE_KEY_CONTRACT_ADDRESS: &str = "contract_address";

/// Smart queries that may be in progress at once, the outermost one included.
pub const CONTRACT_MAX_QUERY_DEPTH: u32 = 20;

impl Keeper {
    /// instantiate creates a new contract from `code_id`. Returns its address and the data the
    /// contract returned, if any.
    pub fn instantiate(
        &self,
        ctx: &Context,
        code_id: u64,
        creator: &Address,
        init_msg: &[u8],
        deposit: &[Coin],
        migratable: bool,
    ) -> Result<(Address, Option<Binary>), WasmError> {
        let params = self.params(ctx);
        check_msg_size(&params, "init", init_msg)?;

        let instance_id = self.next_instance_id(ctx)?;
        let address = keys::derive_address(code_id, instance_id);
        if self.accounts.has_account(ctx, &address) {
            return Err(WasmError::AccountExists(address.to_string()));
        }
        self.accounts.create_account(ctx, &address);

        if !coins_is_zero(deposit) {
            self.bank.send_coins(ctx, creator, &address, deposit)?;
        }

        let code_info = self.get_code_info(ctx, code_id)?;

        ctx.gas_meter().consume_gas(
            gas::instance_costs(init_msg.len()),
            "loading contract instance",
        );
        ctx.gas_meter()
            .consume_gas(gas::register_contract_costs(), "registering contract");

        let info = MessageInfo {
            sender: *creator,
            funds: deposit.to_vec(),
        };
        let outcome = self.vm.instantiate(
            code_info.code_hash.as_slice(),
            self.vm_call(ctx, &params, address, Some(info), init_msg),
        );
        gas::consume_vm_gas(ctx.gas_meter(), &params, outcome.gas_used);
        let response = outcome.result.map_err(WasmError::InstantiateFailed)?;

        self.emit_contract_events(ctx, &address, &response);

        self.set_contract_info(
            ctx,
            &ContractInfo {
                address,
                owner: *creator,
                code_id,
                init_msg: Binary(init_msg.to_vec()),
                migratable,
            },
        )?;
        tracing::debug!(code_id, contract = %address, "instantiated contract");

        self.dispatch_messages(ctx, &address, &response.messages)?;
        Ok((address, response.data))
    }

    /// execute calls the `execute` entry point of `contract` on behalf of `caller`, after moving
    /// `funds` to the contract.
    pub fn execute(
        &self,
        ctx: &Context,
        contract: &Address,
        caller: &Address,
        msg: &[u8],
        funds: &[Coin],
    ) -> Result<Option<Binary>, WasmError> {
        let params = self.params(ctx);
        check_msg_size(&params, "execute", msg)?;

        let contract_info = self.get_contract_info(ctx, contract)?;
        let code_info = self.get_code_info(ctx, contract_info.code_id)?;

        if !coins_is_zero(funds) {
            self.bank.send_coins(ctx, caller, contract, funds)?;
        }

        ctx.gas_meter()
            .consume_gas(gas::instance_costs(msg.len()), "loading contract instance");

        let info = MessageInfo {
            sender: *caller,
            funds: funds.to_vec(),
        };
        let outcome = self.vm.execute(
            code_info.code_hash.as_slice(),
            self.vm_call(ctx, &params, *contract, Some(info), msg),
        );
        gas::consume_vm_gas(ctx.gas_meter(), &params, outcome.gas_used);
        let response = outcome.result.map_err(WasmError::ExecuteFailed)?;

        self.emit_contract_events(ctx, contract, &response);
        self.dispatch_messages(ctx, contract, &response.messages)?;
        Ok(response.data)
    }

    /// migrate moves `contract` onto `new_code_id`, running the new code's `migrate` entry point
    /// over the contract's existing store. Only the owner of a migratable contract may do this.
    pub fn migrate(
        &self,
        ctx: &Context,
        contract: &Address,
        caller: &Address,
        new_code_id: u64,
        msg: &[u8],
    ) -> Result<Option<Binary>, WasmError> {
        let params = self.params(ctx);
        check_msg_size(&params, "migrate", msg)?;

        let mut contract_info = self.get_contract_info(ctx, contract)?;
        if !contract_info.migratable {
            return Err(WasmError::NotMigratable);
        }
        if contract_info.owner != *caller {
            return Err(WasmError::Unauthorized(
                "caller is not the owner of the contract".to_string(),
            ));
        }
        let new_code_info = self.get_code_info(ctx, new_code_id)?;

        ctx.gas_meter()
            .consume_gas(gas::instance_costs(msg.len()), "loading contract instance");

        let info = MessageInfo {
            sender: *caller,
            funds: Vec::new(),
        };
        let outcome = self.vm.migrate(
            new_code_info.code_hash.as_slice(),
            self.vm_call(ctx, &params, *contract, Some(info), msg),
        );
        gas::consume_vm_gas(ctx.gas_meter(), &params, outcome.gas_used);
        let response = outcome.result.map_err(WasmError::MigrationFailed)?;

        contract_info.code_id = new_code_id;
        self.set_contract_info(ctx, &contract_info)?;
        tracing::debug!(contract = %contract, new_code_id, "migrated contract");

        self.emit_contract_events(ctx, contract, &response);
        self.dispatch_messages(ctx, contract, &response.messages)?;
        Ok(response.data)
    }

    /// update_contract_owner hands a migratable contract over to `new_owner`.
    pub fn update_contract_owner(
        &self,
        ctx: &Context,
        contract: &Address,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<(), WasmError> {
        let mut contract_info = self.get_contract_info(ctx, contract)?;
        if !contract_info.migratable {
            return Err(WasmError::NotMigratable);
        }
        if contract_info.owner != *caller {
            return Err(WasmError::Unauthorized(
                "caller is not the owner of the contract".to_string(),
            ));
        }
        contract_info.owner = *new_owner;
        self.set_contract_info(ctx, &contract_info)
    }

    /// query_smart runs the read-only `query` entry point of `contract`. Queries the contract
    /// issues run one level deeper, up to [CONTRACT_MAX_QUERY_DEPTH].
    pub fn query_smart(
        &self,
        ctx: &Context,
        contract: &Address,
        msg: &[u8],
    ) -> Result<Binary, WasmError> {
        let depth = ctx.query_depth() + 1;
        if depth > CONTRACT_MAX_QUERY_DEPTH {
            return Err(WasmError::ExceedMaxQueryDepth);
        }
        let ctx = &ctx.with_query_depth(depth);

        let params = self.params(ctx);
        let contract_info = self.get_contract_info(ctx, contract)?;
        let code_info = self.get_code_info(ctx, contract_info.code_id)?;

        ctx.gas_meter()
            .consume_gas(gas::instance_costs(msg.len()), "loading contract instance");

        let outcome = self.vm.query(
            code_info.code_hash.as_slice(),
            self.vm_call(ctx, &params, *contract, None, msg),
        );
        gas::consume_vm_gas(ctx.gas_meter(), &params, outcome.gas_used);
        outcome.result.map_err(WasmError::ContractQueryFailed)
    }

    /// vm_call wires a VM entry to `ctx`. The gas budget is taken from what is left on the meter
    /// right now.
    fn vm_call(
        &self,
        ctx: &Context,
        params: &Params,
        contract: Address,
        info: Option<MessageInfo>,
        msg: &[u8],
    ) -> VmCall {
        VmCall {
            env: Env::new(ctx.block().clone(), contract),
            info,
            msg: msg.to_vec(),
            store: self.contract_store(ctx, &contract),
            querier: Arc::new(ContextQuerier::new(self.clone(), ctx.clone())),
            gas_limit: gas::gas_for_contract(ctx.gas_meter(), params),
        }
    }

    /// emit_contract_events charges for the events in `response` and emits them if `contract` is on
    /// the node's logging whitelist. The charge does not depend on the whitelist.
    fn emit_contract_events(
        &self,
        ctx: &Context,
        contract: &Address,
        response: &ContractResponse,
    ) {
        ctx.gas_meter().consume_gas(
            gas::event_costs(&response.attributes, &response.events),
            "contract events",
        );
        if self.logging_whitelist.contains(contract) {
            ctx.event_manager()
                .emit_events(contract_events(contract, &response.attributes, &response.events));
        }
    }
}

fn check_msg_size(params: &Params, stage: &'static str, msg: &[u8]) -> Result<(), WasmError> {
    if msg.len() as u64 > params.max_contract_msg_size {
        return Err(WasmError::ExceedMaxContractMsgSize {
            stage,
            size: msg.len() as u64,
            max: params.max_contract_msg_size,
        });
    }
    Ok(())
}

/// contract_events turns a contract's attributes into a `wasm` event and each of its custom events
/// into a `wasm-<type>` event. Every event is tagged with the contract address first. Events
/// without attributes are dropped.
pub fn contract_events(
    contract: &Address,
    attributes: &[Attribute],
    events: &[Event],
) -> Vec<Event> {
    let build = |ty: String, attributes: &[Attribute]| {
        if attributes.is_empty() {
            return None;
        }
        let mut event = Event::new(ty)
            .add_attribute(ATTRIBUTE_KEY_CONTRACT_ADDRESS, contract.to_string());
        event.attributes.extend(
            attributes
                .iter()
                .filter(|a| a.key != ATTRIBUTE_KEY_CONTRACT_ADDRESS)
                .cloned(),
        );
        Some(event)
    };

    build(EVENT_TYPE_WASM.to_string(), attributes)
        .into_iter()
        .chain(
            events
                .iter()
                .filter_map(|e| build(format!("{}-{}", EVENT_TYPE_WASM, e.ty), &e.attributes)),
        )
        .collect()
}
