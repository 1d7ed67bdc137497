/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Running the messages a contract returns.

use super::Keeper;
use crate::bindings::LedgerMsg;
use crate::context::{Context, EVENT_TYPE_MESSAGE};
use crate::error::WasmError;
use crate::types::Address;
use crate::vm::CosmosMsg;

/// Rounds of dispatch a message may trigger: a contract's messages may call contracts whose
/// messages call contracts, and so on, this many times.
pub const CONTRACT_MAX_DISPATCH_DEPTH: u32 = 20;

impl Keeper {
    /// dispatch_messages translates and runs `msgs` one after another under the authority of
    /// `contract`, stopping at the first failure. The messages run one dispatch round deeper than
    /// `ctx`, up to [CONTRACT_MAX_DISPATCH_DEPTH].
    pub fn dispatch_messages(
        &self,
        ctx: &Context,
        contract: &Address,
        msgs: &[CosmosMsg],
    ) -> Result<(), WasmError> {
        if msgs.is_empty() {
            return Ok(());
        }
        let depth = ctx.dispatch_depth() + 1;
        if depth > CONTRACT_MAX_DISPATCH_DEPTH {
            return Err(WasmError::ExceedMaxDispatchDepth);
        }
        let ctx = &ctx.with_dispatch_depth(depth);

        for msg in msgs {
            for ledger_msg in self.parsers.parse(contract, msg)? {
                self.dispatch_message(ctx, contract, &ledger_msg)?;
            }
        }
        Ok(())
    }

    /// dispatch_message runs one ledger message. Every signer of the message must be `contract`.
    pub fn dispatch_message(
        &self,
        ctx: &Context,
        contract: &Address,
        msg: &LedgerMsg,
    ) -> Result<(), WasmError> {
        if let Some(signer) = msg.signers().into_iter().find(|s| s != contract) {
            return Err(WasmError::Unauthorized(format!(
                "contract {} cannot act as {}",
                contract, signer
            )));
        }
        msg.validate_basic()?;

        tracing::trace!(contract = %contract, route = msg.route(), "dispatching contract message");
        let events = self.router.handle(ctx, msg)?;
        ctx.event_manager().emit_events(
            events
                .into_iter()
                .filter(|event| event.ty != EVENT_TYPE_MESSAGE),
        );
        Ok(())
    }
}
