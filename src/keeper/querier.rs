/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [Querier] handed to the VM for one contract call.

use super::Keeper;
use crate::context::Context;
use crate::error::{recover_out_of_gas, WasmError};
use crate::gas::{self, GasMeter};
use crate::vm::{QueryOutcome, QueryRequest, Querier};

/// ContextQuerier answers a contract's queries against the context of the call that issued them.
///
/// A query runs on its own meter holding the VM budget the contract has left, converted to native
/// gas. What it spends is reported back in VM gas for the host to take off the contract's budget,
/// which in turn is charged to the caller's meter when the contract returns. Nested smart queries
/// therefore never see more gas than their caller had left. A query that runs its meter dry uses
/// up the whole budget.
pub struct ContextQuerier {
    keeper: Keeper,
    ctx: Context,
}

impl ContextQuerier {
    pub fn new(keeper: Keeper, ctx: Context) -> Self {
        Self { keeper, ctx }
    }
}

impl Querier for ContextQuerier {
    fn query(&self, request: &QueryRequest, gas_limit: u64) -> QueryOutcome {
        let params = self.keeper.params(&self.ctx);
        let meter = GasMeter::new(gas::to_native_gas(gas_limit, &params));
        let ctx = self.ctx.with_gas_meter(meter.clone());

        let result = recover_out_of_gas(|| self.keeper.queriers.query(&self.keeper, &ctx, request));
        let gas_used = match &result {
            Err(WasmError::OutOfGas(_)) => gas_limit,
            _ => gas::to_vm_gas(meter.consumed_to_limit(), &params).min(gas_limit),
        };
        QueryOutcome { result, gas_used }
    }
}
