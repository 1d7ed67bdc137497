/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Conversions between native gas and VM gas.

use crate::params::Params;

use super::GasMeter;

/// gas_for_contract is the VM gas budget of the next VM entry:
/// `min(remaining native gas, max_contract_gas) * gas_multiplier`.
///
/// It is recomputed before every entry, nested queries included, so a callee never sees more
/// than what is left on the meter of its caller.
pub fn gas_for_contract(meter: &GasMeter, params: &Params) -> u64 {
    meter
        .remaining()
        .min(params.max_contract_gas)
        .saturating_mul(params.gas_multiplier)
}

/// to_native_gas rounds VM gas down to native gas.
pub fn to_native_gas(vm_gas: u64, params: &Params) -> u64 {
    vm_gas / params.gas_multiplier.max(1)
}

/// to_vm_gas scales native gas up to VM gas.
pub fn to_vm_gas(native_gas: u64, params: &Params) -> u64 {
    native_gas.saturating_mul(params.gas_multiplier)
}

/// consume_vm_gas charges the native equivalent of `vm_gas` on `meter`, plus one native unit.
/// Callers charge right after the VM returns and before looking at its result.
///
/// The extra unit makes a VM that spent its whole budget overrun the meter whenever the budget was
/// bounded by the meter's remaining gas, so exhausting the caller's gas always aborts the message
/// instead of surfacing as a contract error.
///
/// # Panics
/// With an [OutOfGas](crate::error::OutOfGas) payload if the meter runs out.
pub fn consume_vm_gas(meter: &GasMeter, params: &Params, vm_gas: u64) {
    meter.consume_gas(
        to_native_gas(vm_gas.saturating_add(params.gas_multiplier), params),
        "wasm contract",
    );
}
