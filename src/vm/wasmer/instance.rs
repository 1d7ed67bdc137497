/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! One run of one entry point.

use wasmer::{Instance, Store};
use wasmer_middlewares::metering::{get_remaining_points, set_remaining_points, MeteringPoints};

use super::env::{clamp_points, CallState, FuncError, HostEnv};
use super::host_functions::import_object;
use crate::vm::{VmCall, VmError};

const REMAINING_POINTS_GLOBAL: &str = "wasmer_metering_remaining_points";

/// What an entry point left behind.
pub struct EntryOutput {
    /// Bytes passed to `set_response`, if the contract called it.
    pub response: Option<Vec<u8>>,
}

/// run_entry instantiates `module`, gives it the call's budget and runs `entry`. The VM gas used is
/// returned alongside the result, on failure as well.
pub fn run_entry(
    store: &Store,
    module: &wasmer::Module,
    entry: &str,
    call: VmCall,
    read_only: bool,
) -> (Result<EntryOutput, VmError>, u64) {
    let gas_limit = clamp_points(call.gas_limit);
    let env = HostEnv::new(CallState::new(call, read_only));

    let instance = match Instance::new(module, &import_object(store, &env)) {
        Ok(instance) => instance,
        Err(e) => return (Err(VmError::Instantiation(e.to_string())), 0),
    };
    set_remaining_points(&instance, gas_limit);
    match instance.exports.get_global(REMAINING_POINTS_GLOBAL) {
        Ok(global) => env.bind_gas_global(global.clone()),
        Err(e) => return (Err(VmError::Instantiation(e.to_string())), 0),
    }

    let function = match instance.exports.get_native_function::<(), ()>(entry) {
        Ok(function) => function,
        Err(_) => {
            return (
                Err(VmError::Runtime(format!("contract does not export {}", entry))),
                0,
            )
        }
    };

    let outcome = function.call();

    let remaining = match get_remaining_points(&instance) {
        MeteringPoints::Remaining(points) => points,
        MeteringPoints::Exhausted => 0,
    };
    let gas_used = gas_limit.saturating_sub(remaining);

    let result = match outcome {
        Ok(()) => Ok(EntryOutput {
            response: env.call.output().response.take(),
        }),
        Err(trap) => Err(classify_trap(trap, remaining, &env)),
    };
    (result, gas_used)
}

fn classify_trap(trap: wasmer::RuntimeError, remaining: u64, env: &HostEnv) -> VmError {
    if remaining == 0 {
        return VmError::GasExhaustion;
    }
    if let Some(message) = env.call.output().abort.take() {
        return VmError::Contract(message);
    }
    match trap.downcast::<FuncError>() {
        Ok(FuncError::GasExhaustion) => VmError::GasExhaustion,
        Ok(e) => VmError::Runtime(e.to_string()),
        Err(trap) => VmError::Runtime(trap.message()),
    }
}
