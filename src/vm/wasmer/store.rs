/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Builds the [wasmer::Store] every contract is compiled and run in.

use std::sync::Arc;
use wasmer::{BaseTunables, CompilerConfig, Store, Target};
use wasmer_compiler_singlepass::Singlepass;
use wasmer_engine_universal::Universal;
use wasmer_middlewares::Metering;

use super::filter::NonDeterminismFilter;
use super::tunables::{pages_for, LimitingTunables};
use crate::gas::wasm_opcode_gas_schedule;

/// contract_store compiles with Singlepass, the determinism filter and instruction metering.
///
/// Metering starts every instance with zero points, so a start function traps. The real budget is
/// set per call with `set_remaining_points`.
pub fn contract_store(memory_limit: Option<usize>) -> Store {
    let mut compiler_config = Singlepass::new();
    compiler_config.push_middleware(Arc::new(NonDeterminismFilter::default()));
    compiler_config.push_middleware(Arc::new(Metering::new(0, wasm_opcode_gas_schedule)));
    let engine = Universal::new(compiler_config).engine();

    match memory_limit {
        Some(limit) => {
            let base = BaseTunables::for_target(&Target::default());
            Store::new_with_tunables(&engine, LimitingTunables::new(base, pages_for(limit)))
        }
        None => Store::new(&engine),
    }
}
