/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Gas prices.
//!
//! Native gas prices are charged by the keeper directly on the context's [GasMeter](super::GasMeter).
//! VM gas prices are charged inside a contract call, either per instruction by the metering
//! middleware or per host function call.

use wasmer::wasmparser::Operator;

use crate::types::{Attribute, Event};

/* ↓↓↓ Native gas ↓↓↓ */

/// Native gas per byte of (decompressed) bytecode, charged before compilation.
pub const COMPILE_COST_PER_BYTE: u64 = 2;

/// Native gas for loading a contract instance into the VM.
pub const INSTANTIATE_COST: u64 = 40_000;

/// Native gas for registering a new contract.
pub const REGISTER_COST: u64 = 160_000;

/// Native gas per contract message byte handed to the VM.
pub const CONTRACT_MESSAGE_DATA_COST_PER_BYTE: u64 = 1;

pub const EVENT_ATTRIBUTE_COST: u64 = 10;
pub const CUSTOM_EVENT_COST: u64 = 20;
pub const EVENT_ATTRIBUTE_DATA_COST_PER_BYTE: u64 = 1;

pub const fn compile_costs(byte_length: usize) -> u64 {
    COMPILE_COST_PER_BYTE.saturating_mul(byte_length as u64)
}

/// instance_costs is what entering the VM costs before a single instruction runs.
pub const fn instance_costs(msg_length: usize) -> u64 {
    INSTANTIATE_COST
        .saturating_add(CONTRACT_MESSAGE_DATA_COST_PER_BYTE.saturating_mul(msg_length as u64))
}

pub const fn register_contract_costs() -> u64 {
    REGISTER_COST
}

/// event_costs prices the attributes and custom events a contract asks the keeper to emit.
pub fn event_costs(attributes: &[Attribute], events: &[Event]) -> u64 {
    let mut gas = event_attribute_costs(attributes);
    for event in events {
        gas = gas
            .saturating_add(CUSTOM_EVENT_COST)
            .saturating_add(
                (event.ty.len() as u64).saturating_mul(EVENT_ATTRIBUTE_DATA_COST_PER_BYTE),
            )
            .saturating_add(event_attribute_costs(&event.attributes));
    }
    gas
}

fn event_attribute_costs(attributes: &[Attribute]) -> u64 {
    let stored_bytes: u64 = attributes
        .iter()
        .map(|a| (a.key.len() + a.value.len()) as u64)
        .sum();
    stored_bytes
        .saturating_mul(EVENT_ATTRIBUTE_DATA_COST_PER_BYTE)
        .saturating_add(EVENT_ATTRIBUTE_COST.saturating_mul(attributes.len() as u64))
}

/* ↓↓↓ VM gas ↓↓↓ */

/// wasm_opcode_gas_schedule prices one WASM instruction in VM gas. Instructions rejected by the
/// determinism filter never reach the meter, so they fall into the default arm.
pub fn wasm_opcode_gas_schedule(operator: &Operator) -> u64 {
    match operator {
        Operator::Nop
        | Operator::Unreachable
        | Operator::Block { .. }
        | Operator::Loop { .. }
        | Operator::If { .. }
        | Operator::Else
        | Operator::End
        | Operator::I32Const { .. }
        | Operator::I64Const { .. } => 1,

        Operator::Br { .. }
        | Operator::BrIf { .. }
        | Operator::BrTable { .. }
        | Operator::Return
        | Operator::Drop
        | Operator::Select => 2,

        Operator::LocalGet { .. }
        | Operator::LocalSet { .. }
        | Operator::LocalTee { .. }
        | Operator::GlobalGet { .. }
        | Operator::GlobalSet { .. } => 2,

        Operator::Call { .. } | Operator::CallIndirect { .. } => 10,

        Operator::I32Load { .. }
        | Operator::I64Load { .. }
        | Operator::I32Load8S { .. }
        | Operator::I32Load8U { .. }
        | Operator::I32Load16S { .. }
        | Operator::I32Load16U { .. }
        | Operator::I64Load8S { .. }
        | Operator::I64Load8U { .. }
        | Operator::I64Load16S { .. }
        | Operator::I64Load16U { .. }
        | Operator::I64Load32S { .. }
        | Operator::I64Load32U { .. }
        | Operator::I32Store { .. }
        | Operator::I64Store { .. }
        | Operator::I32Store8 { .. }
        | Operator::I32Store16 { .. }
        | Operator::I64Store8 { .. }
        | Operator::I64Store16 { .. }
        | Operator::I64Store32 { .. } => 3,

        Operator::MemorySize { .. } => 3,
        Operator::MemoryGrow { .. } => 1_000,

        Operator::I32Mul | Operator::I64Mul => 3,
        Operator::I32DivS
        | Operator::I32DivU
        | Operator::I32RemS
        | Operator::I32RemU
        | Operator::I64DivS
        | Operator::I64DivU
        | Operator::I64RemS
        | Operator::I64RemU => 8,

        Operator::MemoryCopy { .. }
        | Operator::MemoryFill { .. }
        | Operator::MemoryInit { .. } => 20,

        _ => 1,
    }
}

/// VM gas per 8 bytes copied out of or into guest memory by a host function.
pub const WASM_MEMORY_READ_PER64_BITS_COST: u64 = 3;
pub const WASM_MEMORY_WRITE_PER64_BITS_COST: u64 = 3;

pub const fn wasm_memory_read_cost(len: usize) -> u64 {
    let cost = ceil_div_8(len as u64).saturating_mul(WASM_MEMORY_READ_PER64_BITS_COST);
    if cost == 0 { 1 } else { cost }
}

pub const fn wasm_memory_write_cost(len: usize) -> u64 {
    let cost = ceil_div_8(len as u64).saturating_mul(WASM_MEMORY_WRITE_PER64_BITS_COST);
    if cost == 0 { 1 } else { cost }
}

pub const fn ceil_div_8(l: u64) -> u64 {
    l / 8 + if l % 8 != 0 { 1 } else { 0 }
}

/// VM gas charged by the storage host functions, on top of the memory copy.
pub const DB_READ_BASE_COST: u64 = 100_000;
pub const DB_READ_PER_BYTE_COST: u64 = 300;
pub const DB_WRITE_BASE_COST: u64 = 200_000;
pub const DB_WRITE_PER_BYTE_COST: u64 = 3_000;
pub const DB_REMOVE_COST: u64 = 100_000;

pub const fn db_read_cost(value_len: usize) -> u64 {
    DB_READ_BASE_COST.saturating_add(DB_READ_PER_BYTE_COST.saturating_mul(value_len as u64))
}

pub const fn db_write_cost(key_len: usize, value_len: usize) -> u64 {
    DB_WRITE_BASE_COST
        .saturating_add(DB_WRITE_PER_BYTE_COST.saturating_mul((key_len + value_len) as u64))
}

/// VM gas per input byte of the crypto host functions.
pub const CRYPTO_SHA256_PER_BYTE: u64 = 16;
pub const CRYPTO_ED25519_PER_BYTE: u64 = 16;
pub const CRYPTO_ED25519_VERIFY_BASE_COST: u64 = 1_000_000;
