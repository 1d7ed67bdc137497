/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The seam between the keeper and the contract VM.
//!
//! The keeper only ever talks to a [WasmVm]. A VM entry gets the contract's [Env], the caller's
//! [MessageInfo] (absent for queries), the raw message, a [PrefixStore] over the contract's own
//! namespace, a [Querier] back into the ledger, and a VM gas budget. It reports how much of that
//! budget it used whether or not the call succeeded.
//!
//! [wasmer] is the production backend.

pub mod messages;
pub use messages::*;

pub mod wasmer;

use std::sync::Arc;

use crate::error::WasmError;
use crate::store::PrefixStore;
use crate::types::{Binary, Env, MessageInfo};

/// VmError enumerates the reasons a VM operation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("contract contains disallowed opcodes")]
    DisallowedOpcode,

    #[error("cannot compile contract: {0}")]
    Compile(String),

    /// The module compiled but does not meet the contract interface.
    #[error("invalid contract: {0}")]
    InvalidContract(String),

    #[error("no code stored under hash {0}")]
    CodeNotFound(String),

    #[error("cannot instantiate module: {0}")]
    Instantiation(String),

    #[error("ran out of gas during contract execution")]
    GasExhaustion,

    /// Trap or host failure during execution.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The contract itself reported an error.
    #[error("contract error: {0}")]
    Contract(String),

    /// The contract's output could not be understood.
    #[error("invalid contract response: {0}")]
    InvalidResponse(String),

    #[error("cache error: {0}")]
    Cache(String),
}

/// Everything a single VM entry needs besides the code.
pub struct VmCall {
    pub env: Env,
    pub info: Option<MessageInfo>,
    pub msg: Vec<u8>,
    pub store: PrefixStore,
    pub querier: Arc<dyn Querier>,
    /// Budget in VM gas.
    pub gas_limit: u64,
}

/// Result of a VM entry together with the VM gas it used, which is reported on failure too.
#[derive(Debug)]
pub struct VmOutcome<T> {
    pub result: Result<T, VmError>,
    pub gas_used: u64,
}

impl<T> VmOutcome<T> {
    pub fn ok(value: T, gas_used: u64) -> Self {
        Self {
            result: Ok(value),
            gas_used,
        }
    }

    pub fn err(error: VmError, gas_used: u64) -> Self {
        Self {
            result: Err(error),
            gas_used,
        }
    }
}

pub trait WasmVm: Send + Sync {
    /// create validates, compiles and persists `code`, returning its content hash.
    fn create(&self, code: &[u8]) -> Result<Vec<u8>, VmError>;

    /// get_code returns the bytecode that was stored under `code_hash`.
    fn get_code(&self, code_hash: &[u8]) -> Result<Vec<u8>, VmError>;

    fn instantiate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse>;

    fn execute(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse>;

    fn migrate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse>;

    /// query runs the read-only entry point. Writes to the store are refused.
    fn query(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<Binary>;
}

/// Result of a ledger query issued by a contract, with its cost in VM gas.
#[derive(Debug)]
pub struct QueryOutcome {
    pub result: Result<Binary, WasmError>,
    pub gas_used: u64,
}

/// Querier answers a contract's ledger queries. It is bound to the context of the call that is
/// running, so it is handed to the VM per call.
pub trait Querier: Send + Sync {
    /// query answers `request` within `gas_limit` VM gas.
    fn query(&self, request: &QueryRequest, gas_limit: u64) -> QueryOutcome;
}
