/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines the failures that a keeper operation can report.
//!
//! Errors are values. The single exception is gas exhaustion, which unwinds with an [OutOfGas]
//! payload so that no contract or host code on the way can swallow it. Only the message-level
//! entry point ([Router::deliver](crate::collaborators::Router::deliver)) and the external query
//! service turn it back into [WasmError::OutOfGas].

use crate::vm::VmError;

/// Descriptive error definitions of the wasm keeper.
#[derive(Debug, thiserror::Error)]
pub enum WasmError {
    /// Bytecode was rejected before or during compilation.
    #[error("store wasm contract failed: {0}")]
    StoreCodeFailed(String),

    /// Uploaded bytecode is larger than `max_contract_size`.
    #[error("contract size is too huge: {size} > {max}")]
    ExceedMaxContractSize { size: u64, max: u64 },

    /// Contract message (init, execute or migrate) is larger than `max_contract_msg_size`.
    #[error("{stage} msg size is too huge: {size} > {max}")]
    ExceedMaxContractMsgSize {
        stage: &'static str,
        size: u64,
        max: u64,
    },

    /// An account already lives at the derived contract address.
    #[error("account already exists at {0}")]
    AccountExists(String),

    #[error("instantiate wasm contract failed: {0}")]
    InstantiateFailed(VmError),

    #[error("execute wasm contract failed: {0}")]
    ExecuteFailed(VmError),

    #[error("migrate wasm contract failed: {0}")]
    MigrationFailed(VmError),

    #[error("query wasm contract failed: {0}")]
    ContractQueryFailed(VmError),

    /// Code, contract or bytecode is absent from the store.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("contract is not migratable")]
    NotMigratable,

    /// The caller is not allowed to act on the target, or a contract tried to act as someone else.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A message or query payload has an unknown shape or invalid field.
    #[error("invalid msg: {0}")]
    InvalidMsg(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("no registered parser for route {0}")]
    NoRegisteredParser(String),

    #[error("no registered querier for route {0}")]
    NoRegisteredQuerier(String),

    /// No handler is registered in the message router for a translated ledger message.
    #[error("unknown request: no handler for route {0}")]
    UnknownRoute(String),

    /// Keeper state that genesis must initialise is missing, or a genesis document is invalid.
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Contracts queried each other deeper than
    /// [CONTRACT_MAX_QUERY_DEPTH](crate::keeper::contract::CONTRACT_MAX_QUERY_DEPTH).
    #[error("exceed max query depth")]
    ExceedMaxQueryDepth,

    /// Contract messages triggered further contract messages deeper than
    /// [CONTRACT_MAX_DISPATCH_DEPTH](crate::keeper::dispatch::CONTRACT_MAX_DISPATCH_DEPTH).
    #[error("exceed max dispatch depth")]
    ExceedMaxDispatchDepth,

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// Failure reported by a collaborating ledger module, e.g. insufficient funds on a bank send.
    #[error("{module}: {reason}")]
    Module { module: &'static str, reason: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Gas exhaustion surfaced at a recovery point.
    #[error("out of gas in location: {0}")]
    OutOfGas(String),
}

impl WasmError {
    pub fn module(module: &'static str, reason: impl Into<String>) -> Self {
        WasmError::Module {
            module,
            reason: reason.into(),
        }
    }
}

/// Panic payload raised when a [GasMeter](crate::gas::GasMeter) goes over its limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfGas {
    pub descriptor: String,
}

/// recover_out_of_gas catches an [OutOfGas] unwind raised by `f` and turns it into [WasmError::OutOfGas].
/// Any other panic keeps unwinding.
pub fn recover_out_of_gas<T>(f: impl FnOnce() -> Result<T, WasmError>) -> Result<T, WasmError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => match payload.downcast::<OutOfGas>() {
            Ok(out_of_gas) => Err(WasmError::OutOfGas(out_of_gas.descriptor)),
            Err(other) => std::panic::resume_unwind(other),
        },
    }
}
