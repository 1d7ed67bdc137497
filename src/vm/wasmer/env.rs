/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! State shared between one contract call and the host functions it imports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wasmer::{Array, Global, LazyInit, Memory, NativeFunc, Value, WasmPtr};

use super::memory::MemoryContext;
use crate::gas;
use crate::store::PrefixStore;
use crate::types::{Env, MessageInfo};
use crate::vm::{Querier, VmCall};

/// FuncError is raised by a host function to trap the running contract.
#[derive(Debug, thiserror::Error)]
pub enum FuncError {
    #[error("out of gas")]
    GasExhaustion,

    /// The contract called `abort`.
    #[error("aborted: {0}")]
    Aborted(String),

    #[error("{0} cannot be called in this context")]
    NotCallable(&'static str),

    #[error("memory access out of bounds")]
    MemoryAccess,

    #[error("guest allocation failed: {0}")]
    Allocation(String),

    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

/// What the contract produced through `set_response` and `abort`.
#[derive(Debug, Default)]
pub struct CallOutput {
    pub response: Option<Vec<u8>>,
    pub abort: Option<String>,
}

/// Inputs of the call, fixed for its whole duration.
pub struct CallState {
    pub env: Env,
    pub info: Option<MessageInfo>,
    pub msg: Vec<u8>,
    pub store: PrefixStore,
    pub querier: Arc<dyn Querier>,
    /// Set for queries: storage writes trap.
    pub read_only: bool,
    output: Mutex<CallOutput>,
}

impl CallState {
    pub fn new(call: VmCall, read_only: bool) -> Self {
        Self {
            env: call.env,
            info: call.info,
            msg: call.msg,
            store: call.store,
            querier: call.querier,
            read_only,
            output: Mutex::new(CallOutput::default()),
        }
    }

    pub fn output(&self) -> MutexGuard<'_, CallOutput> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// HostEnv is cloned into every imported function of an instance.
#[derive(wasmer::WasmerEnv, Clone)]
pub struct HostEnv {
    pub call: Arc<CallState>,

    /// The metering middleware's remaining-points global, bound after instantiation.
    gas: Arc<Mutex<Option<Global>>>,

    #[wasmer(export)]
    pub memory: LazyInit<Memory>,

    #[wasmer(export(name = "alloc"))]
    pub alloc: LazyInit<NativeFunc<u32, WasmPtr<u8, Array>>>,
}

impl HostEnv {
    pub fn new(call: CallState) -> Self {
        Self {
            call: Arc::new(call),
            gas: Arc::new(Mutex::new(None)),
            memory: LazyInit::default(),
            alloc: LazyInit::default(),
        }
    }

    pub fn bind_gas_global(&self, global: Global) {
        *self.gas_slot() = Some(global);
    }

    /// remaining_gas is what is left of the call's VM budget. Zero before the global is bound.
    pub fn remaining_gas(&self) -> u64 {
        match self.gas_slot().as_ref().map(Global::get) {
            Some(Value::I64(points)) => points as u64,
            _ => 0,
        }
    }

    /// consume_gas takes `amount` VM gas from the instance's meter. If less is left, the meter is
    /// drained and the call traps.
    pub fn consume_gas(&self, amount: u64) -> Result<(), FuncError> {
        let slot = self.gas_slot();
        let global = slot
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("gas meter not bound to instance"))?;
        let remaining = match global.get() {
            Value::I64(points) => points as u64,
            _ => 0,
        };
        let (left, result) = match remaining.checked_sub(amount) {
            Some(left) => (left, Ok(())),
            None => (0, Err(FuncError::GasExhaustion)),
        };
        global
            .set(Value::I64(left as i64))
            .map_err(|e| anyhow::anyhow!("cannot update gas meter: {}", e.message()))?;
        result
    }

    /// read_bytes copies a guest region, charging for the copy first.
    pub fn read_bytes(&self, offset: u32, len: u32) -> Result<Vec<u8>, FuncError> {
        self.consume_gas(gas::wasm_memory_read_cost(len as usize))?;
        self.read_region(offset, len)
    }

    /// write_bytes hands `value` to the guest, charging for the copy first.
    pub fn write_bytes(&self, value: &[u8], ptr_ptr: u32) -> Result<u32, FuncError> {
        self.consume_gas(gas::wasm_memory_write_cost(value.len()))?;
        self.write_region(value, ptr_ptr)
    }

    /// write_json serializes `value` and hands it to the guest.
    pub fn write_json<T: serde::Serialize>(
        &self,
        value: &T,
        ptr_ptr: u32,
    ) -> Result<u32, FuncError> {
        let bytes = serde_json::to_vec(value).map_err(anyhow::Error::from)?;
        self.write_bytes(&bytes, ptr_ptr)
    }

    fn gas_slot(&self) -> MutexGuard<'_, Option<Global>> {
        self.gas.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryContext for HostEnv {
    fn memory(&self) -> Result<&Memory, FuncError> {
        self.memory_ref()
            .ok_or_else(|| FuncError::Runtime(anyhow::anyhow!("memory export not initialized")))
    }

    fn alloc(&self) -> Result<&NativeFunc<u32, WasmPtr<u8, Array>>, FuncError> {
        self.alloc_ref()
            .ok_or_else(|| FuncError::Runtime(anyhow::anyhow!("alloc export not initialized")))
    }
}

/// Budgets above `i64::MAX` cannot be represented by the metering global.
pub(crate) fn clamp_points(points: u64) -> u64 {
    points.min(i64::MAX as u64)
}
