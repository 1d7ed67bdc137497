/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Copying byte regions across the host/guest boundary.
//!
//! Data flows into a contract through its exported `alloc`: the host asks the guest for a region,
//! fills it, and writes the region's offset into a pointer slot chosen by the guest. Data flows out
//! by the guest passing an `(offset, length)` pair.

use std::convert::TryFrom;
use wasmer::{Array, Memory, NativeFunc, WasmPtr};

use super::env::FuncError;

pub trait MemoryContext {
    fn memory(&self) -> Result<&Memory, FuncError>;

    fn alloc(&self) -> Result<&NativeFunc<u32, WasmPtr<u8, Array>>, FuncError>;

    /// write_region copies `value` into a freshly allocated guest region and stores the region's
    /// offset at `ptr_ptr`. Returns the number of bytes written.
    fn write_region(&self, value: &[u8], ptr_ptr: u32) -> Result<u32, FuncError> {
        let memory = self.memory()?;
        let len = u32::try_from(value.len()).map_err(|_| FuncError::MemoryAccess)?;

        let region = self
            .alloc()?
            .call(len)
            .map_err(|e| FuncError::Allocation(e.message()))?;
        let cells = region
            .deref(memory, 0, len)
            .ok_or(FuncError::MemoryAccess)?;
        for (cell, byte) in cells.iter().zip(value) {
            cell.set(*byte);
        }

        let slot: WasmPtr<u32, Array> = WasmPtr::new(ptr_ptr);
        let slot = slot.deref(memory, 0, 1).ok_or(FuncError::MemoryAccess)?;
        slot.first()
            .ok_or(FuncError::MemoryAccess)?
            .set(region.offset());

        Ok(len)
    }

    /// read_region copies `len` bytes starting at `offset` out of guest memory.
    fn read_region(&self, offset: u32, len: u32) -> Result<Vec<u8>, FuncError> {
        let ptr: WasmPtr<u8, Array> = WasmPtr::new(offset);
        let cells = ptr
            .deref(self.memory()?, 0, len)
            .ok_or(FuncError::MemoryAccess)?;
        Ok(cells.iter().map(|cell| cell.get()).collect())
    }
}
