/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Caps the linear memory a contract instance may reserve.

use loupe::MemoryUsage;
use std::convert::TryFrom;
use std::ptr::NonNull;
use std::sync::Arc;
use wasmer::{
    vm::{self, MemoryError, MemoryStyle, TableStyle, VMMemoryDefinition, VMTableDefinition},
    MemoryType, Pages, TableType, Tunables, WASM_PAGE_SIZE,
};

/// Largest number of pages addressable by 32-bit linear memory.
const MAX_WASM_PAGES: u32 = 65536;

/// pages_for converts a byte limit into whole pages, never more than a 32-bit memory can hold.
pub fn pages_for(limit_bytes: usize) -> Pages {
    let pages = u32::try_from(limit_bytes / WASM_PAGE_SIZE).unwrap_or(MAX_WASM_PAGES);
    Pages(pages.min(MAX_WASM_PAGES))
}

/// LimitingTunables gives every memory without a declared maximum the configured limit as its
/// maximum and refuses memories that ask for more. Everything else is delegated to `base`.
#[derive(MemoryUsage)]
pub struct LimitingTunables<T: Tunables> {
    limit: Pages,
    base: T,
}

impl<T: Tunables> LimitingTunables<T> {
    pub fn new(base: T, limit: Pages) -> Self {
        Self { limit, base }
    }

    fn adjust(&self, requested: &MemoryType) -> MemoryType {
        let mut adjusted = *requested;
        adjusted.maximum = Some(requested.maximum.unwrap_or(self.limit));
        adjusted
    }

    fn check(&self, ty: &MemoryType) -> Result<(), MemoryError> {
        let exceeded = |what: &str| {
            MemoryError::Generic(format!(
                "{} of {} pages exceeds the limit of {} pages",
                what, ty.minimum.0, self.limit.0
            ))
        };
        if ty.minimum > self.limit {
            return Err(exceeded("minimum"));
        }
        match ty.maximum {
            Some(maximum) if maximum > self.limit => Err(exceeded("maximum")),
            Some(_) => Ok(()),
            None => Err(MemoryError::Generic("memory maximum unset".to_string())),
        }
    }
}

impl<T: Tunables> Tunables for LimitingTunables<T> {
    fn memory_style(&self, memory: &MemoryType) -> MemoryStyle {
        self.base.memory_style(&self.adjust(memory))
    }

    fn table_style(&self, table: &TableType) -> TableStyle {
        self.base.table_style(table)
    }

    fn create_host_memory(
        &self,
        ty: &MemoryType,
        style: &MemoryStyle,
    ) -> Result<Arc<dyn vm::Memory>, MemoryError> {
        let adjusted = self.adjust(ty);
        self.check(&adjusted)?;
        self.base.create_host_memory(&adjusted, style)
    }

    unsafe fn create_vm_memory(
        &self,
        ty: &MemoryType,
        style: &MemoryStyle,
        vm_definition_location: NonNull<VMMemoryDefinition>,
    ) -> Result<Arc<dyn vm::Memory>, MemoryError> {
        let adjusted = self.adjust(ty);
        self.check(&adjusted)?;
        self.base
            .create_vm_memory(&adjusted, style, vm_definition_location)
    }

    fn create_host_table(
        &self,
        ty: &TableType,
        style: &TableStyle,
    ) -> Result<Arc<dyn vm::Table>, String> {
        self.base.create_host_table(ty, style)
    }

    unsafe fn create_vm_table(
        &self,
        ty: &TableType,
        style: &TableStyle,
        vm_definition_location: NonNull<VMTableDefinition>,
    ) -> Result<Arc<dyn vm::Table>, String> {
        self.base.create_vm_table(ty, style, vm_definition_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmer::{BaseTunables, Target};

    #[test]
    fn pages_are_rounded_down_and_capped() {
        assert_eq!(pages_for(WASM_PAGE_SIZE * 3 + 1), Pages(3));
        assert_eq!(pages_for(usize::MAX), Pages(MAX_WASM_PAGES));
    }

    #[test]
    fn memories_are_bounded_by_the_limit() {
        let tunables =
            LimitingTunables::new(BaseTunables::for_target(&Target::default()), Pages(16));

        let open = MemoryType::new(1u32, None, false);
        let adjusted = tunables.adjust(&open);
        assert_eq!(adjusted.maximum, Some(Pages(16)));
        assert!(tunables.check(&adjusted).is_ok());

        let greedy = MemoryType::new(32u32, None, false);
        assert!(tunables.check(&tunables.adjust(&greedy)).is_err());
    }
}
