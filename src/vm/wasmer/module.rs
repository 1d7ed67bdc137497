/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Compiling stored code and checking it against the contract interface.

use wasmer::{ExternType, FunctionType, Store, Type};

use super::filter::OPCODE_ERROR;
use super::host_functions::{IMPORTS, IMPORT_MODULE};
use crate::vm::VmError;

pub const ENTRY_INSTANTIATE: &str = "instantiate";
pub const ENTRY_EXECUTE: &str = "execute";
pub const ENTRY_MIGRATE: &str = "migrate";
pub const ENTRY_QUERY: &str = "query";

/// Entry points every contract exports. `migrate` is optional: without it, migrating to the code
/// fails at call time.
const REQUIRED_ENTRIES: [&str; 3] = [ENTRY_INSTANTIATE, ENTRY_EXECUTE, ENTRY_QUERY];

/// compile turns bytecode into a module, running the determinism filter over every function.
pub fn compile(store: &Store, code: &[u8]) -> Result<wasmer::Module, VmError> {
    wasmer::Module::from_binary(store, code).map_err(|e| {
        let reason = e.to_string();
        if reason.contains(OPCODE_ERROR) {
            VmError::DisallowedOpcode
        } else {
            VmError::Compile(reason)
        }
    })
}

/// validate checks the module's exports and imports without instantiating it.
pub fn validate(module: &wasmer::Module) -> Result<(), VmError> {
    if module.exports().memories().next().is_none() {
        return Err(invalid("no exported memory"));
    }

    let exported = |name: &str| {
        module
            .exports()
            .functions()
            .find(|f| f.name() == name)
            .map(|f| f.ty().clone())
    };
    match exported("alloc") {
        Some(ty) if has_signature(&ty, &[Type::I32], &[Type::I32]) => {}
        Some(_) => return Err(invalid("alloc must take and return an i32")),
        None => return Err(invalid("missing export alloc")),
    }
    for entry in REQUIRED_ENTRIES {
        match exported(entry) {
            Some(ty) if has_signature(&ty, &[], &[]) => {}
            Some(_) => return Err(invalid(format!("{} must take and return nothing", entry))),
            None => return Err(invalid(format!("missing export {}", entry))),
        }
    }
    if let Some(ty) = exported(ENTRY_MIGRATE) {
        if !has_signature(&ty, &[], &[]) {
            return Err(invalid("migrate must take and return nothing"));
        }
    }

    for import in module.imports() {
        let known = IMPORTS
            .iter()
            .find(|(name, _, _)| import.module() == IMPORT_MODULE && import.name() == *name);
        let Some((_, params, results)) = known else {
            return Err(invalid(format!(
                "unknown import {}.{}",
                import.module(),
                import.name()
            )));
        };
        match import.ty() {
            ExternType::Function(ty) if has_signature(ty, params, results) => {}
            _ => {
                return Err(invalid(format!(
                    "import {} has the wrong signature",
                    import.name()
                )))
            }
        }
    }
    Ok(())
}

fn has_signature(ty: &FunctionType, params: &[Type], results: &[Type]) -> bool {
    ty.params() == params && ty.results() == results
}

fn invalid(reason: impl Into<String>) -> VmError {
    VmError::InvalidContract(reason.into())
}
