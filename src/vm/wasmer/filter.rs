/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Compile-time middleware that rejects instructions whose results may differ between machines.
//!
//! Floating point, fixed width SIMD and thread atomics are refused. A rejected instruction fails
//! compilation with a message containing `OpcodeError`, which [super::module] maps to
//! [VmError::DisallowedOpcode](crate::vm::VmError::DisallowedOpcode).

use loupe::MemoryUsage;
use wasmer::{
    wasmparser::Operator, FunctionMiddleware, LocalFunctionIndex, MiddlewareError,
    MiddlewareReaderState, ModuleMiddleware,
};

/// Marker searched for in compile errors.
pub const OPCODE_ERROR: &str = "OpcodeError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperatorFamily {
    Deterministic,
    FloatingPoint,
    Simd,
    Atomic,
}

const SIMD_PREFIXES: [&str; 7] = ["V128", "I8x16", "I16x8", "I32x4", "I64x2", "F32x4", "F64x2"];

/// family classifies an operator by its mnemonic. Vector float operators count as SIMD.
pub(crate) fn family(operator: &Operator) -> OperatorFamily {
    let debug = format!("{:?}", operator);
    let name = debug
        .split(|c: char| c == ' ' || c == '{' || c == '(')
        .next()
        .unwrap_or_default();

    if SIMD_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        OperatorFamily::Simd
    } else if name.contains("Atomic") {
        OperatorFamily::Atomic
    } else if name.contains("F32") || name.contains("F64") {
        OperatorFamily::FloatingPoint
    } else {
        OperatorFamily::Deterministic
    }
}

#[derive(Debug, Clone, Copy, MemoryUsage)]
struct FilterConfig {
    allow_floating_point: bool,
    allow_simd: bool,
    allow_atomics: bool,
}

/// NonDeterminismFilter refuses every operator outside [OperatorFamily::Deterministic] unless its
/// family was explicitly allowed.
#[derive(Debug, MemoryUsage)]
pub struct NonDeterminismFilter {
    config: FilterConfig,
}

impl Default for NonDeterminismFilter {
    fn default() -> Self {
        Self {
            config: FilterConfig {
                allow_floating_point: false,
                allow_simd: false,
                allow_atomics: false,
            },
        }
    }
}

impl ModuleMiddleware for NonDeterminismFilter {
    fn generate_function_middleware(&self, _: LocalFunctionIndex) -> Box<dyn FunctionMiddleware> {
        Box::new(FunctionFilter {
            config: self.config,
        })
    }
}

#[derive(Debug)]
struct FunctionFilter {
    config: FilterConfig,
}

impl FunctionMiddleware for FunctionFilter {
    fn feed<'a>(
        &mut self,
        operator: Operator<'a>,
        state: &mut MiddlewareReaderState<'a>,
    ) -> Result<(), MiddlewareError> {
        let refused = match family(&operator) {
            OperatorFamily::Deterministic => None,
            OperatorFamily::FloatingPoint if !self.config.allow_floating_point => {
                Some("Floating Point Operations")
            }
            OperatorFamily::Simd if !self.config.allow_simd => Some("SIMD Operations"),
            OperatorFamily::Atomic if !self.config.allow_atomics => Some("Atomic Operations"),
            _ => None,
        };

        match refused {
            Some(what) => Err(MiddlewareError::new(
                " ",
                format!("{}: {}", OPCODE_ERROR, what),
            )),
            None => {
                state.push_operator(operator);
                Ok(())
            }
        }
    }
}
