/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Gas accounting.
//!
//! Two units are in play. Native gas is what a transaction pays for and what a [GasMeter] counts.
//! VM gas is the finer unit the metering middleware decrements per WASM instruction. They are
//! related by `Params::gas_multiplier` (VM gas per native gas). [accountant] does the conversions,
//! [constants] holds the prices.

pub mod accountant;
pub use accountant::*;

pub mod constants;
pub use constants::*;

pub mod meter;
pub use meter::*;
