/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Terra Wasm Keeper is the ledger module that stores, instantiates, executes, migrates and
//! queries gas-metered WebAssembly smart contracts on behalf of a Cosmos-style state machine.
//!
//! ```text
//! keeper(CTX, MSG) -> (CTX', EV)
//!
//! CTX = Execution context: a cache-wrapped key-value store, a gas meter and the current block
//! MSG = A wasm message: store code, instantiate, execute, migrate or update owner
//! EV  = Events emitted by the keeper and by the contracts it ran
//! ```
//!
//! ### Example
//!
//! ```rust
//! // assemble the collaborators once, register the wasm route, and deliver a message.
//! let keeper = terra_wasm_keeper::Keeper::new(vm, params, accounts, bank, router.clone(), parsers, queriers, config);
//! router.add_route("wasm", Arc::new(WasmHandler::new(keeper)));
//! let events = router.deliver(&ctx, &msg)?;
//! ```
//!
//! In summary, the [keeper] owns all contract state in the [store] of a [context], charges every
//! step on the context's [gas] meter, and hands contract code to a [vm] backend, [wasmer](vm::wasmer)
//! in production. Messages and queries a contract issues are translated by the [bindings] and
//! executed by the ledger's other modules, which the host application supplies as
//! [collaborators]. Limits come from chain [params] and node-local [config]. Failures are
//! reported as [error] values.

pub mod bindings;
pub use bindings::{LedgerMsg, MsgParserRegistry, QuerierRegistry};

pub mod collaborators;
pub use collaborators::Router;

pub mod config;
pub use config::WasmConfig;

pub mod context;
pub use context::Context;

pub mod error;
pub use error::WasmError;

pub mod gas;

pub mod keeper;
pub use keeper::{GenesisState, Keeper, WasmHandler};

pub mod params;
pub use params::Params;

pub mod store;

pub mod types;

pub mod vm;
pub use vm::wasmer::WasmerVm;
