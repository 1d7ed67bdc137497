/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [WasmVm] backed by [Wasmer](https://wasmer.io/).
//!
//! Code is compiled once by a [store] configured with the determinism [filter], instruction
//! metering and optional memory [tunables]. Compiled modules are kept in memory and, when a
//! directory is configured, in an on-disk [cache] together with their bytecode. Each call gets a
//! fresh [instance] whose imports are the [host_functions], bound to a per-call [env].

pub mod cache;
pub mod env;
pub mod filter;
pub mod host_functions;
pub mod instance;
pub mod memory;
pub mod module;
pub mod store;
pub mod tunables;

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use sha2::{Digest, Sha256};

use self::cache::CodeCache;
use self::instance::run_entry;
use self::module::{ENTRY_EXECUTE, ENTRY_INSTANTIATE, ENTRY_MIGRATE, ENTRY_QUERY};
use crate::config::WasmConfig;
use crate::types::Binary;
use crate::vm::{ContractResponse, VmCall, VmError, VmOutcome, WasmVm};

pub struct WasmerVm {
    store: wasmer::Store,
    modules: RwLock<HashMap<Vec<u8>, wasmer::Module>>,
    codes: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    cache: Option<CodeCache>,
}

impl WasmerVm {
    /// new builds a VM that keeps everything in memory.
    pub fn new(memory_limit: Option<usize>) -> Self {
        Self {
            store: store::contract_store(memory_limit),
            modules: RwLock::new(HashMap::new()),
            codes: RwLock::new(HashMap::new()),
            cache: None,
        }
    }

    /// with_cache additionally persists bytecode and compiled modules under `cache`.
    pub fn with_cache(memory_limit: Option<usize>, cache: CodeCache) -> Self {
        Self {
            cache: Some(cache),
            ..Self::new(memory_limit)
        }
    }

    pub fn from_config(config: &WasmConfig) -> Result<Self, VmError> {
        match &config.cache_dir {
            Some(dir) => Ok(Self::with_cache(
                config.contract_memory_limit,
                CodeCache::open(dir)?,
            )),
            None => Ok(Self::new(config.contract_memory_limit)),
        }
    }

    /// module returns the compiled module for `code_hash`, looking in memory, then in the on-disk
    /// module cache, then recompiling stored bytecode.
    fn module(&self, code_hash: &[u8]) -> Result<wasmer::Module, VmError> {
        if let Some(module) = self
            .modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code_hash)
        {
            return Ok(module.clone());
        }

        let module = match self
            .cache
            .as_ref()
            .and_then(|cache| cache.load_module(code_hash, &self.store))
        {
            Some(module) => module,
            None => {
                let code = self.get_code(code_hash)?;
                let module = module::compile(&self.store, &code)?;
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.save_module(code_hash, &module) {
                        tracing::warn!(error = %e, "cannot cache compiled module");
                    }
                }
                module
            }
        };
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code_hash.to_vec(), module.clone());
        Ok(module)
    }

    fn run(
        &self,
        code_hash: &[u8],
        entry: &str,
        call: VmCall,
        read_only: bool,
    ) -> (Result<Option<Vec<u8>>, VmError>, u64) {
        let module = match self.module(code_hash) {
            Ok(module) => module,
            Err(e) => return (Err(e), 0),
        };
        let (result, gas_used) = run_entry(&self.store, &module, entry, call, read_only);
        (result.map(|output| output.response), gas_used)
    }

    fn run_with_response(
        &self,
        code_hash: &[u8],
        entry: &str,
        call: VmCall,
    ) -> VmOutcome<ContractResponse> {
        let (result, gas_used) = self.run(code_hash, entry, call, false);
        let result = result.and_then(|response| match response {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VmError::InvalidResponse(e.to_string())),
            None => Ok(ContractResponse::default()),
        });
        VmOutcome { result, gas_used }
    }
}

impl WasmVm for WasmerVm {
    fn create(&self, code: &[u8]) -> Result<Vec<u8>, VmError> {
        let module = module::compile(&self.store, code)?;
        module::validate(&module)?;
        let code_hash = Sha256::digest(code).to_vec();

        if let Some(cache) = &self.cache {
            cache.save_code(&code_hash, code)?;
            if let Err(e) = cache.save_module(&code_hash, &module) {
                tracing::warn!(error = %e, "cannot cache compiled module");
            }
        }
        self.codes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code_hash.clone(), code.to_vec());
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(code_hash.clone(), module);
        Ok(code_hash)
    }

    fn get_code(&self, code_hash: &[u8]) -> Result<Vec<u8>, VmError> {
        if let Some(code) = self
            .codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code_hash)
        {
            return Ok(code.clone());
        }
        let cached = match &self.cache {
            Some(cache) => cache.load_code(code_hash)?,
            None => None,
        };
        cached.ok_or_else(|| VmError::CodeNotFound(hex::encode(code_hash)))
    }

    fn instantiate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        self.run_with_response(code_hash, ENTRY_INSTANTIATE, call)
    }

    fn execute(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        self.run_with_response(code_hash, ENTRY_EXECUTE, call)
    }

    fn migrate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        self.run_with_response(code_hash, ENTRY_MIGRATE, call)
    }

    fn query(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<Binary> {
        let (result, gas_used) = self.run(code_hash, ENTRY_QUERY, call, true);
        VmOutcome {
            result: result.map(|response| Binary(response.unwrap_or_default())),
            gas_used,
        }
    }
}
