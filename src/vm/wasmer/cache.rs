/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! On-disk home of stored code.
//!
//! Two things are kept per code hash: the original bytecode under `wasm/<hex hash>.wasm`, needed
//! to serve `bytecode` queries and genesis export, and the compiled module in a
//! [FileSystemCache], so that a restarted node does not recompile every contract it runs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use wasmer::Module;
use wasmer_cache::{Cache, FileSystemCache, Hash};

use crate::vm::VmError;

const BYTECODE_DIR: &str = "wasm";
const MODULE_DIR: &str = "modules";

#[derive(Clone)]
pub struct CodeCache {
    root: PathBuf,
    modules: Arc<RwLock<FileSystemCache>>,
}

impl CodeCache {
    /// open creates the cache directories under `dir` if they do not exist yet.
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, VmError> {
        let root: PathBuf = dir.into();
        std::fs::create_dir_all(root.join(BYTECODE_DIR)).map_err(cache_error)?;
        let modules = FileSystemCache::new(root.join(MODULE_DIR)).map_err(cache_error)?;
        Ok(Self {
            root,
            modules: Arc::new(RwLock::new(modules)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.root
    }

    pub fn save_code(&self, code_hash: &[u8], code: &[u8]) -> Result<(), VmError> {
        std::fs::write(self.code_path(code_hash), code).map_err(cache_error)
    }

    /// load_code returns `None` if nothing was saved under `code_hash`.
    pub fn load_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, VmError> {
        match std::fs::read(self.code_path(code_hash)) {
            Ok(code) => Ok(Some(code)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(cache_error(e)),
        }
    }

    pub fn save_module(&self, code_hash: &[u8], module: &Module) -> Result<(), VmError> {
        let key = module_key(code_hash)?;
        self.modules
            .write()
            .map_err(|_| VmError::Cache("module cache poisoned".to_string()))?
            .store(key, module)
            .map_err(cache_error)
    }

    /// load_module deserializes a previously compiled module. Any failure is reported as a miss,
    /// the caller recompiles from bytecode.
    pub fn load_module(&self, code_hash: &[u8], store: &wasmer::Store) -> Option<Module> {
        let key = module_key(code_hash).ok()?;
        let modules = self.modules.read().ok()?;
        // SAFETY: the directory is only written by this node, with the same engine.
        unsafe { modules.load(store, key) }.ok()
    }

    fn code_path(&self, code_hash: &[u8]) -> PathBuf {
        self.root
            .join(BYTECODE_DIR)
            .join(format!("{}.wasm", hex::encode(code_hash)))
    }
}

fn module_key(code_hash: &[u8]) -> Result<Hash, VmError> {
    let bytes: [u8; 32] = code_hash
        .try_into()
        .map_err(|_| VmError::Cache(format!("code hash of {} bytes", code_hash.len())))?;
    Ok(Hash::new(bytes))
}

fn cache_error(e: impl std::fmt::Display) -> VmError {
    VmError::Cache(e.to_string())
}
