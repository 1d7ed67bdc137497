/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Uploading bytecode.

use std::io::Read;

use flate2::read::GzDecoder;

use super::Keeper;
use crate::context::Context;
use crate::error::WasmError;
use crate::gas;
use crate::types::{Address, Binary, CodeInfo};

/// Leading bytes of a gzip member using deflate.
const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Leading bytes of a WASM binary module.
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

impl Keeper {
    /// compile_code checks the upload's size, decompresses it if needed, charges the compile cost
    /// and hands the code to the VM. Returns the code hash.
    pub fn compile_code(&self, ctx: &Context, wasm_code: &[u8]) -> Result<Vec<u8>, WasmError> {
        let max_contract_size = self.params(ctx).max_contract_size;
        if wasm_code.len() as u64 > max_contract_size {
            return Err(WasmError::ExceedMaxContractSize {
                size: wasm_code.len() as u64,
                max: max_contract_size,
            });
        }

        let wasm_code = uncompress(wasm_code, max_contract_size)?;

        ctx.gas_meter()
            .consume_gas(gas::compile_costs(wasm_code.len()), "compiling wasm bytes");

        self.vm
            .create(&wasm_code)
            .map_err(|e| WasmError::StoreCodeFailed(e.to_string()))
    }

    /// store_code uploads `wasm_code` and registers it under the next code id.
    pub fn store_code(
        &self,
        ctx: &Context,
        creator: &Address,
        wasm_code: &[u8],
    ) -> Result<u64, WasmError> {
        let code_hash = self.compile_code(ctx, wasm_code)?;
        let code_id = self.next_code_id(ctx)?;
        self.set_code_info(
            ctx,
            &CodeInfo {
                code_id,
                code_hash: Binary(code_hash),
                creator: *creator,
            },
        )?;
        tracing::debug!(code_id, creator = %creator, "stored new contract code");
        Ok(code_id)
    }

    /// get_byte_code returns the (decompressed) bytecode stored under `code_id`.
    pub fn get_byte_code(&self, ctx: &Context, code_id: u64) -> Result<Vec<u8>, WasmError> {
        let code_info = self.get_code_info(ctx, code_id)?;
        self.vm
            .get_code(code_info.code_hash.as_slice())
            .map_err(|e| WasmError::NotFound(e.to_string()))
    }
}

/// uncompress returns `code` as a raw module. Gzip input is inflated up to `limit` bytes, anything
/// that is neither gzip nor a WASM module is rejected.
pub(crate) fn uncompress(code: &[u8], limit: u64) -> Result<Vec<u8>, WasmError> {
    if code.starts_with(&WASM_MAGIC) {
        return Ok(code.to_vec());
    }
    if !code.starts_with(&GZIP_MAGIC) {
        return Err(WasmError::StoreCodeFailed(
            "code is neither wasm nor gzip".to_string(),
        ));
    }

    let mut inflated = Vec::new();
    GzDecoder::new(code)
        .take(limit.saturating_add(1))
        .read_to_end(&mut inflated)
        .map_err(|e| WasmError::StoreCodeFailed(format!("cannot uncompress: {}", e)))?;
    if inflated.len() as u64 > limit {
        return Err(WasmError::ExceedMaxContractSize {
            size: inflated.len() as u64,
            max: limit,
        });
    }
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn raw_wasm_passes_through() {
        let code = [&WASM_MAGIC[..], &[1, 0, 0, 0]].concat();
        assert_eq!(uncompress(&code, 1024).unwrap(), code);
    }

    #[test]
    fn gzip_is_inflated() {
        let code = [&WASM_MAGIC[..], &[1, 0, 0, 0]].concat();
        assert_eq!(uncompress(&gzip(&code), 1024).unwrap(), code);
    }

    #[test]
    fn inflation_is_bounded() {
        let bomb = gzip(&vec![0u8; 4096]);
        assert!(matches!(
            uncompress(&bomb, 1024),
            Err(WasmError::ExceedMaxContractSize { max: 1024, .. })
        ));
    }

    #[test]
    fn other_formats_are_rejected() {
        assert!(matches!(
            uncompress(b"PK\x03\x04", 1024),
            Err(WasmError::StoreCodeFailed(_))
        ));
    }
}
