/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions a contract imports from the `env` namespace.
//!
//! Region outputs follow one convention: the host allocates a guest region, writes its offset to
//! the `*_ptr_ptr` slot, and returns the length.

use ed25519_dalek::Verifier;
use sha2::{Digest, Sha256};
use wasmer::{imports, Function, ImportObject, Store, Type};

use super::env::{FuncError, HostEnv};
use crate::error::WasmError;
use crate::gas;
use crate::vm::{QueryRequest, QueryResult};

/// Namespace of every import.
pub const IMPORT_MODULE: &str = "env";

const I32: Type = Type::I32;

/// Name and signature of every function a contract may import. Anything else is rejected when the
/// code is stored.
pub const IMPORTS: [(&str, &[Type], &[Type]); 12] = [
    ("db_read", &[I32, I32, I32], &[Type::I64]),
    ("db_write", &[I32, I32, I32, I32], &[]),
    ("db_remove", &[I32, I32], &[]),
    ("env", &[I32], &[I32]),
    ("info", &[I32], &[I32]),
    ("msg", &[I32], &[I32]),
    ("query_chain", &[I32, I32, I32], &[I32]),
    ("set_response", &[I32, I32], &[]),
    ("abort", &[I32, I32], &[]),
    ("sha256", &[I32, I32, I32], &[]),
    ("ed25519_verify", &[I32, I32, I32, I32], &[I32]),
    ("debug", &[I32, I32], &[]),
];

/// import_object binds every import to `env`. Storage writes are replaced by trapping stubs when
/// the call is read-only.
pub fn import_object(store: &Store, env: &HostEnv) -> ImportObject {
    let (db_write_fn, db_remove_fn) = if env.call.read_only {
        (
            Function::new_native(store, not_callable::db_write),
            Function::new_native(store, not_callable::db_remove),
        )
    } else {
        (
            Function::new_native_with_env(store, env.clone(), db_write),
            Function::new_native_with_env(store, env.clone(), db_remove),
        )
    };

    imports! {
        "env" => {
            "db_read" => Function::new_native_with_env(store, env.clone(), db_read),
            "db_write" => db_write_fn,
            "db_remove" => db_remove_fn,
            "env" => Function::new_native_with_env(store, env.clone(), contract_env),
            "info" => Function::new_native_with_env(store, env.clone(), info),
            "msg" => Function::new_native_with_env(store, env.clone(), msg),
            "query_chain" => Function::new_native_with_env(store, env.clone(), query_chain),
            "set_response" => Function::new_native_with_env(store, env.clone(), set_response),
            "abort" => Function::new_native_with_env(store, env.clone(), abort),
            "sha256" => Function::new_native_with_env(store, env.clone(), sha256),
            "ed25519_verify" => Function::new_native_with_env(store, env.clone(), ed25519_verify),
            "debug" => Function::new_native_with_env(store, env.clone(), debug),
        }
    }
}

/// db_read returns the value's length, or -1 if the key is absent.
fn db_read(
    env: &HostEnv,
    key_ptr: u32,
    key_len: u32,
    val_ptr_ptr: u32,
) -> Result<i64, FuncError> {
    let key = env.read_bytes(key_ptr, key_len)?;
    let value = env.call.store.read(&key);
    env.consume_gas(gas::db_read_cost(value.as_ref().map_or(0, Vec::len)))?;
    match value {
        Some(value) => Ok(env.write_bytes(&value, val_ptr_ptr)? as i64),
        None => Ok(-1),
    }
}

fn db_write(
    env: &HostEnv,
    key_ptr: u32,
    key_len: u32,
    val_ptr: u32,
    val_len: u32,
) -> Result<(), FuncError> {
    let key = env.read_bytes(key_ptr, key_len)?;
    let value = env.read_bytes(val_ptr, val_len)?;
    env.consume_gas(gas::db_write_cost(key.len(), value.len()))?;
    env.call.store.write(&key, &value);
    Ok(())
}

fn db_remove(env: &HostEnv, key_ptr: u32, key_len: u32) -> Result<(), FuncError> {
    let key = env.read_bytes(key_ptr, key_len)?;
    env.consume_gas(gas::DB_REMOVE_COST)?;
    env.call.store.remove(&key);
    Ok(())
}

/// `env`: JSON of the block and contract the call runs in.
fn contract_env(env: &HostEnv, env_ptr_ptr: u32) -> Result<u32, FuncError> {
    env.write_json(&env.call.env, env_ptr_ptr)
}

/// `info`: JSON of the sender and the funds sent, `null` for queries.
fn info(env: &HostEnv, info_ptr_ptr: u32) -> Result<u32, FuncError> {
    env.write_json(&env.call.info, info_ptr_ptr)
}

fn msg(env: &HostEnv, msg_ptr_ptr: u32) -> Result<u32, FuncError> {
    env.write_bytes(&env.call.msg, msg_ptr_ptr)
}

/// query_chain answers a JSON [QueryRequest] with a JSON [QueryResult]. A failing query is
/// reported to the contract, it does not trap. Running out of gas does, also inside the query.
fn query_chain(
    env: &HostEnv,
    req_ptr: u32,
    req_len: u32,
    res_ptr_ptr: u32,
) -> Result<u32, FuncError> {
    let request = env.read_bytes(req_ptr, req_len)?;
    let result = match serde_json::from_slice::<QueryRequest>(&request) {
        Ok(request) => {
            let outcome = env.call.querier.query(&request, env.remaining_gas());
            env.consume_gas(outcome.gas_used)?;
            match outcome.result {
                Ok(answer) => QueryResult::Ok(answer),
                Err(WasmError::OutOfGas(_)) => return Err(FuncError::GasExhaustion),
                Err(e) => QueryResult::Error(e.to_string()),
            }
        }
        Err(e) => QueryResult::Error(format!("invalid query request: {}", e)),
    };
    env.write_json(&result, res_ptr_ptr)
}

fn set_response(env: &HostEnv, ptr: u32, len: u32) -> Result<(), FuncError> {
    let response = env.read_bytes(ptr, len)?;
    env.call.output().response = Some(response);
    Ok(())
}

/// abort records the contract's error message and traps.
fn abort(env: &HostEnv, ptr: u32, len: u32) -> Result<(), FuncError> {
    let message = String::from_utf8_lossy(&env.read_bytes(ptr, len)?).into_owned();
    env.call.output().abort = Some(message.clone());
    Err(FuncError::Aborted(message))
}

fn sha256(
    env: &HostEnv,
    msg_ptr: u32,
    msg_len: u32,
    digest_ptr_ptr: u32,
) -> Result<(), FuncError> {
    let input = env.read_bytes(msg_ptr, msg_len)?;
    env.consume_gas(gas::CRYPTO_SHA256_PER_BYTE.saturating_mul(input.len() as u64))?;
    let digest = Sha256::digest(&input);
    env.write_bytes(digest.as_slice(), digest_ptr_ptr)?;
    Ok(())
}

/// ed25519_verify returns 1 if the 64-byte signature at `sig_ptr` over the message was produced by
/// the 32-byte public key at `pk_ptr`, 0 otherwise.
fn ed25519_verify(
    env: &HostEnv,
    msg_ptr: u32,
    msg_len: u32,
    sig_ptr: u32,
    pk_ptr: u32,
) -> Result<i32, FuncError> {
    let message = env.read_bytes(msg_ptr, msg_len)?;
    let signature = env.read_bytes(sig_ptr, 64)?;
    let public_key = env.read_bytes(pk_ptr, 32)?;
    env.consume_gas(
        gas::CRYPTO_ED25519_VERIFY_BASE_COST
            .saturating_add(gas::CRYPTO_ED25519_PER_BYTE.saturating_mul(message.len() as u64)),
    )?;
    Ok(verify_ed25519(&message, &signature, &public_key) as i32)
}

pub(crate) fn verify_ed25519(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let (Ok(signature), Ok(public_key)) = (
        <[u8; 64]>::try_from(signature),
        <[u8; 32]>::try_from(public_key),
    ) else {
        return false;
    };
    match ed25519_dalek::VerifyingKey::from_bytes(&public_key) {
        Ok(key) => key
            .verify(message, &ed25519_dalek::Signature::from_bytes(&signature))
            .is_ok(),
        Err(_) => false,
    }
}

/// debug forwards a contract's debug message to the node's log.
fn debug(env: &HostEnv, ptr: u32, len: u32) -> Result<(), FuncError> {
    let message = env.read_bytes(ptr, len)?;
    tracing::debug!(
        contract = %env.call.env.contract.address,
        message = %String::from_utf8_lossy(&message),
        "contract debug"
    );
    Ok(())
}

/// Stand-ins that trap when a read-only call tries to modify state.
mod not_callable {
    use super::FuncError;

    pub(super) fn db_write(_: u32, _: u32, _: u32, _: u32) -> Result<(), FuncError> {
        Err(FuncError::NotCallable("db_write"))
    }

    pub(super) fn db_remove(_: u32, _: u32) -> Result<(), FuncError> {
        Err(FuncError::NotCallable("db_remove"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn ed25519_signatures_are_checked() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let public_key = signing_key.verifying_key().to_bytes();
        let signature = signing_key.sign(b"payload").to_bytes();

        assert!(verify_ed25519(b"payload", &signature, &public_key));
        assert!(!verify_ed25519(b"tampered", &signature, &public_key));
        assert!(!verify_ed25519(b"payload", &signature[..63], &public_key));
    }
}
