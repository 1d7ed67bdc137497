/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Layout of the keeper's state in the module store.
//!
//! |Key|Value|
//! |---|---|
//! |`0x01`|last code id, u64 big-endian|
//! |`0x02`|last instance id, u64 big-endian|
//! |`0x03` ‖ code id (u64 big-endian)|[CodeInfo](crate::types::CodeInfo) JSON|
//! |`0x04` ‖ contract address|[ContractInfo](crate::types::ContractInfo) JSON|
//! |`0x05` ‖ contract address ‖ key|contract's own store|

use sha2::{Digest, Sha256};

use crate::types::{Address, ADDRESS_LENGTH};

pub const LAST_CODE_ID_KEY: &[u8] = &[0x01];
pub const LAST_INSTANCE_ID_KEY: &[u8] = &[0x02];
pub const CODE_KEY_PREFIX: &[u8] = &[0x03];
pub const CONTRACT_INFO_KEY_PREFIX: &[u8] = &[0x04];
pub const CONTRACT_STORE_KEY_PREFIX: &[u8] = &[0x05];

pub fn code_key(code_id: u64) -> Vec<u8> {
    [CODE_KEY_PREFIX, &code_id.to_be_bytes()].concat()
}

pub fn contract_info_key(address: &Address) -> Vec<u8> {
    [CONTRACT_INFO_KEY_PREFIX, address.as_bytes()].concat()
}

/// contract_store_prefix is the namespace of a contract's own key-value store.
pub fn contract_store_prefix(address: &Address) -> Vec<u8> {
    [CONTRACT_STORE_KEY_PREFIX, address.as_bytes()].concat()
}

/// derive_address computes the address of the `instance_id`-th contract, counted across all codes,
/// instantiated from `code_id`.
///
/// The pair is packed into one u64 as `code_id << 32 + instance_id`, written as an unsigned varint
/// after the tag byte `'C'` into a zeroed 20-byte buffer, and hashed with sha256. The first 20
/// bytes of the digest are the address.
pub fn derive_address(code_id: u64, instance_id: u64) -> Address {
    let contract_id = (code_id << 32).wrapping_add(instance_id);
    let mut buf = [0u8; ADDRESS_LENGTH];
    buf[0] = b'C';
    put_uvarint(&mut buf[1..], contract_id);

    let digest = Sha256::digest(buf);
    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&digest[..ADDRESS_LENGTH]);
    Address(address)
}

/// put_uvarint writes `value` as LEB128 into `buf` and returns the number of bytes written. A u64
/// takes at most 10 bytes.
fn put_uvarint(buf: &mut [u8], mut value: u64) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}
