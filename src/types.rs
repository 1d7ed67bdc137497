/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines common data structures to be used inside this library, or from outside application.
//!
//! Everything that crosses the contract boundary is JSON. Byte strings travel as base64 ([Binary]),
//! token amounts as decimal strings ([Coin]), and addresses as bech32 strings ([Address]).

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WasmError;

/// Human readable prefix of account and contract addresses.
pub const ACCOUNT_PREFIX: &str = "terra";
/// Human readable prefix of validator operator addresses.
pub const VALIDATOR_PREFIX: &str = "terravaloper";

/// Length in bytes of every account address on the ledger.
pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte account address. Contracts are accounts too.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WasmError> {
        let inner: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| WasmError::InvalidAddress(hex::encode(bytes)))?;
        Ok(Address(inner))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bech32(&self, prefix: &str) -> Result<String, WasmError> {
        let hrp = Hrp::parse(prefix).map_err(|e| WasmError::InvalidAddress(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.0).map_err(|e| WasmError::InvalidAddress(e.to_string()))
    }

    /// from_bech32 decodes `s` and checks that it carries the expected human readable prefix.
    pub fn from_bech32(s: &str, prefix: &str) -> Result<Self, WasmError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|_| WasmError::InvalidAddress(s.to_string()))?;
        if hrp.as_str() != prefix {
            return Err(WasmError::InvalidAddress(s.to_string()));
        }
        Address::from_slice(&data).map_err(|_| WasmError::InvalidAddress(s.to_string()))
    }

    /// Parses an account address in its `terra1...` form.
    pub fn parse(s: &str) -> Result<Self, WasmError> {
        Address::from_bech32(s, ACCOUNT_PREFIX)
    }

    /// Parses a validator operator address in its `terravaloper1...` form.
    pub fn parse_validator(s: &str) -> Result<Self, WasmError> {
        Address::from_bech32(s, VALIDATOR_PREFIX)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_bech32(ACCOUNT_PREFIX).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = WasmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = self
            .to_bech32(ACCOUNT_PREFIX)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Raw bytes that serialize as a base64 string.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Binary(pub Vec<u8>);

impl Binary {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Binary(bytes)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Binary(bytes.to_vec())
    }
}

impl From<Binary> for Vec<u8> {
    fn from(binary: Binary) -> Self {
        binary.0
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binary({})", hex::encode(&self.0))
    }
}

impl Serialize for Binary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Binary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Binary)
            .map_err(serde::de::Error::custom)
    }
}

/// A token amount of a single denomination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// An ordered collection of coins.
pub type Coins = Vec<Coin>;

/// coins_is_zero is true when there is nothing to transfer.
pub fn coins_is_zero(coins: &[Coin]) -> bool {
    coins.iter().all(|c| c.amount == 0)
}

/// validate_coins rejects empty denominations and duplicate denominations.
pub fn validate_coins(coins: &[Coin]) -> Result<(), WasmError> {
    let mut seen = std::collections::BTreeSet::new();
    for coin in coins {
        if coin.denom.is_empty() {
            return Err(WasmError::InvalidCoins(format!("{}", coin)));
        }
        if !seen.insert(coin.denom.as_str()) {
            return Err(WasmError::InvalidCoins(format!("duplicate denom {}", coin.denom)));
        }
    }
    Ok(())
}

mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}

/// Metadata of a piece of uploaded bytecode. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    pub code_id: u64,
    pub code_hash: Binary,
    pub creator: Address,
}

/// Metadata of an instantiated contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub address: Address,
    pub owner: Address,
    /// Changed only by migration.
    pub code_id: u64,
    pub init_msg: Binary,
    pub migratable: bool,
}

/// One entry of a contract's private store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub key: Binary,
    pub value: Binary,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A ledger event: a type tag with ordered key/value attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub ty: String,
    pub attributes: Vec<Attribute>,
}

impl Event {
    pub fn new(ty: impl Into<String>) -> Self {
        Event {
            ty: ty.into(),
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Header fields of the block currently being executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    /// Nanoseconds since the Unix epoch.
    pub time: u64,
    pub chain_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEnv {
    pub address: Address,
}

/// Environment handed to every contract entry point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub block: BlockInfo,
    pub contract: ContractEnv,
}

impl Env {
    pub fn new(block: BlockInfo, contract: Address) -> Self {
        Env {
            block,
            contract: ContractEnv { address: contract },
        }
    }
}

/// Who triggered the call and what they sent along. Absent for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub sender: Address,
    pub funds: Coins,
}
