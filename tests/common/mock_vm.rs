//! A [WasmVm] whose contracts are Rust closures, for exercising the keeper without compiling WASM.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use terra_wasm_keeper::types::{Attribute, Binary};
use terra_wasm_keeper::vm::{
    ContractResponse, CosmosMsg, QueryRequest, VmCall, VmError, VmOutcome, WasmMsg, WasmQuery,
    WasmVm,
};
use terra_wasm_keeper::WasmError;

/// VM gas every mock entry point uses before doing anything else.
pub const BASE_VM_GAS: u64 = 1_000;

/// Bytes stored as code. Starts with the WASM magic so that the keeper takes it as a raw module.
pub fn mock_code(tag: u8) -> Vec<u8> {
    vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00, tag]
}

/// Behaviour of one piece of mock code.
pub trait MockContract: Send + Sync {
    fn instantiate(&self, call: &VmCall) -> VmOutcome<ContractResponse>;
    fn execute(&self, call: &VmCall) -> VmOutcome<ContractResponse>;
    fn migrate(&self, call: &VmCall) -> VmOutcome<ContractResponse>;
    fn query(&self, call: &VmCall) -> VmOutcome<Binary>;
}

#[derive(Default)]
pub struct MockVm {
    codes: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    contracts: Mutex<HashMap<Vec<u8>, Arc<dyn MockContract>>>,
}

impl MockVm {
    pub fn new() -> Self {
        Self::default()
    }

    /// register binds `contract` to `code`. The code still has to be stored through the keeper.
    pub fn register(&self, code: &[u8], contract: Arc<dyn MockContract>) {
        self.contracts
            .lock()
            .unwrap()
            .insert(code_hash(code), contract);
    }

    fn contract(&self, code_hash: &[u8]) -> Option<Arc<dyn MockContract>> {
        self.contracts.lock().unwrap().get(code_hash).cloned()
    }
}

pub fn code_hash(code: &[u8]) -> Vec<u8> {
    Sha256::digest(code).to_vec()
}

impl WasmVm for MockVm {
    fn create(&self, code: &[u8]) -> Result<Vec<u8>, VmError> {
        if code.ends_with(b"invalid") {
            return Err(VmError::InvalidContract("rejected by mock".to_string()));
        }
        let hash = code_hash(code);
        self.codes.lock().unwrap().insert(hash.clone(), code.to_vec());
        Ok(hash)
    }

    fn get_code(&self, code_hash: &[u8]) -> Result<Vec<u8>, VmError> {
        self.codes
            .lock()
            .unwrap()
            .get(code_hash)
            .cloned()
            .ok_or_else(|| VmError::CodeNotFound(hex::encode(code_hash)))
    }

    fn instantiate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        match self.contract(code_hash) {
            Some(contract) => contract.instantiate(&call),
            None => VmOutcome::err(VmError::CodeNotFound(hex::encode(code_hash)), 0),
        }
    }

    fn execute(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        match self.contract(code_hash) {
            Some(contract) => contract.execute(&call),
            None => VmOutcome::err(VmError::CodeNotFound(hex::encode(code_hash)), 0),
        }
    }

    fn migrate(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<ContractResponse> {
        match self.contract(code_hash) {
            Some(contract) => contract.migrate(&call),
            None => VmOutcome::err(VmError::CodeNotFound(hex::encode(code_hash)), 0),
        }
    }

    fn query(&self, code_hash: &[u8], call: VmCall) -> VmOutcome<Binary> {
        match self.contract(code_hash) {
            Some(contract) => contract.query(&call),
            None => VmOutcome::err(VmError::CodeNotFound(hex::encode(code_hash)), 0),
        }
    }
}

/// What a [Reflect] contract is asked to do on `execute`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectMsg {
    /// Hand `response` back to the keeper as is.
    Reflect { response: ContractResponse },
    /// Store `value` under `key`.
    Write { key: String, value: String },
    /// Issue `request` to the ledger and store the answer under `last_query`.
    Query { request: QueryRequest },
    /// Use `gas` VM gas and succeed.
    Burn { gas: u64 },
    /// Fail with a contract error after writing to the store.
    Fail { reason: String },
    /// Execute itself again with `remaining - 1`, until `remaining` is zero.
    Loop { remaining: u32 },
}

/// Reflect is the workhorse mock contract.
///
/// `instantiate` stores its message under `init`, `migrate` stores its message under `migrated`.
/// `query` answers with the value stored under the key named by the message. `execute` follows a
/// [ReflectMsg].
pub struct Reflect;

impl Reflect {
    fn charge<T>(call: &VmCall, gas: u64, value: T) -> VmOutcome<T> {
        let gas = BASE_VM_GAS.saturating_add(gas);
        if gas > call.gas_limit {
            return VmOutcome::err(VmError::GasExhaustion, call.gas_limit);
        }
        VmOutcome::ok(value, gas)
    }
}

impl MockContract for Reflect {
    fn instantiate(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        call.store.write(b"init", &call.msg);
        Reflect::charge(
            call,
            0,
            ContractResponse {
                attributes: vec![Attribute::new("action", "instantiate")],
                ..Default::default()
            },
        )
    }

    fn execute(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        let msg: ReflectMsg = match serde_json::from_slice(&call.msg) {
            Ok(msg) => msg,
            Err(e) => return VmOutcome::err(VmError::Contract(e.to_string()), BASE_VM_GAS),
        };
        match msg {
            ReflectMsg::Reflect { response } => Reflect::charge(call, 0, response),
            ReflectMsg::Write { key, value } => {
                call.store.write(key.as_bytes(), value.as_bytes());
                Reflect::charge(call, 0, ContractResponse::default())
            }
            ReflectMsg::Query { request } => {
                let outcome = call
                    .querier
                    .query(&request, call.gas_limit.saturating_sub(BASE_VM_GAS));
                match outcome.result {
                    Ok(answer) => {
                        call.store.write(b"last_query", answer.as_slice());
                        Reflect::charge(call, outcome.gas_used, ContractResponse::default())
                    }
                    Err(WasmError::OutOfGas(_)) => {
                        VmOutcome::err(VmError::GasExhaustion, call.gas_limit)
                    }
                    Err(e) => VmOutcome::err(
                        VmError::Contract(e.to_string()),
                        BASE_VM_GAS + outcome.gas_used,
                    ),
                }
            }
            ReflectMsg::Burn { gas } => Reflect::charge(call, gas, ContractResponse::default()),
            ReflectMsg::Fail { reason } => {
                call.store.write(b"failed", b"1");
                VmOutcome::err(VmError::Contract(reason), BASE_VM_GAS)
            }
            ReflectMsg::Loop { remaining } => {
                let messages = match remaining.checked_sub(1) {
                    Some(remaining) => vec![CosmosMsg::Wasm(WasmMsg::Execute {
                        contract_addr: call.env.contract.address.to_string(),
                        msg: Binary(serde_json::to_vec(&ReflectMsg::Loop { remaining }).unwrap()),
                        send: Vec::new(),
                    })],
                    None => Vec::new(),
                };
                Reflect::charge(
                    call,
                    0,
                    ContractResponse {
                        messages,
                        ..Default::default()
                    },
                )
            }
        }
    }

    fn migrate(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        call.store.write(b"migrated", &call.msg);
        Reflect::charge(call, 0, ContractResponse::default())
    }

    fn query(&self, call: &VmCall) -> VmOutcome<Binary> {
        let value = call.store.read(&call.msg).unwrap_or_default();
        Reflect::charge(call, 0, Binary(value))
    }
}

/// Refuses every entry point. Used as a migration target that must not be reached.
pub struct Broken;

impl MockContract for Broken {
    fn instantiate(&self, _call: &VmCall) -> VmOutcome<ContractResponse> {
        VmOutcome::err(VmError::Contract("broken".to_string()), BASE_VM_GAS)
    }

    fn execute(&self, _call: &VmCall) -> VmOutcome<ContractResponse> {
        VmOutcome::err(VmError::Contract("broken".to_string()), BASE_VM_GAS)
    }

    fn migrate(&self, _call: &VmCall) -> VmOutcome<ContractResponse> {
        VmOutcome::err(VmError::Contract("broken".to_string()), BASE_VM_GAS)
    }

    fn query(&self, _call: &VmCall) -> VmOutcome<Binary> {
        VmOutcome::err(VmError::Contract("broken".to_string()), BASE_VM_GAS)
    }
}

/// Recursor answers every query by querying itself. The answer is the number of nested queries that
/// ran, itself included, once the ledger refuses to go deeper.
pub struct Recursor;

impl Recursor {
    fn ask_self(call: &VmCall) -> VmOutcome<Binary> {
        let request = QueryRequest::Wasm(WasmQuery::Smart {
            contract_addr: call.env.contract.address.to_string(),
            msg: Binary(b"{}".to_vec()),
        });
        let outcome = call
            .querier
            .query(&request, call.gas_limit.saturating_sub(BASE_VM_GAS));
        let depth: u32 = match outcome.result {
            Ok(answer) => std::str::from_utf8(answer.as_slice())
                .unwrap()
                .parse::<u32>()
                .unwrap()
                + 1,
            Err(WasmError::ExceedMaxQueryDepth) => 1,
            Err(WasmError::OutOfGas(_)) => {
                return VmOutcome::err(VmError::GasExhaustion, call.gas_limit)
            }
            Err(e) => {
                return VmOutcome::err(
                    VmError::Contract(e.to_string()),
                    BASE_VM_GAS + outcome.gas_used,
                )
            }
        };
        Reflect::charge(call, outcome.gas_used, Binary(depth.to_string().into_bytes()))
    }
}

impl MockContract for Recursor {
    fn instantiate(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        Reflect::charge(call, 0, ContractResponse::default())
    }

    fn execute(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        let outcome = Recursor::ask_self(call);
        match outcome.result {
            Ok(depth) => {
                call.store.write(b"depth", depth.as_slice());
                VmOutcome::ok(ContractResponse::default(), outcome.gas_used)
            }
            Err(e) => VmOutcome::err(e, outcome.gas_used),
        }
    }

    fn migrate(&self, call: &VmCall) -> VmOutcome<ContractResponse> {
        Reflect::charge(call, 0, ContractResponse::default())
    }

    fn query(&self, call: &VmCall) -> VmOutcome<Binary> {
        Recursor::ask_self(call)
    }
}
