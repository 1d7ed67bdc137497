use std::sync::Arc;

use terra_wasm_keeper::keeper::keys::derive_address;
use terra_wasm_keeper::types::Binary;
use terra_wasm_keeper::{GenesisState, Params, WasmError};

use crate::common::{mock_code, Reflect, ReflectMsg, TestEnv, CREATOR};

mod common;

/// Two codes, two contracts with some state, and non-default params.
fn populated() -> (TestEnv, GenesisState) {
    let (env, vm) = TestEnv::new();
    for tag in [1, 2] {
        let code = mock_code(tag);
        vm.register(&code, Arc::new(Reflect));
        env.store_code(&code);
    }
    let first = env.instantiate(1, br#"{"n":1}"#, true);
    let second = env.instantiate(2, br#"{"n":2}"#, false);
    for (contract, value) in [(first, "one"), (second, "two")] {
        env.execute(
            contract,
            &ReflectMsg::Write {
                key: "value".to_string(),
                value: value.to_string(),
            },
        )
        .unwrap();
    }
    env.keeper.set_params(
        &env.ctx,
        Params {
            max_contract_msg_size: 2048,
            ..Params::default()
        },
    );
    let state = env.keeper.export_genesis(&env.ctx).unwrap();
    (env, state)
}

#[test]
fn test_export_captures_module_state() {
    let (_, state) = populated();
    assert_eq!(state.last_code_id, 2);
    assert_eq!(state.last_instance_id, 2);
    assert_eq!(state.params.max_contract_msg_size, 2048);
    assert_eq!(state.codes.len(), 2);
    assert_eq!(state.codes[0].code_bytes.as_slice(), mock_code(1));
    assert_eq!(state.contracts.len(), 2);
    for contract in &state.contracts {
        assert_eq!(contract.contract_info.owner, CREATOR);
        assert!(contract
            .contract_store
            .iter()
            .any(|model| model.key.as_slice() == b"value"));
    }
}

#[test]
fn test_import_restores_exported_state() {
    let (_, state) = populated();

    let (fresh, vm) = TestEnv::new();
    fresh.keeper.init_genesis(&fresh.ctx, &state).unwrap();
    assert_eq!(fresh.keeper.export_genesis(&fresh.ctx).unwrap(), state);

    // the restored ledger keeps going from where the exported one stopped
    vm.register(&mock_code(1), Arc::new(Reflect));
    let third = fresh.instantiate(1, b"{}", false);
    assert_eq!(third, derive_address(1, 3));
    let first = derive_address(1, 1);
    assert_eq!(fresh.keeper.query_raw(&fresh.ctx, &first, b"value"), b"one");
}

#[test]
fn test_genesis_survives_json() {
    let (_, state) = populated();
    let json = serde_json::to_string(&state).unwrap();
    let decoded: GenesisState = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, state);
}

#[test]
fn test_import_rejects_tampered_code() {
    let (_, mut state) = populated();
    state.codes[1].code_info.code_hash = Binary(vec![0; 32]);

    let (fresh, _) = TestEnv::new();
    let err = fresh.keeper.init_genesis(&fresh.ctx, &state).unwrap_err();
    assert!(matches!(err, WasmError::InvalidGenesis(_)));
}

#[test]
fn test_import_rejects_dangling_code_ids() {
    let (_, mut state) = populated();
    state.last_code_id = 1;

    let (fresh, _) = TestEnv::new();
    let err = fresh.keeper.init_genesis(&fresh.ctx, &state).unwrap_err();
    assert!(matches!(err, WasmError::InvalidGenesis(_)));
}
