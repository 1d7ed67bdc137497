//! A keeper wired to in-memory ledger modules, ready for messages.

use std::sync::Arc;

use terra_wasm_keeper::bindings::market::{MarketMsgParser, MarketQuerier};
use terra_wasm_keeper::bindings::{LedgerMsg, MsgParserRegistry, QuerierRegistry};
use terra_wasm_keeper::collaborators::{BankKeeper, MessageRouter, Router};
use terra_wasm_keeper::context::Context;
use terra_wasm_keeper::gas::GasMeter;
use terra_wasm_keeper::keeper::{MsgExecuteContract, MsgInstantiateContract, MsgStoreCode};
use terra_wasm_keeper::params::StoreParams;
use terra_wasm_keeper::store::{shared, MemoryStore};
use terra_wasm_keeper::types::{Address, Binary, BlockInfo, Coin, Event};
use terra_wasm_keeper::vm::{
    ContractResponse, Validator, WasmVm, ROUTE_BANK, ROUTE_MARKET, ROUTE_WASM,
};
use terra_wasm_keeper::{GenesisState, Keeper, WasmConfig, WasmError, WasmHandler};

use super::ledger::{
    BankHandler, TestAccounts, TestBank, TestMarket, TestStaking, DENOM,
};
use super::mock_vm::{MockVm, ReflectMsg};

pub const CREATOR: Address = Address([1u8; 20]);
pub const ALICE: Address = Address([2u8; 20]);
pub const BOB: Address = Address([3u8; 20]);
pub const VALIDATOR: Address = Address([9u8; 20]);

/// Native gas given to messages delivered with [TestEnv::deliver].
pub const DEFAULT_GAS_LIMIT: u64 = 20_000_000;

pub struct TestEnv {
    pub ctx: Context,
    pub keeper: Keeper,
    pub router: Arc<Router>,
    pub bank: Arc<TestBank>,
}

impl TestEnv {
    /// new sets up a keeper over a [MockVm] with default params and config.
    pub fn new() -> (Self, Arc<MockVm>) {
        let vm = Arc::new(MockVm::new());
        (Self::with_vm(vm.clone(), WasmConfig::default()), vm)
    }

    pub fn with_vm(vm: Arc<dyn WasmVm>, config: WasmConfig) -> Self {
        let ctx = Context::new(
            shared(MemoryStore::new()),
            BlockInfo {
                height: 100,
                time: 1_600_000_000_000_000_000,
                chain_id: "columbus-test".to_string(),
            },
            GasMeter::infinite(),
        );

        let bank = Arc::new(TestBank);
        let market = Arc::new(TestMarket { bank: bank.clone() });
        let staking = Arc::new(TestStaking {
            validators: vec![Validator {
                address: validator_address(),
                commission: "0.05".to_string(),
            }],
            delegations: Vec::new(),
        });

        let mut parsers = MsgParserRegistry::with_defaults();
        parsers.register(ROUTE_MARKET, Arc::new(MarketMsgParser));
        let mut queriers = QuerierRegistry::with_defaults(bank.clone(), staking);
        queriers.register(ROUTE_MARKET, Arc::new(MarketQuerier::new(market.clone())));

        let router = Arc::new(Router::new());
        let keeper = Keeper::new(
            vm,
            Arc::new(StoreParams::default()),
            Arc::new(TestAccounts),
            bank.clone(),
            router.clone() as Arc<dyn MessageRouter>,
            parsers,
            queriers,
            config,
        );
        router.add_route(ROUTE_BANK, Arc::new(BankHandler { bank: bank.clone() }));
        router.add_route(ROUTE_MARKET, market);
        router.add_route(ROUTE_WASM, Arc::new(WasmHandler::new(keeper.clone())));

        keeper
            .init_genesis(&ctx, &GenesisState::default())
            .unwrap();

        Self {
            ctx,
            keeper,
            router,
            bank,
        }
    }

    pub fn fund(&self, address: &Address, amount: u128) {
        self.bank
            .set_balance(&self.ctx, address, &Coin::new(amount, DENOM));
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.bank.balance(&self.ctx, address, DENOM).amount
    }

    /// deliver runs `msg` as a top-level message with [DEFAULT_GAS_LIMIT] native gas.
    pub fn deliver(&self, msg: LedgerMsg) -> Result<Vec<Event>, WasmError> {
        self.deliver_with_gas(msg, DEFAULT_GAS_LIMIT).0
    }

    /// deliver_with_gas runs `msg` on a fresh meter of `gas_limit` and reports the gas it used.
    pub fn deliver_with_gas(
        &self,
        msg: LedgerMsg,
        gas_limit: u64,
    ) -> (Result<Vec<Event>, WasmError>, u64) {
        let meter = GasMeter::new(gas_limit);
        let ctx = self.ctx.with_gas_meter(meter.clone());
        let result = self.router.deliver(&ctx, &msg);
        (result, meter.consumed())
    }

    /// store_code uploads `code` as [CREATOR] and returns the new code id.
    pub fn store_code(&self, code: &[u8]) -> u64 {
        let events = self
            .deliver(LedgerMsg::StoreCode(MsgStoreCode {
                sender: CREATOR,
                wasm_byte_code: Binary(code.to_vec()),
            }))
            .unwrap();
        events[0].attribute("code_id").unwrap().parse().unwrap()
    }

    /// instantiate creates a contract of `code_id` owned by [CREATOR] and returns its address.
    pub fn instantiate(&self, code_id: u64, init_msg: &[u8], migratable: bool) -> Address {
        let events = self
            .deliver(LedgerMsg::InstantiateContract(MsgInstantiateContract {
                owner: CREATOR,
                code_id,
                init_msg: Binary(init_msg.to_vec()),
                init_coins: Vec::new(),
                migratable,
            }))
            .unwrap();
        Address::parse(events[0].attribute("contract_address").unwrap()).unwrap()
    }

    /// execute sends `msg` to a [Reflect](super::mock_vm::Reflect) contract as [CREATOR].
    pub fn execute(&self, contract: Address, msg: &ReflectMsg) -> Result<Vec<Event>, WasmError> {
        self.deliver(execute_msg(contract, msg))
    }

    /// reflect has `contract` hand back `response`.
    pub fn reflect(
        &self,
        contract: Address,
        response: ContractResponse,
    ) -> Result<Vec<Event>, WasmError> {
        self.execute(contract, &ReflectMsg::Reflect { response })
    }
}

pub fn execute_msg(contract: Address, msg: &ReflectMsg) -> LedgerMsg {
    LedgerMsg::ExecuteContract(MsgExecuteContract {
        sender: CREATOR,
        contract,
        execute_msg: Binary(serde_json::to_vec(msg).unwrap()),
        coins: Vec::new(),
    })
}

pub fn validator_address() -> String {
    VALIDATOR
        .to_bech32(terra_wasm_keeper::types::VALIDATOR_PREFIX)
        .unwrap()
}
