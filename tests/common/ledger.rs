//! In-memory stand-ins for the ledger modules around the keeper. Balances and accounts live in the
//! context store, so they commit and roll back together with the keeper's own writes.

use std::sync::Arc;

use terra_wasm_keeper::bindings::LedgerMsg;
use terra_wasm_keeper::collaborators::{
    AccountKeeper, BankKeeper, Handler, MarketKeeper, StakingKeeper,
};
use terra_wasm_keeper::context::{Context, EVENT_TYPE_MESSAGE};
use terra_wasm_keeper::types::{Address, Coin, Coins, Event};
use terra_wasm_keeper::vm::{Delegation, Validator};
use terra_wasm_keeper::WasmError;

const ACCOUNT_PREFIX: &[u8] = b"test/account/";
const BALANCE_PREFIX: &[u8] = b"test/balance/";

/// Denomination every test account is funded in.
pub const DENOM: &str = "uluna";

/// Denomination swaps are made into.
pub const ASK_DENOM: &str = "uusd";

/// uusd per uluna offered in a swap.
pub const SWAP_RATE: u128 = 3;

pub struct TestAccounts;

impl AccountKeeper for TestAccounts {
    fn has_account(&self, ctx: &Context, address: &Address) -> bool {
        ctx.store_get(&account_key(address)).is_some()
    }

    fn create_account(&self, ctx: &Context, address: &Address) {
        ctx.store_set(&account_key(address), b"1");
    }
}

fn account_key(address: &Address) -> Vec<u8> {
    [ACCOUNT_PREFIX, address.as_bytes()].concat()
}

pub struct TestBank;

impl TestBank {
    pub fn set_balance(&self, ctx: &Context, address: &Address, coin: &Coin) {
        ctx.store_set(
            &balance_key(address, &coin.denom),
            &coin.amount.to_be_bytes(),
        );
    }

    fn amount(&self, ctx: &Context, address: &Address, denom: &str) -> u128 {
        ctx.store_get(&balance_key(address, denom))
            .map(|bz| u128::from_be_bytes(bz.try_into().unwrap()))
            .unwrap_or(0)
    }
}

impl BankKeeper for TestBank {
    fn send_coins(
        &self,
        ctx: &Context,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), WasmError> {
        for coin in amount {
            let have = self.balance(ctx, from, &coin.denom);
            if have.amount < coin.amount {
                return Err(WasmError::module(
                    "bank",
                    format!("insufficient funds: {} < {}", have, coin),
                ));
            }
        }
        for coin in amount {
            let from_amount = self.amount(ctx, from, &coin.denom) - coin.amount;
            self.set_balance(ctx, from, &Coin::new(from_amount, coin.denom.clone()));
            let to_amount = self.amount(ctx, to, &coin.denom) + coin.amount;
            self.set_balance(ctx, to, &Coin::new(to_amount, coin.denom.clone()));
        }
        Ok(())
    }

    fn balance(&self, ctx: &Context, address: &Address, denom: &str) -> Coin {
        Coin::new(self.amount(ctx, address, denom), denom)
    }

    fn all_balances(&self, ctx: &Context, address: &Address) -> Coins {
        let prefix = [BALANCE_PREFIX, address.as_bytes(), b"/"].concat();
        ctx.store_prefix_entries(&prefix)
            .into_iter()
            .map(|(key, value)| {
                let denom = String::from_utf8(key[prefix.len()..].to_vec()).unwrap();
                Coin::new(u128::from_be_bytes(value.try_into().unwrap()), denom)
            })
            .filter(|coin| coin.amount > 0)
            .collect()
    }
}

fn balance_key(address: &Address, denom: &str) -> Vec<u8> {
    [BALANCE_PREFIX, address.as_bytes(), b"/", denom.as_bytes()].concat()
}

/// Bank route of the test router. Emits a `transfer` event and a `message` event, as the ledger's
/// bank module does.
pub struct BankHandler {
    pub bank: Arc<TestBank>,
}

impl Handler for BankHandler {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
        let LedgerMsg::BankSend {
            from_address,
            to_address,
            amount,
        } = msg
        else {
            return Err(WasmError::UnknownRoute(msg.route().to_string()));
        };
        self.bank.send_coins(ctx, from_address, to_address, amount)?;
        let amount = amount
            .iter()
            .map(Coin::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Ok(vec![
            Event::new("transfer")
                .add_attribute("recipient", to_address.to_string())
                .add_attribute("sender", from_address.to_string())
                .add_attribute("amount", amount),
            Event::new(EVENT_TYPE_MESSAGE).add_attribute("module", "bank"),
        ])
    }
}

pub struct TestStaking {
    pub validators: Vec<Validator>,
    pub delegations: Vec<Delegation>,
}

impl StakingKeeper for TestStaking {
    fn bonded_denom(&self, _ctx: &Context) -> String {
        DENOM.to_string()
    }

    fn validators(&self, _ctx: &Context) -> Vec<Validator> {
        self.validators.clone()
    }

    fn delegations(&self, _ctx: &Context, delegator: &Address) -> Vec<Delegation> {
        let delegator = delegator.to_string();
        self.delegations
            .iter()
            .filter(|d| d.delegator == delegator)
            .cloned()
            .collect()
    }

    fn delegation(
        &self,
        ctx: &Context,
        delegator: &Address,
        validator: &Address,
    ) -> Option<Delegation> {
        let validator = validator
            .to_bech32(terra_wasm_keeper::types::VALIDATOR_PREFIX)
            .ok()?;
        self.delegations(ctx, delegator)
            .into_iter()
            .find(|d| d.validator == validator)
    }
}

/// Swaps at the fixed [SWAP_RATE] from [DENOM] into [ASK_DENOM].
pub struct TestMarket {
    pub bank: Arc<TestBank>,
}

impl MarketKeeper for TestMarket {
    fn compute_swap(&self, _ctx: &Context, offer: &Coin, ask_denom: &str) -> Result<Coin, WasmError> {
        if offer.denom != DENOM || ask_denom != ASK_DENOM {
            return Err(WasmError::module(
                "market",
                format!("no exchange rate for {} into {}", offer.denom, ask_denom),
            ));
        }
        Ok(Coin::new(offer.amount * SWAP_RATE, ask_denom))
    }
}

impl Handler for TestMarket {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
        let (trader, recipient, offer_coin, ask_denom) = match msg {
            LedgerMsg::Swap {
                trader,
                offer_coin,
                ask_denom,
            } => (trader, trader, offer_coin, ask_denom),
            LedgerMsg::SwapSend {
                from_address,
                to_address,
                offer_coin,
                ask_denom,
            } => (from_address, to_address, offer_coin, ask_denom),
            _ => return Err(WasmError::UnknownRoute(msg.route().to_string())),
        };
        let receive = self.compute_swap(ctx, offer_coin, ask_denom)?;

        let offered = self.bank.balance(ctx, trader, &offer_coin.denom);
        if offered.amount < offer_coin.amount {
            return Err(WasmError::module("market", "insufficient funds to swap"));
        }
        self.bank.set_balance(
            ctx,
            trader,
            &Coin::new(offered.amount - offer_coin.amount, offered.denom),
        );
        let held = self.bank.balance(ctx, recipient, &receive.denom);
        self.bank.set_balance(
            ctx,
            recipient,
            &Coin::new(held.amount + receive.amount, receive.denom.clone()),
        );
        Ok(vec![Event::new("swap")
            .add_attribute("offer", offer_coin.to_string())
            .add_attribute("trader", trader.to_string())
            .add_attribute("recipient", recipient.to_string())
            .add_attribute("swap_coin", receive.to_string())])
    }
}
