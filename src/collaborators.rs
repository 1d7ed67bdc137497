/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Ledger modules the keeper works with but does not implement.
//!
//! The account, bank, staking and market keepers are supplied by the host application. Ledger
//! messages produced by contracts are handed to a [MessageRouter]. [Router] is a route table that
//! the application fills with one [Handler] per module, the keeper's own
//! [WasmHandler](crate::keeper::WasmHandler) among them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::bindings::LedgerMsg;
use crate::context::Context;
use crate::error::{recover_out_of_gas, WasmError};
use crate::types::{Address, Coin, Coins, Event};
use crate::vm::{Delegation, Validator};

pub trait AccountKeeper: Send + Sync {
    fn has_account(&self, ctx: &Context, address: &Address) -> bool;

    /// create_account registers a new, empty account at `address`.
    fn create_account(&self, ctx: &Context, address: &Address);
}

pub trait BankKeeper: Send + Sync {
    /// send_coins moves `amount` from `from` to `to`, failing without side effects if `from`
    /// cannot cover it.
    fn send_coins(
        &self,
        ctx: &Context,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), WasmError>;

    fn balance(&self, ctx: &Context, address: &Address, denom: &str) -> Coin;

    fn all_balances(&self, ctx: &Context, address: &Address) -> Coins;
}

pub trait StakingKeeper: Send + Sync {
    fn bonded_denom(&self, ctx: &Context) -> String;

    fn validators(&self, ctx: &Context) -> Vec<Validator>;

    fn delegations(&self, ctx: &Context, delegator: &Address) -> Vec<Delegation>;

    fn delegation(
        &self,
        ctx: &Context,
        delegator: &Address,
        validator: &Address,
    ) -> Option<Delegation>;
}

pub trait MarketKeeper: Send + Sync {
    /// compute_swap quotes what `offer` would return in `ask_denom` at current rates.
    fn compute_swap(&self, ctx: &Context, offer: &Coin, ask_denom: &str) -> Result<Coin, WasmError>;
}

/// MessageRouter executes ledger messages on behalf of the keeper and returns the events they
/// produced.
pub trait MessageRouter: Send + Sync {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError>;
}

/// Handler executes the ledger messages of one route.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError>;
}

/// Router maps a message's [route](LedgerMsg::route) to its [Handler]. Routes may be added after
/// construction, which lets a handler hold a keeper that itself holds the router.
#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// add_route registers `handler` for `route`, replacing any previous one.
    pub fn add_route(&self, route: impl Into<String>, handler: Arc<dyn Handler>) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(route.into(), handler);
    }

    pub fn has_route(&self, route: &str) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(route)
    }

    /// deliver runs one top-level message atomically: it is validated, executed in a branch of
    /// `ctx`, and the branch is committed only if execution succeeds. Gas exhaustion is reported as
    /// [WasmError::OutOfGas], with the gas spent up to that point still charged.
    pub fn deliver(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
        msg.validate_basic()?;
        let (branch, write) = ctx.cache_context();
        let events = recover_out_of_gas(|| self.handle(&branch, msg))?;
        branch.event_manager().emit_events(events.clone());
        write.write();
        Ok(events)
    }
}

impl MessageRouter for Router {
    fn handle(&self, ctx: &Context, msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
        let handler = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(msg.route())
            .cloned()
            .ok_or_else(|| WasmError::UnknownRoute(msg.route().to_string()))?;
        tracing::trace!(route = msg.route(), "routing ledger message");
        handler.handle(ctx, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::GasMeter;

    struct Burner;

    impl Handler for Burner {
        fn handle(&self, ctx: &Context, _msg: &LedgerMsg) -> Result<Vec<Event>, WasmError> {
            ctx.store_set(b"touched", b"1");
            ctx.gas_meter().consume_gas(1_000, "burn");
            Ok(vec![Event::new("burned")])
        }
    }

    fn send() -> LedgerMsg {
        LedgerMsg::BankSend {
            from_address: Address([1; 20]),
            to_address: Address([2; 20]),
            amount: vec![Coin::new(1, "uluna")],
        }
    }

    #[test]
    fn unknown_route_is_reported() {
        let router = Router::new();
        let err = router.handle(&Context::for_tests(), &send()).unwrap_err();
        assert!(matches!(err, WasmError::UnknownRoute(route) if route == "bank"));
    }

    #[test]
    fn out_of_gas_discards_the_branch() {
        let router = Router::new();
        router.add_route("bank", Arc::new(Burner));
        let ctx = Context::for_tests().with_gas_meter(GasMeter::new(500));

        let err = router.deliver(&ctx, &send()).unwrap_err();
        assert!(matches!(err, WasmError::OutOfGas(_)));
        assert_eq!(ctx.store_get(b"touched"), None);
        assert!(ctx.event_manager().events().is_empty());
    }

    #[test]
    fn successful_delivery_commits() {
        let router = Router::new();
        router.add_route("bank", Arc::new(Burner));
        let ctx = Context::for_tests();

        let events = router.deliver(&ctx, &send()).unwrap();
        assert_eq!(events, vec![Event::new("burned")]);
        assert_eq!(ctx.store_get(b"touched"), Some(b"1".to_vec()));
        assert_eq!(ctx.event_manager().events(), events);
    }
}
