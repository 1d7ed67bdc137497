/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Market custom route: swapping between native denominations.
//!
//! Contracts reach it through `{"custom": {"route": "market", ...}}`. Messages name their trader
//! explicitly, so a contract swapping on someone else's behalf is caught by the dispatcher's
//! signer check.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{parse_address, to_binary, LedgerMsg, WasmMsgParser, WasmQuerier};
use crate::collaborators::MarketKeeper;
use crate::context::Context;
use crate::error::WasmError;
use crate::keeper::Keeper;
use crate::types::{Address, Binary, Coin};
use crate::vm::{CosmosMsg, QueryRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum MarketMsg {
    Swap {
        trader: String,
        offer_coin: Coin,
        ask_denom: String,
    },
    SwapSend {
        from_address: String,
        to_address: String,
        offer_coin: Coin,
        ask_denom: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum MarketQuery {
    Swap { offer_coin: Coin, ask_denom: String },
}

/// Answer to a swap simulation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQueryResponse {
    pub receive: Coin,
}

pub struct MarketMsgParser;

impl WasmMsgParser for MarketMsgParser {
    fn parse(&self, _contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError> {
        let CosmosMsg::Custom(custom) = msg else {
            return Err(WasmError::InvalidMsg("unknown variant of Market".to_string()));
        };
        let parsed: MarketMsg = serde_json::from_value(custom.msg_data.clone()).map_err(|e| {
            WasmError::InvalidMsg(format!("failed to parse market custom msg: {}", e))
        })?;
        let msg = match parsed {
            MarketMsg::Swap {
                trader,
                offer_coin,
                ask_denom,
            } => LedgerMsg::Swap {
                trader: parse_address(&trader)?,
                offer_coin,
                ask_denom,
            },
            MarketMsg::SwapSend {
                from_address,
                to_address,
                offer_coin,
                ask_denom,
            } => LedgerMsg::SwapSend {
                from_address: parse_address(&from_address)?,
                to_address: parse_address(&to_address)?,
                offer_coin,
                ask_denom,
            },
        };
        msg.validate_basic()?;
        Ok(vec![msg])
    }
}

pub struct MarketQuerier {
    market: Arc<dyn MarketKeeper>,
}

impl MarketQuerier {
    pub fn new(market: Arc<dyn MarketKeeper>) -> Self {
        Self { market }
    }
}

impl WasmQuerier for MarketQuerier {
    fn query(
        &self,
        _keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError> {
        let QueryRequest::Custom(custom) = request else {
            return Err(WasmError::InvalidMsg("unknown variant of Market".to_string()));
        };
        let MarketQuery::Swap {
            offer_coin,
            ask_denom,
        } = serde_json::from_value(custom.query_data.clone())
            .map_err(|e| WasmError::InvalidMsg(e.to_string()))?;
        let receive = self.market.compute_swap(ctx, &offer_coin, &ask_denom)?;
        to_binary(&SwapQueryResponse { receive })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{CustomMsg, ROUTE_MARKET};

    fn custom(msg_data: serde_json::Value) -> CosmosMsg {
        CosmosMsg::Custom(CustomMsg {
            route: ROUTE_MARKET.to_string(),
            msg_data,
        })
    }

    #[test]
    fn swap_names_its_trader() {
        let trader = Address([4; 20]);
        let msg = custom(serde_json::json!({
            "swap": {
                "trader": trader.to_string(),
                "offer_coin": {"denom": "uluna", "amount": "100"},
                "ask_denom": "uusd"
            }
        }));
        let msgs = MarketMsgParser.parse(&Address([1; 20]), &msg).unwrap();
        assert_eq!(msgs[0].signers(), vec![trader]);
    }

    #[test]
    fn unknown_market_msg_is_invalid() {
        let msg = custom(serde_json::json!({ "burn": {} }));
        assert!(matches!(
            MarketMsgParser.parse(&Address([1; 20]), &msg),
            Err(WasmError::InvalidMsg(_))
        ));
    }
}
