/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Staking route. Delegation messages always act for the contract itself.

use std::sync::Arc;

use super::{parse_address, parse_validator, to_binary, LedgerMsg, WasmMsgParser, WasmQuerier};
use crate::collaborators::StakingKeeper;
use crate::context::Context;
use crate::error::WasmError;
use crate::keeper::Keeper;
use crate::types::{Address, Binary};
use crate::vm::{
    BondedDenomResponse, CosmosMsg, DelegationResponse, DelegationsResponse, QueryRequest,
    StakingMsg, StakingQuery, ValidatorsResponse,
};

pub struct StakingMsgParser;

impl WasmMsgParser for StakingMsgParser {
    fn parse(&self, contract: &Address, msg: &CosmosMsg) -> Result<Vec<LedgerMsg>, WasmError> {
        let CosmosMsg::Staking(msg) = msg else {
            return Err(WasmError::InvalidMsg("unknown variant of Staking".to_string()));
        };
        let delegator = *contract;
        let msgs = match msg {
            StakingMsg::Delegate { validator, amount } => vec![LedgerMsg::Delegate {
                delegator,
                validator: parse_validator(validator)?,
                amount: amount.clone(),
            }],
            StakingMsg::Undelegate { validator, amount } => vec![LedgerMsg::Undelegate {
                delegator,
                validator: parse_validator(validator)?,
                amount: amount.clone(),
            }],
            StakingMsg::Redelegate {
                src_validator,
                dst_validator,
                amount,
            } => vec![LedgerMsg::BeginRedelegate {
                delegator,
                src_validator: parse_validator(src_validator)?,
                dst_validator: parse_validator(dst_validator)?,
                amount: amount.clone(),
            }],
            StakingMsg::Withdraw {
                validator,
                recipient,
            } => {
                let withdraw_address = match recipient.as_deref() {
                    Some(recipient) if !recipient.is_empty() => parse_address(recipient)?,
                    _ => delegator,
                };
                vec![
                    LedgerMsg::SetWithdrawAddress {
                        delegator,
                        withdraw_address,
                    },
                    LedgerMsg::WithdrawDelegatorReward {
                        delegator,
                        validator: parse_validator(validator)?,
                    },
                ]
            }
        };
        Ok(msgs)
    }
}

pub struct StakingQuerier {
    staking: Arc<dyn StakingKeeper>,
}

impl StakingQuerier {
    pub fn new(staking: Arc<dyn StakingKeeper>) -> Self {
        Self { staking }
    }
}

impl WasmQuerier for StakingQuerier {
    fn query(
        &self,
        _keeper: &Keeper,
        ctx: &Context,
        request: &QueryRequest,
    ) -> Result<Binary, WasmError> {
        let QueryRequest::Staking(query) = request else {
            return Err(WasmError::InvalidMsg("unknown variant of Staking".to_string()));
        };
        match query {
            StakingQuery::BondedDenom {} => to_binary(&BondedDenomResponse {
                denom: self.staking.bonded_denom(ctx),
            }),
            StakingQuery::Validators {} => to_binary(&ValidatorsResponse {
                validators: self.staking.validators(ctx),
            }),
            StakingQuery::AllDelegations { delegator } => to_binary(&DelegationsResponse {
                delegations: self.staking.delegations(ctx, &parse_address(delegator)?),
            }),
            StakingQuery::Delegation {
                delegator,
                validator,
            } => to_binary(&DelegationResponse {
                delegation: self.staking.delegation(
                    ctx,
                    &parse_address(delegator)?,
                    &parse_validator(validator)?,
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coin, VALIDATOR_PREFIX};

    fn valoper(byte: u8) -> String {
        Address([byte; 20]).to_bech32(VALIDATOR_PREFIX).unwrap()
    }

    #[test]
    fn delegation_acts_for_the_contract() {
        let contract = Address([1; 20]);
        let msg = CosmosMsg::Staking(StakingMsg::Delegate {
            validator: valoper(9),
            amount: Coin::new(100, "uluna"),
        });
        let msgs = StakingMsgParser.parse(&contract, &msg).unwrap();
        assert_eq!(msgs[0].signers(), vec![contract]);
    }

    #[test]
    fn withdraw_sets_the_withdraw_address_first() {
        let contract = Address([1; 20]);
        let recipient = Address([2; 20]);
        let msg = CosmosMsg::Staking(StakingMsg::Withdraw {
            validator: valoper(9),
            recipient: Some(recipient.to_string()),
        });
        let msgs = StakingMsgParser.parse(&contract, &msg).unwrap();
        assert_eq!(
            msgs,
            vec![
                LedgerMsg::SetWithdrawAddress {
                    delegator: contract,
                    withdraw_address: recipient,
                },
                LedgerMsg::WithdrawDelegatorReward {
                    delegator: contract,
                    validator: Address([9; 20]),
                },
            ]
        );
    }

    #[test]
    fn account_address_is_not_a_validator() {
        let msg = CosmosMsg::Staking(StakingMsg::Undelegate {
            validator: Address([9; 20]).to_string(),
            amount: Coin::new(1, "uluna"),
        });
        assert!(StakingMsgParser.parse(&Address([1; 20]), &msg).is_err());
    }
}
