/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the native gas meter of an execution context.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::OutOfGas;

#[derive(Debug, Default)]
struct MeterState {
    /// None for an infinite meter.
    limit: Option<u64>,
    consumed: u64,
}

/// GasMeter counts native gas against an optional limit. Clones share the same counter.
///
/// Going over the limit panics with an [OutOfGas] payload after recording the consumption, which
/// mirrors how the rest of the ledger aborts a message that runs out of gas.
#[derive(Clone, Debug, Default)]
pub struct GasMeter {
    state: Arc<Mutex<MeterState>>,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MeterState {
                limit: Some(limit),
                consumed: 0,
            })),
        }
    }

    /// infinite returns a meter that never runs out, as used by genesis and block hooks.
    pub fn infinite() -> Self {
        Self::default()
    }

    /// limit of the meter, `u64::MAX` if infinite.
    pub fn limit(&self) -> u64 {
        self.state().limit.unwrap_or(u64::MAX)
    }

    pub fn is_infinite(&self) -> bool {
        self.state().limit.is_none()
    }

    pub fn consumed(&self) -> u64 {
        self.state().consumed
    }

    /// consumed, capped at the limit.
    pub fn consumed_to_limit(&self) -> u64 {
        let state = self.state();
        match state.limit {
            Some(limit) => state.consumed.min(limit),
            None => state.consumed,
        }
    }

    pub fn remaining(&self) -> u64 {
        let state = self.state();
        match state.limit {
            Some(limit) => limit.saturating_sub(state.consumed),
            None => u64::MAX,
        }
    }

    /// consume_gas adds `amount` to the meter.
    ///
    /// # Panics
    /// With an [OutOfGas] payload when the counter overflows or passes the limit.
    pub fn consume_gas(&self, amount: u64, descriptor: &str) {
        let exceeded = {
            let mut state = self.state();
            match state.consumed.checked_add(amount) {
                Some(consumed) => {
                    state.consumed = consumed;
                    matches!(state.limit, Some(limit) if consumed > limit)
                }
                None => {
                    state.consumed = u64::MAX;
                    true
                }
            }
        };
        // The lock is released before unwinding so that the meter stays readable.
        if exceeded {
            std::panic::panic_any(OutOfGas {
                descriptor: descriptor.to_string(),
            });
        }
    }

    /// refund_gas takes `amount` back off the counter.
    pub fn refund_gas(&self, amount: u64) {
        let mut state = self.state();
        state.consumed = state.consumed.saturating_sub(amount);
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MeterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
