//! In-memory execution environment for the lottery
//!
//! Plays the part of the chain: it holds the lottery's custody balance and the
//! callers' wallets, supplies the execution context for each call, and
//! executes the transfers a successful call requests. Every call is applied
//! to a candidate copy first and committed only once the transfers have gone
//! through and the accounting invariants hold.

use crate::common::types::{Amount, Identity, Timestamp};
use crate::config::DeploymentConfig;
use crate::errors::{AppResult, LotteryError, RuntimeError};
use crate::lottery::{self, Call, ExecutionContext, LotteryEvent, Receipt, RoundState, TransferKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Running totals over every call submitted to a runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStats {
    pub accepted_calls: u64,
    pub rejected_calls: u64,
    pub tickets_sold: u64,
    pub rounds_completed: u64,
    pub total_paid_out: Amount,
    pub total_refunded: Amount,
}

impl RuntimeStats {
    // Lifetime totals saturate; the call they describe has already committed
    fn record(&mut self, receipt: &Receipt) {
        self.accepted_calls = self.accepted_calls.saturating_add(1);
        self.total_refunded = self
            .total_refunded
            .saturating_add(receipt.total(TransferKind::Refund));
        self.total_paid_out = self
            .total_paid_out
            .saturating_add(receipt.total(TransferKind::Payout));

        match receipt.event {
            LotteryEvent::TicketsPurchased { count, .. } => {
                self.tickets_sold = self.tickets_sold.saturating_add(count)
            }
            LotteryEvent::GameEnded { .. } => {
                self.rounds_completed = self.rounds_completed.saturating_add(1)
            }
            LotteryEvent::SettingsAdjusted { .. } => {}
        }
    }
}

/// Serializable view of a runtime
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSnapshot {
    pub state: RoundState,
    pub custody: Amount,
    pub wallets: BTreeMap<Identity, Amount>,
    pub last_seen: Option<Timestamp>,
    pub stats: RuntimeStats,
}

pub struct LotteryRuntime {
    state: RoundState,
    custody: Amount,
    wallets: BTreeMap<Identity, Amount>,
    last_seen: Option<Timestamp>,
    stats: RuntimeStats,
}

impl LotteryRuntime {
    pub fn new(state: RoundState) -> Self {
        Self {
            state,
            custody: 0,
            wallets: BTreeMap::new(),
            last_seen: None,
            stats: RuntimeStats::default(),
        }
    }

    pub fn from_deployment(deployment: &DeploymentConfig) -> AppResult<Self> {
        Ok(Self::new(deployment.initial_state()?))
    }

    /// Credit `amount` to a wallet outside of any lottery call
    pub fn fund(&mut self, identity: Identity, amount: Amount) -> Result<(), RuntimeError> {
        let balance = self.wallet(&identity);
        let credited = balance
            .checked_add(amount)
            .ok_or_else(|| RuntimeError::BalanceOverflow(identity.short()))?;
        self.wallets.insert(identity, credited);
        Ok(())
    }

    pub fn wallet(&self, identity: &Identity) -> Amount {
        self.wallets.get(identity).copied().unwrap_or(0)
    }

    pub fn custody(&self) -> Amount {
        self.custody
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot {
            state: self.state.clone(),
            custody: self.custody,
            wallets: self.wallets.clone(),
            last_seen: self.last_seen,
            stats: self.stats.clone(),
        }
    }

    /// Submit a call from `caller` with `payment` attached at time `now`
    pub fn submit(
        &mut self,
        caller: Identity,
        call: Call,
        payment: Amount,
        now: Timestamp,
    ) -> Result<Receipt, RuntimeError> {
        match self.try_submit(caller, call, payment, now) {
            Ok(receipt) => {
                self.stats.record(&receipt);
                tracing::debug!(
                    caller = %caller.short(),
                    %call,
                    payment,
                    now,
                    custody = self.custody,
                    "call accepted"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.stats.rejected_calls = self.stats.rejected_calls.saturating_add(1);
                tracing::warn!(
                    caller = %caller.short(),
                    %call,
                    payment,
                    now,
                    code = e.code(),
                    "call rejected: {}",
                    e
                );
                Err(e)
            }
        }
    }

    fn try_submit(
        &mut self,
        caller: Identity,
        call: Call,
        payment: Amount,
        now: Timestamp,
    ) -> Result<Receipt, RuntimeError> {
        if let Some(last) = self.last_seen {
            if now < last {
                return Err(RuntimeError::ClockRegression { last, now });
            }
        }

        let available = self.wallet(&caller);
        if available < payment {
            return Err(RuntimeError::InsufficientFunds {
                caller,
                required: payment,
                available,
            });
        }

        // Attached value sits in custody for the duration of the call
        let mut custody = self
            .custody
            .checked_add(payment)
            .ok_or_else(|| RuntimeError::BalanceOverflow("custody".to_string()))?;
        let mut credits: BTreeMap<Identity, Amount> = BTreeMap::new();
        credits.insert(caller, available - payment);

        let ctx = ExecutionContext {
            caller,
            payment,
            now,
            balance: custody,
        };
        let mut candidate = self.state.clone();
        let receipt = lottery::execute(&mut candidate, &ctx, call)?;

        for transfer in &receipt.transfers {
            custody = custody.checked_sub(transfer.amount).ok_or_else(|| {
                LotteryError::StateCorrupted(format!(
                    "transfer of {} exceeds custody {}",
                    transfer.amount, custody
                ))
            })?;

            let current = credits
                .get(&transfer.recipient)
                .copied()
                .unwrap_or_else(|| self.wallet(&transfer.recipient));
            let credited = current
                .checked_add(transfer.amount)
                .ok_or_else(|| RuntimeError::BalanceOverflow(transfer.recipient.short()))?;
            credits.insert(transfer.recipient, credited);
        }

        candidate.check_invariants(custody)?;

        self.state = candidate;
        self.custody = custody;
        self.wallets.extend(credits);
        self.last_seen = Some(now);

        Ok(receipt)
    }
}
