use crate::common::types::{Amount, Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values the execution environment supplies with every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub caller: Identity,
    /// Amount attached to the call
    pub payment: Amount,
    pub now: Timestamp,
    /// Balance held by the lottery, including `payment`
    pub balance: Amount,
}

impl ExecutionContext {
    pub fn new(caller: Identity) -> Self {
        Self {
            caller,
            payment: 0,
            now: 0,
            balance: 0,
        }
    }

    pub fn with_payment(mut self, payment: Amount) -> Self {
        self.payment = payment;
        self
    }

    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// Overpayment returned to the caller
    Refund,
    /// Collected balance paid to the round winner
    Payout,
}

/// Value transfer the environment must execute as part of the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub recipient: Identity,
    pub amount: Amount,
    pub kind: TransferKind,
}

impl Transfer {
    pub fn refund(recipient: Identity, amount: Amount) -> Self {
        Self {
            recipient,
            amount,
            kind: TransferKind::Refund,
        }
    }

    pub fn payout(recipient: Identity, amount: Amount) -> Self {
        Self {
            recipient,
            amount,
            kind: TransferKind::Payout,
        }
    }
}

/// What a successful call did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LotteryEvent {
    TicketsPurchased {
        buyer: Identity,
        first_index: u64,
        count: u64,
        refund: Amount,
    },
    GameEnded {
        winner_index: u64,
        winner: Identity,
        payout: Amount,
    },
    SettingsAdjusted {
        ticket_cost: Amount,
        max_tickets: u64,
    },
}

/// Result of a successful call: the event plus the transfers to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub event: LotteryEvent,
    pub transfers: Vec<Transfer>,
}

impl Receipt {
    pub fn total(&self, kind: TransferKind) -> Amount {
        self.transfers
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.amount)
            .sum()
    }

    pub fn total_transferred(&self) -> Amount {
        self.transfers.iter().map(|t| t.amount).sum()
    }
}

fn default_ticket_count() -> u64 {
    1
}

/// Lottery entry point with its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry_point", rename_all = "snake_case")]
pub enum Call {
    BuyTicket {
        #[serde(default = "default_ticket_count")]
        num_tickets: u64,
    },
    EndGame,
    AdjustSettings {
        new_ticket_cost: Amount,
        new_max_tickets: u64,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::BuyTicket { .. } => "buy_ticket",
            Call::EndGame => "end_game",
            Call::AdjustSettings { .. } => "adjust_settings",
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::BuyTicket { num_tickets } => write!(f, "buy_ticket({})", num_tickets),
            Call::EndGame => write!(f, "end_game()"),
            Call::AdjustSettings {
                new_ticket_cost,
                new_max_tickets,
            } => write!(f, "adjust_settings({}, {})", new_ticket_cost, new_max_tickets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_deserializes_with_default_ticket_count() {
        let call: Call = serde_json::from_str(r#"{"entry_point":"buy_ticket"}"#).unwrap();
        assert_eq!(call, Call::BuyTicket { num_tickets: 1 });

        let call: Call = serde_json::from_str(
            r#"{"entry_point":"adjust_settings","new_ticket_cost":2,"new_max_tickets":6}"#,
        )
        .unwrap();
        assert_eq!(
            call,
            Call::AdjustSettings {
                new_ticket_cost: 2,
                new_max_tickets: 6
            }
        );
    }

    #[test]
    fn test_call_display() {
        assert_eq!(Call::BuyTicket { num_tickets: 3 }.to_string(), "buy_ticket(3)");
        assert_eq!(Call::EndGame.to_string(), "end_game()");
        assert_eq!(Call::EndGame.name(), "end_game");
    }

    #[test]
    fn test_receipt_totals() {
        let alice = Identity::from_label("alice");
        let receipt = Receipt {
            event: LotteryEvent::TicketsPurchased {
                buyer: alice,
                first_index: 0,
                count: 1,
                refund: 2,
            },
            transfers: vec![Transfer::refund(alice, 2)],
        };
        assert_eq!(receipt.total(TransferKind::Refund), 2);
        assert_eq!(receipt.total(TransferKind::Payout), 0);
        assert_eq!(receipt.total_transferred(), 2);
    }

    #[test]
    fn test_context_builder() {
        let caller = Identity::from_label("bob");
        let ctx = ExecutionContext::new(caller).with_payment(5).at(20).with_balance(9);
        assert_eq!(ctx.caller, caller);
        assert_eq!((ctx.payment, ctx.now, ctx.balance), (5, 20, 9));
    }
}
