//! Round state owned by the lottery state machine

use crate::common::types::{Amount, Identity, Timestamp};
use crate::errors::{LotteryError, LotteryResult};
use serde::Serialize;
use std::fmt;

/// Where the current round stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Tickets remain; `buy_ticket` is accepted
    Open,
    /// Every ticket is sold; only `end_game` is accepted
    SoldOut,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Open => write!(f, "open"),
            RoundPhase::SoldOut => write!(f, "sold-out"),
        }
    }
}

/// Singleton lottery state.
///
/// `players[i]` is the buyer of ticket `i` in the current round. Tickets are
/// appended in order, so indices are dense and start at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundState {
    pub(crate) players: Vec<Identity>,
    pub(crate) ticket_cost: Amount,
    pub(crate) tickets_remaining: u64,
    pub(crate) max_tickets: u64,
    pub(crate) admin: Identity,
    /// Reference timestamp for winner selection
    pub(crate) epoch_zero: Timestamp,
}

impl RoundState {
    /// State at deployment: no players and a full supply of tickets
    pub fn new(admin: Identity, ticket_cost: Amount, max_tickets: u64) -> LotteryResult<Self> {
        if max_tickets == 0 {
            return Err(LotteryError::InvalidSettings(
                "max_tickets must be greater than zero".to_string(),
            ));
        }
        if admin.is_null() {
            return Err(LotteryError::InvalidSettings(
                "admin identity must not be null".to_string(),
            ));
        }

        Ok(Self {
            players: Vec::new(),
            ticket_cost,
            tickets_remaining: max_tickets,
            max_tickets,
            admin,
            epoch_zero: 0,
        })
    }

    pub fn with_epoch_zero(mut self, epoch_zero: Timestamp) -> Self {
        self.epoch_zero = epoch_zero;
        self
    }

    pub fn players(&self) -> &[Identity] {
        &self.players
    }

    pub fn ticket_cost(&self) -> Amount {
        self.ticket_cost
    }

    pub fn tickets_remaining(&self) -> u64 {
        self.tickets_remaining
    }

    pub fn max_tickets(&self) -> u64 {
        self.max_tickets
    }

    pub fn admin(&self) -> Identity {
        self.admin
    }

    pub fn epoch_zero(&self) -> Timestamp {
        self.epoch_zero
    }

    pub fn tickets_sold(&self) -> u64 {
        self.players.len() as u64
    }

    pub fn phase(&self) -> RoundPhase {
        if self.tickets_remaining == 0 {
            RoundPhase::SoldOut
        } else {
            RoundPhase::Open
        }
    }

    /// True when no ticket has been sold in the current round
    pub fn is_pristine(&self) -> bool {
        self.tickets_remaining == self.max_tickets
    }

    /// Balance that must be in custody for the tickets sold so far
    pub fn expected_balance(&self) -> LotteryResult<Amount> {
        self.ticket_cost
            .checked_mul(self.tickets_sold())
            .ok_or(LotteryError::AmountOverflow)
    }

    pub fn owner_of(&self, ticket_index: u64) -> Option<Identity> {
        usize::try_from(ticket_index)
            .ok()
            .and_then(|index| self.players.get(index))
            .copied()
    }

    /// Ticket indices held by `identity` in the current round
    pub fn tickets_of(&self, identity: &Identity) -> Vec<u64> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, owner)| *owner == identity)
            .map(|(index, _)| index as u64)
            .collect()
    }

    /// Verify the accounting invariants against the balance held in custody
    pub fn check_invariants(&self, held_balance: Amount) -> LotteryResult<()> {
        if self.tickets_remaining > self.max_tickets {
            return Err(LotteryError::StateCorrupted(format!(
                "tickets_remaining {} exceeds max_tickets {}",
                self.tickets_remaining, self.max_tickets
            )));
        }

        if self.tickets_sold() + self.tickets_remaining != self.max_tickets {
            return Err(LotteryError::StateCorrupted(format!(
                "{} players and {} remaining do not add up to {} tickets",
                self.tickets_sold(),
                self.tickets_remaining,
                self.max_tickets
            )));
        }

        let expected = self.expected_balance()?;
        if held_balance != expected {
            return Err(LotteryError::StateCorrupted(format!(
                "held balance {} does not match {} tickets at {}",
                held_balance,
                self.tickets_sold(),
                self.ticket_cost
            )));
        }

        Ok(())
    }

    /// Start a fresh round with the current settings
    pub(crate) fn reset_round(&mut self) {
        self.players.clear();
        self.tickets_remaining = self.max_tickets;
    }
}
