//! Ticket Lottery - deterministic round-based lottery state machine
//!
//! Participants buy numbered tickets until the round's supply is exhausted,
//! `end_game` pays the whole collected balance to a winner picked from the
//! current time, and the round starts over. An admin may reprice the tickets
//! or resize the supply between rounds.
//!
//! The core in [`lottery`] is a set of plain functions over an owned
//! [`RoundState`] and an explicit [`ExecutionContext`]. [`runtime`] provides an
//! in-memory environment that executes the transfers those functions request.

pub mod common;
pub mod config;
pub mod errors;
pub mod lottery;
pub mod runtime;
pub mod scenario;

pub use common::types::{Amount, Identity, Timestamp};
pub use errors::{AppError, AppResult, ErrorClass, LotteryError, LotteryResult, RuntimeError};
pub use lottery::{Call, ExecutionContext, LotteryEvent, Receipt, RoundPhase, RoundState, Transfer, TransferKind};
pub use runtime::LotteryRuntime;
