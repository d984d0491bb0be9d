//! Error types for the ticket lottery
//!
//! Every lottery failure carries a stable error class so that whatever invoked
//! the call can surface it. Failures are fail-fast: an operation that returns
//! an error has left the round state untouched.

use crate::common::types::{Amount, Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure raised by a lottery entry point
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LotteryError {
    #[error("Insufficient payment: {required} required, {attached} attached")]
    InsufficientPayment { required: Amount, attached: Amount },

    #[error("Insufficient supply: {requested} tickets requested, {remaining} remaining")]
    InsufficientSupply { requested: u64, remaining: u64 },

    #[error("Round not complete: {remaining} tickets still unsold")]
    RoundNotComplete { remaining: u64 },

    #[error("Round in progress: {sold} tickets already sold")]
    RoundInProgress { sold: u64 },

    #[error("Unauthorized: {caller} is not the admin")]
    Unauthorized { caller: Identity },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Caller identity is invalid")]
    InvalidCaller,

    #[error("Invalid payout recipient for ticket {ticket_index}")]
    InvalidRecipient { ticket_index: u64 },

    #[error("Clock {now} is before epoch zero {epoch_zero}")]
    ClockBeforeEpoch { now: Timestamp, epoch_zero: Timestamp },

    #[error("Amount overflow while pricing tickets")]
    AmountOverflow,

    #[error("State corrupted: {0}")]
    StateCorrupted(String),
}

/// Stable failure class reported to the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorClass {
    InsufficientPayment,
    InsufficientSupply,
    RoundNotComplete,
    RoundInProgress,
    Unauthorized,
    InvalidSettings,
    InvalidCaller,
    InvalidRecipient,
    ClockBeforeEpoch,
    AmountOverflow,
    StateCorrupted,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::InsufficientPayment => "INSUFFICIENT_PAYMENT",
            ErrorClass::InsufficientSupply => "INSUFFICIENT_SUPPLY",
            ErrorClass::RoundNotComplete => "ROUND_NOT_COMPLETE",
            ErrorClass::RoundInProgress => "ROUND_IN_PROGRESS",
            ErrorClass::Unauthorized => "UNAUTHORIZED",
            ErrorClass::InvalidSettings => "INVALID_SETTINGS",
            ErrorClass::InvalidCaller => "INVALID_CALLER",
            ErrorClass::InvalidRecipient => "INVALID_RECIPIENT",
            ErrorClass::ClockBeforeEpoch => "CLOCK_BEFORE_EPOCH",
            ErrorClass::AmountOverflow => "AMOUNT_OVERFLOW",
            ErrorClass::StateCorrupted => "STATE_CORRUPTED",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LotteryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LotteryError::InsufficientPayment { .. } => ErrorClass::InsufficientPayment,
            LotteryError::InsufficientSupply { .. } => ErrorClass::InsufficientSupply,
            LotteryError::RoundNotComplete { .. } => ErrorClass::RoundNotComplete,
            LotteryError::RoundInProgress { .. } => ErrorClass::RoundInProgress,
            LotteryError::Unauthorized { .. } => ErrorClass::Unauthorized,
            LotteryError::InvalidSettings(_) => ErrorClass::InvalidSettings,
            LotteryError::InvalidCaller => ErrorClass::InvalidCaller,
            LotteryError::InvalidRecipient { .. } => ErrorClass::InvalidRecipient,
            LotteryError::ClockBeforeEpoch { .. } => ErrorClass::ClockBeforeEpoch,
            LotteryError::AmountOverflow => ErrorClass::AmountOverflow,
            LotteryError::StateCorrupted(_) => ErrorClass::StateCorrupted,
        }
    }
}

/// Failure raised by the in-memory execution environment
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Call rejected: {0}")]
    Rejected(#[from] LotteryError),

    #[error("Clock regression: last call at {last}, this call at {now}")]
    ClockRegression { last: Timestamp, now: Timestamp },

    #[error("Insufficient funds: {caller} holds {available}, call attaches {required}")]
    InsufficientFunds {
        caller: Identity,
        required: Amount,
        available: Amount,
    },

    #[error("Balance overflow crediting {0}")]
    BalanceOverflow(String),
}

impl RuntimeError {
    /// Error class of the failure, including environment-level rejections
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Rejected(e) => e.class().as_str(),
            RuntimeError::ClockRegression { .. } => "CLOCK_REGRESSION",
            RuntimeError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            RuntimeError::BalanceOverflow(_) => "BALANCE_OVERFLOW",
        }
    }
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    MissingRequired(String),
}

/// Scenario file errors
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Scenario setup failed: {0}")]
    Setup(String),
}

/// Root error type for the crate's binary and high-level helpers
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Lottery error: {0}")]
    Lottery(#[from] LotteryError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type LotteryResult<T> = Result<T, LotteryError>;

pub type AppResult<T> = Result<T, AppError>;
