//! Winner selection
//!
//! The winning ticket is `(now - epoch_zero) mod max_tickets`. Anyone who knows
//! the clock and the supply can compute it ahead of time, so a caller who
//! controls when `end_game` lands controls the winner.

use crate::common::types::Timestamp;
use crate::errors::{LotteryError, LotteryResult};

/// Index of the winning ticket for a round of `max_tickets` tickets
pub fn winner_index(now: Timestamp, epoch_zero: Timestamp, max_tickets: u64) -> LotteryResult<u64> {
    let elapsed = now
        .checked_sub(epoch_zero)
        .ok_or(LotteryError::ClockBeforeEpoch { now, epoch_zero })?;

    if max_tickets == 0 {
        return Err(LotteryError::InvalidSettings(
            "max_tickets must be greater than zero".to_string(),
        ));
    }

    Ok(elapsed % max_tickets)
}
