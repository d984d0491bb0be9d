pub mod processor;
pub mod state;
pub mod types;
pub mod winner;

pub use processor::{adjust_settings, buy_ticket, end_game, execute};
pub use state::{RoundPhase, RoundState};
pub use types::*;
pub use winner::winner_index;
