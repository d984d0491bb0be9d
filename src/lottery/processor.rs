//! Lottery entry points
//!
//! Each operation takes the round state by mutable reference together with the
//! execution context of the call. All preconditions are evaluated before the
//! state is touched, so an `Err` always leaves the state as it was.

use crate::common::types::Amount;
use crate::errors::{LotteryError, LotteryResult};
use crate::lottery::state::RoundState;
use crate::lottery::types::{Call, ExecutionContext, LotteryEvent, Receipt, Transfer};
use crate::lottery::winner;
use tracing::{debug, info};

/// Dispatch a call to its entry point
pub fn execute(state: &mut RoundState, ctx: &ExecutionContext, call: Call) -> LotteryResult<Receipt> {
    match call {
        Call::BuyTicket { num_tickets } => buy_ticket(state, ctx, num_tickets),
        Call::EndGame => end_game(state, ctx),
        Call::AdjustSettings {
            new_ticket_cost,
            new_max_tickets,
        } => adjust_settings(state, ctx, new_ticket_cost, new_max_tickets),
    }
}

/// Sell `num_tickets` tickets to the caller, refunding any overpayment.
///
/// Fails with `InsufficientPayment` before `InsufficientSupply`.
pub fn buy_ticket(state: &mut RoundState, ctx: &ExecutionContext, num_tickets: u64) -> LotteryResult<Receipt> {
    // A cost past `Amount::MAX` is more than any payment can cover
    let cost = match state.ticket_cost.checked_mul(num_tickets) {
        Some(cost) if ctx.payment >= cost => cost,
        Some(cost) => {
            return Err(LotteryError::InsufficientPayment {
                required: cost,
                attached: ctx.payment,
            })
        }
        None => {
            return Err(LotteryError::InsufficientPayment {
                required: Amount::MAX,
                attached: ctx.payment,
            })
        }
    };

    if state.tickets_remaining < num_tickets {
        return Err(LotteryError::InsufficientSupply {
            requested: num_tickets,
            remaining: state.tickets_remaining,
        });
    }

    // Null buyers cannot receive a payout
    if ctx.caller.is_null() {
        return Err(LotteryError::InvalidCaller);
    }

    let first_index = state.tickets_sold();
    for _ in 0..num_tickets {
        state.players.push(ctx.caller);
        state.tickets_remaining -= 1;
    }

    let refund = ctx.payment - cost;
    let transfers = refund_transfers(ctx, refund);

    debug!(
        buyer = %ctx.caller.short(),
        first_index,
        count = num_tickets,
        refund,
        remaining = state.tickets_remaining,
        "tickets purchased"
    );

    Ok(Receipt {
        event: LotteryEvent::TicketsPurchased {
            buyer: ctx.caller,
            first_index,
            count: num_tickets,
            refund,
        },
        transfers,
    })
}

/// Pay the whole held balance to the winning ticket and start a new round
pub fn end_game(state: &mut RoundState, ctx: &ExecutionContext) -> LotteryResult<Receipt> {
    if state.tickets_remaining != 0 {
        return Err(LotteryError::RoundNotComplete {
            remaining: state.tickets_remaining,
        });
    }

    let winner_index = winner::winner_index(ctx.now, state.epoch_zero, state.max_tickets)?;
    let winner = state.owner_of(winner_index).ok_or_else(|| {
        LotteryError::StateCorrupted(format!("no buyer recorded for ticket {}", winner_index))
    })?;

    if winner.is_null() {
        return Err(LotteryError::InvalidRecipient {
            ticket_index: winner_index,
        });
    }

    let payout = ctx.balance;
    state.reset_round();

    info!(
        winner = %winner.short(),
        winner_index,
        payout,
        now = ctx.now,
        "round ended"
    );

    let transfers = if payout > 0 {
        vec![Transfer::payout(winner, payout)]
    } else {
        Vec::new()
    };

    Ok(Receipt {
        event: LotteryEvent::GameEnded {
            winner_index,
            winner,
            payout,
        },
        transfers,
    })
}

/// Change price and supply between rounds. Admin only.
///
/// The call is not payable: anything attached comes straight back to the
/// caller so that custody keeps matching the tickets sold.
pub fn adjust_settings(
    state: &mut RoundState,
    ctx: &ExecutionContext,
    new_ticket_cost: Amount,
    new_max_tickets: u64,
) -> LotteryResult<Receipt> {
    if ctx.caller != state.admin {
        return Err(LotteryError::Unauthorized { caller: ctx.caller });
    }

    if !state.is_pristine() {
        return Err(LotteryError::RoundInProgress {
            sold: state.tickets_sold(),
        });
    }

    if new_max_tickets == 0 {
        return Err(LotteryError::InvalidSettings(
            "max_tickets must be greater than zero".to_string(),
        ));
    }

    state.ticket_cost = new_ticket_cost;
    state.max_tickets = new_max_tickets;
    state.tickets_remaining = new_max_tickets;

    info!(
        ticket_cost = new_ticket_cost,
        max_tickets = new_max_tickets,
        "settings adjusted"
    );

    Ok(Receipt {
        event: LotteryEvent::SettingsAdjusted {
            ticket_cost: new_ticket_cost,
            max_tickets: new_max_tickets,
        },
        transfers: refund_transfers(ctx, ctx.payment),
    })
}

fn refund_transfers(ctx: &ExecutionContext, refund: Amount) -> Vec<Transfer> {
    if refund > 0 {
        vec![Transfer::refund(ctx.caller, refund)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Identity;
    use crate::errors::ErrorClass;
    use crate::lottery::types::TransferKind;
    use crate::lottery::RoundPhase;

    fn admin() -> Identity {
        Identity::from_label("admin")
    }

    fn fresh(ticket_cost: Amount, max_tickets: u64) -> RoundState {
        RoundState::new(admin(), ticket_cost, max_tickets).unwrap()
    }

    fn buyer(label: &str, payment: Amount) -> ExecutionContext {
        ExecutionContext::new(Identity::from_label(label)).with_payment(payment)
    }

    #[test]
    fn test_buy_ticket_assigns_sequential_indices() {
        let mut state = fresh(10, 5);
        let alice = Identity::from_label("alice");
        let bob = Identity::from_label("bob");

        let receipt = buy_ticket(&mut state, &buyer("alice", 10), 1).unwrap();
        assert_eq!(
            receipt.event,
            LotteryEvent::TicketsPurchased {
                buyer: alice,
                first_index: 0,
                count: 1,
                refund: 0
            }
        );
        assert!(receipt.transfers.is_empty());

        let receipt = buy_ticket(&mut state, &buyer("bob", 20), 2).unwrap();
        match receipt.event {
            LotteryEvent::TicketsPurchased { first_index, count, .. } => {
                assert_eq!((first_index, count), (1, 2));
            }
            other => panic!("Expected purchase event, got {:?}", other),
        }

        assert_eq!(state.players(), &[alice, bob, bob]);
        assert_eq!(state.tickets_remaining(), 2);
    }

    #[test]
    fn test_overpayment_is_refunded() {
        let mut state = fresh(1, 5);
        let receipt = buy_ticket(&mut state, &buyer("john", 3), 1).unwrap();

        assert_eq!(
            receipt.transfers,
            vec![Transfer::refund(Identity::from_label("john"), 2)]
        );
        assert_eq!(receipt.total(TransferKind::Refund), 2);
        assert_eq!(state.tickets_sold(), 1);
    }

    #[test]
    fn test_buy_zero_tickets_is_noop() {
        let mut state = fresh(5, 3);
        let receipt = buy_ticket(&mut state, &buyer("alice", 0), 0).unwrap();
        assert!(receipt.transfers.is_empty());
        assert!(state.is_pristine());

        // Everything attached to a zero-ticket purchase is excess
        let receipt = buy_ticket(&mut state, &buyer("alice", 4), 0).unwrap();
        assert_eq!(receipt.total(TransferKind::Refund), 4);
        assert!(state.is_pristine());
    }

    #[test]
    fn test_insufficient_payment_leaves_state_unchanged() {
        let mut state = fresh(10, 5);
        let before = state.clone();

        let err = buy_ticket(&mut state, &buyer("alice", 9), 1).unwrap_err();
        assert_eq!(err, LotteryError::InsufficientPayment { required: 10, attached: 9 });
        assert_eq!(err.class(), ErrorClass::InsufficientPayment);
        assert_eq!(state, before);
    }

    #[test]
    fn test_payment_checked_before_supply() {
        let mut state = fresh(10, 1);
        let err = buy_ticket(&mut state, &buyer("alice", 0), 2).unwrap_err();
        assert_eq!(err.class(), ErrorClass::InsufficientPayment);
    }

    #[test]
    fn test_oversell_rejected() {
        let mut state = fresh(1, 3);
        buy_ticket(&mut state, &buyer("alice", 2), 2).unwrap();
        let before = state.clone();

        let err = buy_ticket(&mut state, &buyer("bob", 2), 2).unwrap_err();
        assert_eq!(err, LotteryError::InsufficientSupply { requested: 2, remaining: 1 });
        assert_eq!(state, before);
    }

    #[test]
    fn test_overflowing_cost_is_insufficient_payment() {
        let mut state = fresh(u64::MAX, 5);
        let err = buy_ticket(&mut state, &buyer("alice", u64::MAX), 2).unwrap_err();
        assert_eq!(
            err,
            LotteryError::InsufficientPayment {
                required: u64::MAX,
                attached: u64::MAX
            }
        );
        assert_eq!(err.class(), ErrorClass::InsufficientPayment);
        assert!(state.is_pristine());
    }

    #[test]
    fn test_overflowing_cost_reported_before_supply() {
        // 3 tickets requested from a round of 2
        let mut state = fresh(u64::MAX / 2 + 1, 2);
        let err = buy_ticket(&mut state, &buyer("alice", 0), 3).unwrap_err();
        assert_eq!(err.class(), ErrorClass::InsufficientPayment);
    }

    #[test]
    fn test_null_buyer_rejected() {
        let mut state = fresh(1, 3);
        let ctx = ExecutionContext::new(Identity::NULL).with_payment(1);
        assert_eq!(buy_ticket(&mut state, &ctx, 1), Err(LotteryError::InvalidCaller));
        assert!(state.is_pristine());
    }

    #[test]
    fn test_end_game_requires_sellout() {
        let mut state = fresh(1, 2);
        buy_ticket(&mut state, &buyer("alice", 1), 1).unwrap();
        let before = state.clone();

        let ctx = ExecutionContext::new(admin()).at(20).with_balance(1);
        assert_eq!(
            end_game(&mut state, &ctx),
            Err(LotteryError::RoundNotComplete { remaining: 1 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_end_game_pays_time_selected_winner() {
        let mut state = fresh(1, 5);
        for label in ["p0", "p1", "p2", "p3", "p4"] {
            buy_ticket(&mut state, &buyer(label, 1), 1).unwrap();
        }
        assert_eq!(state.phase(), RoundPhase::SoldOut);

        let ctx = ExecutionContext::new(admin()).at(23).with_balance(5);
        let receipt = end_game(&mut state, &ctx).unwrap();

        let p3 = Identity::from_label("p3");
        assert_eq!(
            receipt.event,
            LotteryEvent::GameEnded {
                winner_index: 3,
                winner: p3,
                payout: 5
            }
        );
        assert_eq!(receipt.transfers, vec![Transfer::payout(p3, 5)]);
        assert!(state.is_pristine());
        assert!(state.players().is_empty());
    }

    #[test]
    fn test_sellout_at_twenty_pays_first_ticket() {
        let cost = 1_000_000;
        let mut state = fresh(cost, 5);
        for label in ["alice", "bob", "charles", "john", "mike"] {
            buy_ticket(&mut state, &buyer(label, cost), 1).unwrap();
        }

        let ctx = ExecutionContext::new(admin()).at(20).with_balance(5 * cost);
        let receipt = end_game(&mut state, &ctx).unwrap();

        let alice = Identity::from_label("alice");
        assert_eq!(
            receipt.event,
            LotteryEvent::GameEnded {
                winner_index: 0,
                winner: alice,
                payout: 5 * cost
            }
        );
        assert_eq!(receipt.transfers, vec![Transfer::payout(alice, 5 * cost)]);
        assert!(state.players().is_empty());
        assert_eq!(state.tickets_remaining(), 5);
    }

    #[test]
    fn test_end_game_before_epoch_is_atomic() {
        let mut state = fresh(1, 1).with_epoch_zero(100);
        buy_ticket(&mut state, &buyer("alice", 1), 1).unwrap();
        let before = state.clone();

        let ctx = ExecutionContext::new(admin()).at(50).with_balance(1);
        assert_eq!(
            end_game(&mut state, &ctx),
            Err(LotteryError::ClockBeforeEpoch { now: 50, epoch_zero: 100 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_end_game_rejects_null_winner() {
        let mut state = fresh(1, 1);
        state.players.push(Identity::NULL);
        state.tickets_remaining = 0;
        let before = state.clone();

        let ctx = ExecutionContext::new(admin()).at(7).with_balance(1);
        assert_eq!(
            end_game(&mut state, &ctx),
            Err(LotteryError::InvalidRecipient { ticket_index: 0 })
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_free_round_pays_nothing() {
        let mut state = fresh(0, 1);
        buy_ticket(&mut state, &buyer("alice", 0), 1).unwrap();
        let receipt = end_game(&mut state, &ExecutionContext::new(admin())).unwrap();
        assert!(receipt.transfers.is_empty());
        assert!(state.is_pristine());
    }

    #[test]
    fn test_adjust_settings_requires_admin() {
        let mut state = fresh(1, 5);
        let mallory = Identity::from_label("mallory");
        let err = adjust_settings(&mut state, &ExecutionContext::new(mallory), 2, 6).unwrap_err();
        assert_eq!(err, LotteryError::Unauthorized { caller: mallory });

        // Still unauthorized with a round in progress
        buy_ticket(&mut state, &buyer("alice", 1), 1).unwrap();
        let err = adjust_settings(&mut state, &ExecutionContext::new(mallory), 2, 6).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Unauthorized);
    }

    #[test]
    fn test_adjust_settings_blocked_mid_round() {
        let mut state = fresh(1, 5);
        buy_ticket(&mut state, &buyer("alice", 1), 1).unwrap();
        let before = state.clone();

        let err = adjust_settings(&mut state, &ExecutionContext::new(admin()), 2, 6).unwrap_err();
        assert_eq!(err, LotteryError::RoundInProgress { sold: 1 });
        assert_eq!(state, before);
    }

    #[test]
    fn test_adjust_settings_applies_atomically() {
        let mut state = fresh(1, 5);
        let receipt = adjust_settings(&mut state, &ExecutionContext::new(admin()), 2, 6).unwrap();

        assert_eq!(
            receipt.event,
            LotteryEvent::SettingsAdjusted {
                ticket_cost: 2,
                max_tickets: 6
            }
        );
        assert_eq!(state.ticket_cost(), 2);
        assert_eq!(state.max_tickets(), 6);
        assert_eq!(state.tickets_remaining(), 6);
    }

    #[test]
    fn test_adjust_settings_rejects_zero_supply() {
        let mut state = fresh(1, 5);
        let err = adjust_settings(&mut state, &ExecutionContext::new(admin()), 2, 0).unwrap_err();
        assert_eq!(err.class(), ErrorClass::InvalidSettings);
        assert_eq!(state.max_tickets(), 5);
    }

    #[test]
    fn test_adjust_settings_refunds_attached_payment() {
        let mut state = fresh(1, 5);
        let ctx = ExecutionContext::new(admin()).with_payment(7);
        let receipt = adjust_settings(&mut state, &ctx, 3, 4).unwrap();
        assert_eq!(receipt.transfers, vec![Transfer::refund(admin(), 7)]);
    }

    #[test]
    fn test_execute_dispatches_calls() {
        let mut state = fresh(1, 1);
        let receipt = execute(&mut state, &buyer("alice", 1), Call::BuyTicket { num_tickets: 1 }).unwrap();
        assert!(matches!(receipt.event, LotteryEvent::TicketsPurchased { .. }));

        let ctx = ExecutionContext::new(admin()).at(9).with_balance(1);
        let receipt = execute(&mut state, &ctx, Call::EndGame).unwrap();
        assert!(matches!(receipt.event, LotteryEvent::GameEnded { winner_index: 0, .. }));
    }
}
