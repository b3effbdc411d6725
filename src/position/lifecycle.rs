//! Take-profit / stop-loss / time-exit state machine
//!
//! `OPEN -> {CLOSED_TP, CLOSED_SL, CLOSED_TIME}`. Closed states are
//! terminal; evaluating a closed position never produces a command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{PositionStatus, PositionUpdate, SimulatedPosition};

/// Close at or above this leveraged PnL percent
pub const TAKE_PROFIT_PCT: f64 = 20.0;

/// Close at or below this leveraged PnL percent
pub const STOP_LOSS_PCT: f64 = -20.0;

pub const DEFAULT_LEVERAGE: f64 = 5.0;

pub const DEFAULT_AMOUNT_USD: f64 = 1000.0;

/// Instruction to close one position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseCommand {
    pub position_id: String,
    pub status: PositionStatus,
    pub close_price: f64,
    pub pnl_percent: f64,
}

impl CloseCommand {
    pub fn to_update(&self) -> PositionUpdate {
        PositionUpdate {
            status: self.status,
            close_price: Some(self.close_price),
            pnl_percent: Some(self.pnl_percent),
        }
    }
}

/// Decide whether `position` closes at `price` and time `now`
pub fn evaluate_position(
    position: &SimulatedPosition,
    price: f64,
    now: DateTime<Utc>,
) -> Option<CloseCommand> {
    if !position.is_open() {
        return None;
    }

    let pnl_percent = position.pnl_percent_at(price);

    // Time exit preempts PnL exits
    let status = if position.end_time.is_some_and(|end| now > end) {
        PositionStatus::ClosedTime
    } else if pnl_percent >= TAKE_PROFIT_PCT {
        PositionStatus::ClosedTp
    } else if pnl_percent <= STOP_LOSS_PCT {
        PositionStatus::ClosedSl
    } else {
        return None;
    };

    Some(CloseCommand {
        position_id: position.id.clone(),
        status,
        close_price: price,
        pnl_percent,
    })
}

/// Evaluate every position against one price update
pub fn evaluate_positions(
    positions: &[SimulatedPosition],
    price: f64,
    now: DateTime<Utc>,
) -> Vec<CloseCommand> {
    positions
        .iter()
        .filter_map(|p| evaluate_position(p, price, now))
        .collect()
}

/// Close `position` as decided by `command`. No-op on terminal positions.
pub fn apply_close(position: &SimulatedPosition, command: &CloseCommand) -> SimulatedPosition {
    apply_update(position, &command.to_update())
}

/// Apply a close to a position. Terminal positions are returned unchanged.
pub fn apply_update(position: &SimulatedPosition, update: &PositionUpdate) -> SimulatedPosition {
    let mut next = position.clone();
    if position.status.is_terminal() {
        return next;
    }
    next.status = update.status;
    if update.close_price.is_some() {
        next.close_price = update.close_price;
    }
    if update.pnl_percent.is_some() {
        next.pnl_percent = update.pnl_percent;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{OpenCommand, Side};
    use chrono::Duration;

    fn position(direction: Side, end_in: Option<Duration>) -> (SimulatedPosition, DateTime<Utc>) {
        let now = Utc::now();
        let end_time = end_in.map(|d| (now + d).timestamp_millis()).unwrap_or(0);
        let mut position = SimulatedPosition::open_from(
            &OpenCommand {
                direction,
                entry_price: 100.0,
                trigger_id: "large_x".to_string(),
                end_time,
            },
            now,
        );
        if end_in.is_none() {
            position.end_time = None;
        }
        (position, now)
    }

    #[test]
    fn test_take_profit_long() {
        let (pos, now) = position(Side::Buy, None);
        // +4% at 5x => +20%
        let cmd = evaluate_position(&pos, 104.0, now).unwrap();
        assert_eq!(cmd.status, PositionStatus::ClosedTp);
        assert!((cmd.pnl_percent - 20.0).abs() < 1e-9);
        assert_eq!(cmd.close_price, 104.0);
    }

    #[test]
    fn test_stop_loss_short() {
        let (pos, now) = position(Side::Sell, None);
        let cmd = evaluate_position(&pos, 104.5, now).unwrap();
        assert_eq!(cmd.status, PositionStatus::ClosedSl);
        assert!(cmd.pnl_percent <= -20.0);
    }

    #[test]
    fn test_no_exit_inside_band() {
        let (pos, now) = position(Side::Buy, Some(Duration::minutes(30)));
        assert!(evaluate_position(&pos, 102.0, now).is_none());
        assert!(evaluate_position(&pos, 97.0, now).is_none());
    }

    #[test]
    fn test_time_exit_preempts_take_profit() {
        let (pos, now) = position(Side::Buy, Some(Duration::minutes(10)));
        let later = now + Duration::minutes(11);

        let cmd = evaluate_position(&pos, 110.0, later).unwrap();
        assert_eq!(cmd.status, PositionStatus::ClosedTime);
        assert!((cmd.pnl_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_exit_requires_strictly_later() {
        let (pos, now) = position(Side::Buy, Some(Duration::minutes(10)));
        let end = pos.end_time.unwrap();
        assert!(evaluate_position(&pos, 100.0, end).is_none());
        assert!(evaluate_position(&pos, 100.0, end + Duration::milliseconds(1)).is_some());
        assert!(evaluate_position(&pos, 100.0, now).is_none());
    }

    #[test]
    fn test_closed_positions_are_terminal() {
        let (pos, now) = position(Side::Buy, Some(Duration::minutes(10)));
        let cmd = evaluate_position(&pos, 104.0, now).unwrap();
        let closed = apply_close(&pos, &cmd);
        assert_eq!(closed.status, PositionStatus::ClosedTp);
        assert_eq!(closed.close_price, Some(104.0));

        for price in [1.0, 96.0, 100.0, 104.0, 500.0] {
            assert!(evaluate_position(&closed, price, now + Duration::hours(1)).is_none());
        }

        let reclosed = apply_update(
            &closed,
            &PositionUpdate {
                status: PositionStatus::ClosedSl,
                close_price: Some(90.0),
                pnl_percent: Some(-50.0),
            },
        );
        assert_eq!(reclosed, closed);
    }

    #[test]
    fn test_evaluate_positions_only_returns_exits() {
        let (a, now) = position(Side::Buy, None);
        let (b, _) = position(Side::Sell, None);
        let commands = evaluate_positions(&[a.clone(), b], 104.0, now);
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].position_id, a.id);
        assert_eq!(commands[0].status, PositionStatus::ClosedTp);
        assert_eq!(commands[1].status, PositionStatus::ClosedSl);
    }
}
