//! Position event notifications

use async_trait::async_trait;
use tracing::info;

use crate::position::SimulatedPosition;
use crate::trigger::TriggerKind;

/// Receives position lifecycle events from the monitor
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn on_open(&self, position: &SimulatedPosition);

    async fn on_close(&self, position: &SimulatedPosition);
}

/// Human-readable source label for a position
pub fn trigger_label(position: &SimulatedPosition) -> String {
    match position.trigger_id.as_deref().and_then(TriggerKind::of) {
        Some(kind) => kind.to_string(),
        None => "manual".to_string(),
    }
}

pub fn open_message(position: &SimulatedPosition) -> String {
    format!(
        "Opened {} {} at {:.4} ({}x, ${:.0}) on {}",
        position.direction,
        trigger_label(position),
        position.entry_price,
        position.leverage,
        position.amount_usd,
        position.created_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

pub fn close_message(position: &SimulatedPosition) -> String {
    format!(
        "Closed {} {} as {}: {:.4} -> {:.4}, PnL {:+.2}%",
        position.direction,
        trigger_label(position),
        position.status.label(),
        position.entry_price,
        position.close_price.unwrap_or(position.entry_price),
        position.pnl_percent.unwrap_or(0.0),
    )
}

/// Writes events as `tracing` records
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn on_open(&self, position: &SimulatedPosition) {
        info!(
            id = %position.id,
            trigger_id = position.trigger_id.as_deref().unwrap_or("-"),
            "{}",
            open_message(position)
        );
    }

    async fn on_close(&self, position: &SimulatedPosition) {
        info!(
            id = %position.id,
            trigger_id = position.trigger_id.as_deref().unwrap_or("-"),
            "{}",
            close_message(position)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionStatus;
    use crate::trigger::{OpenCommand, Side};
    use chrono::Utc;

    fn position(trigger_id: &str) -> SimulatedPosition {
        SimulatedPosition::open_from(
            &OpenCommand {
                direction: Side::Buy,
                entry_price: 30.0,
                trigger_id: trigger_id.to_string(),
                end_time: 0,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_trigger_label() {
        assert_eq!(trigger_label(&position("large_abc")), "large order");
        assert_eq!(trigger_label(&position("dense_abc_SELL")), "dense cluster");

        let mut manual = position("x");
        manual.trigger_id = None;
        assert_eq!(trigger_label(&manual), "manual");
    }

    #[test]
    fn test_event_messages() {
        let mut position = position("large_abc");
        let opened = open_message(&position);
        assert!(opened.starts_with("Opened BUY large order at 30.0000 (5x, $1000)"));

        position.status = PositionStatus::ClosedSl;
        position.close_price = Some(28.5);
        position.pnl_percent = Some(-25.0);
        assert_eq!(
            close_message(&position),
            "Closed BUY large order as CLOSED_SL: 30.0000 -> 28.5000, PnL -25.00%"
        );
    }

    #[tokio::test]
    async fn test_log_notifier_handles_open_position_close() {
        // An open record has no close fields; the message falls back to entry
        let position = position("dense_abc_BUY");
        assert!(close_message(&position).ends_with("30.0000 -> 30.0000, PnL +0.00%"));
        LogNotifier.on_open(&position).await;
        LogNotifier.on_close(&position).await;
    }
}
