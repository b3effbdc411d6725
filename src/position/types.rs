//! Simulated position records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lifecycle::{DEFAULT_AMOUNT_USD, DEFAULT_LEVERAGE};
use crate::trigger::{OpenCommand, Side};

/// Position status. Every `Closed*` state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    /// Closed at take-profit
    ClosedTp,
    /// Closed at stop-loss
    ClosedSl,
    /// Closed at the end of the triggering order's duration
    ClosedTime,
}

impl PositionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PositionStatus::Open)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PositionStatus::Open => "OPEN",
            PositionStatus::ClosedTp => "CLOSED_TP",
            PositionStatus::ClosedSl => "CLOSED_SL",
            PositionStatus::ClosedTime => "CLOSED_TIME",
        }
    }
}

/// A paper position opened by a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedPosition {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub entry_price: f64,
    pub direction: Side,
    pub status: PositionStatus,
    pub amount_usd: f64,
    pub leverage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl_percent: Option<f64>,
    /// Deterministic key of the trigger that opened this position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl SimulatedPosition {
    /// Fresh OPEN record for a trigger proposal
    pub fn open_from(command: &OpenCommand, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            entry_price: command.entry_price,
            direction: command.direction,
            status: PositionStatus::Open,
            amount_usd: DEFAULT_AMOUNT_USD,
            leverage: DEFAULT_LEVERAGE,
            close_price: None,
            pnl_percent: None,
            trigger_id: Some(command.trigger_id.clone()),
            end_time: DateTime::from_timestamp_millis(command.end_time),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Leveraged PnL in percent at `price`
    pub fn pnl_percent_at(&self, price: f64) -> f64 {
        let raw = match self.direction {
            Side::Buy => (price - self.entry_price) / self.entry_price,
            Side::Sell => (self.entry_price - price) / self.entry_price,
        };
        raw * self.leverage * 100.0
    }

    /// Leveraged PnL in USD at `price`
    pub fn pnl_usd_at(&self, price: f64) -> f64 {
        self.amount_usd * self.pnl_percent_at(price) / 100.0
    }
}

/// Fields written when a position closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub status: PositionStatus,
    pub close_price: Option<f64>,
    pub pnl_percent: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(direction: Side) -> OpenCommand {
        OpenCommand {
            direction,
            entry_price: 100.0,
            trigger_id: "large_1".to_string(),
            end_time: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_open_from_command() {
        let now = Utc::now();
        let position = SimulatedPosition::open_from(&command(Side::Buy), now);

        assert!(position.is_open());
        assert_eq!(position.leverage, 5.0);
        assert_eq!(position.amount_usd, 1000.0);
        assert_eq!(position.trigger_id.as_deref(), Some("large_1"));
        assert_eq!(
            position.end_time.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
        assert!(Uuid::parse_str(&position.id).is_ok());
    }

    #[test]
    fn test_pnl_by_direction() {
        let now = Utc::now();
        let long = SimulatedPosition::open_from(&command(Side::Buy), now);
        let short = SimulatedPosition::open_from(&command(Side::Sell), now);

        // +2% move at 5x
        assert!((long.pnl_percent_at(102.0) - 10.0).abs() < 1e-9);
        assert!((short.pnl_percent_at(102.0) + 10.0).abs() < 1e-9);
        assert!((long.pnl_usd_at(102.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&PositionStatus::ClosedTime).unwrap(),
            r#""CLOSED_TIME""#
        );
        assert!(PositionStatus::ClosedTp.is_terminal());
        assert!(!PositionStatus::Open.is_terminal());
    }

    #[test]
    fn test_position_json_roundtrip_omits_empty_fields() {
        let position = SimulatedPosition::open_from(&command(Side::Sell), Utc::now());
        let json = serde_json::to_string(&position).unwrap();
        assert!(json.contains("\"triggerId\":\"large_1\""));
        assert!(!json.contains("closePrice"));
    }
}
