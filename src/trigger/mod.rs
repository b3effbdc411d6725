//! TWAP-driven position triggers

pub mod engine;
pub mod types;

pub use engine::{
    dense_trigger_id, evaluate_triggers, evaluate_with_existing, large_trigger_id,
    DENSE_MIN_ORDERS, DENSE_WINDOW_MS, LARGE_ORDER_USD,
};
pub use types::{OpenCommand, Side, TimeWeightedOrder, TriggerKind};
