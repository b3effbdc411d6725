//! Position trigger engine
//!
//! Re-derives every trigger from the full order history on each call.
//! Trigger ids are deterministic, so a trigger that already produced a
//! position (open or closed) is skipped and evaluation stays idempotent.

use std::collections::HashSet;

use tracing::debug;

use super::types::{OpenCommand, Side, TimeWeightedOrder, TriggerKind};
use crate::position::SimulatedPosition;

/// Orders strictly above this USD size trigger on their own
pub const LARGE_ORDER_USD: f64 = 1_000_000.0;

/// Sliding window for the dense-cluster rule
pub const DENSE_WINDOW_MS: i64 = 600_000;

/// Same-side orders required in one window
pub const DENSE_MIN_ORDERS: usize = 10;

/// Evaluate both trigger rules against the supplied orders
pub fn evaluate_triggers(
    orders: &[TimeWeightedOrder],
    current_price: f64,
    existing_positions: &[SimulatedPosition],
) -> Vec<OpenCommand> {
    let existing: HashSet<&str> = existing_positions
        .iter()
        .filter_map(|p| p.trigger_id.as_deref())
        .collect();

    evaluate_with_existing(orders, current_price, &existing)
}

/// Evaluate against a precomputed set of materialized trigger ids
pub fn evaluate_with_existing(
    orders: &[TimeWeightedOrder],
    current_price: f64,
    existing: &HashSet<&str>,
) -> Vec<OpenCommand> {
    let mut emitted: HashSet<String> = HashSet::new();
    let mut commands = Vec::new();

    let mut push = |command: OpenCommand, commands: &mut Vec<OpenCommand>| {
        if existing.contains(command.trigger_id.as_str()) || emitted.contains(&command.trigger_id) {
            debug!(trigger_id = %command.trigger_id, "Trigger already materialized");
            return;
        }
        emitted.insert(command.trigger_id.clone());
        commands.push(command);
    };

    for command in large_order_commands(orders, current_price) {
        push(command, &mut commands);
    }
    for command in dense_cluster_commands(orders, current_price) {
        push(command, &mut commands);
    }

    commands
}

/// Deterministic id for the large-order rule
pub fn large_trigger_id(order: &TimeWeightedOrder) -> String {
    format!("{}{}", TriggerKind::LARGE_PREFIX, order.id)
}

/// Deterministic id for the dense-cluster rule
pub fn dense_trigger_id(first_in_window: &TimeWeightedOrder, side: Side) -> String {
    format!("{}{}_{}", TriggerKind::DENSE_PREFIX, first_in_window.id, side)
}

fn large_order_commands(orders: &[TimeWeightedOrder], current_price: f64) -> Vec<OpenCommand> {
    orders
        .iter()
        .filter(|o| o.size_usd > LARGE_ORDER_USD)
        .map(|o| OpenCommand {
            direction: o.side,
            entry_price: o.price_or(current_price),
            trigger_id: large_trigger_id(o),
            end_time: o.end_time_ms(),
        })
        .collect()
}

/// Every candidate dense-cluster command, before deduplication.
///
/// A window that meets the threshold for either side is consumed whole,
/// whether or not its trigger was already materialized, so later anchors
/// inside it never produce shifted ids on re-evaluation.
fn dense_cluster_commands(orders: &[TimeWeightedOrder], current_price: f64) -> Vec<OpenCommand> {
    let mut sorted: Vec<&TimeWeightedOrder> = orders.iter().collect();
    sorted.sort_by_key(|o| o.time);

    let mut commands = Vec::new();
    let mut anchor = 0;

    while anchor < sorted.len() {
        let start = sorted[anchor].time;
        let end = sorted[anchor..]
            .iter()
            .position(|o| o.time.saturating_sub(start) > DENSE_WINDOW_MS)
            .map_or(sorted.len(), |offset| anchor + offset);
        let window = &sorted[anchor..end];

        let first = window[0];
        let last = window[window.len() - 1];
        let mut consumed = false;

        for side in Side::BOTH {
            let count = window.iter().filter(|o| o.side == side).count();
            if count < DENSE_MIN_ORDERS {
                continue;
            }
            consumed = true;
            commands.push(OpenCommand {
                direction: side,
                entry_price: last.price_or(current_price),
                trigger_id: dense_trigger_id(first, side),
                end_time: last.end_time_ms(),
            });
        }

        anchor = if consumed { end } else { anchor + 1 };
    }

    commands
}
