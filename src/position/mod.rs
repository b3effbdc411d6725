//! Simulated position management

pub mod lifecycle;
pub mod store;
pub mod types;

pub use lifecycle::{
    apply_close, apply_update, evaluate_position, evaluate_positions, CloseCommand, DEFAULT_AMOUNT_USD,
    DEFAULT_LEVERAGE, STOP_LOSS_PCT, TAKE_PROFIT_PCT,
};
pub use store::{CreateOutcome, JsonFilePositionStore, MemoryPositionStore, PositionStore};
pub use types::{PositionStatus, PositionUpdate, SimulatedPosition};
