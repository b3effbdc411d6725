//! Liquidation cascade simulator and TWAP position monitor
//!
//! The computational core (`cascade`, `trigger`, `position::lifecycle`) is
//! synchronous and side-effect free. `monitor` drives it against a live
//! feed and a position store.

pub mod cache;
pub mod cascade;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod monitor;
pub mod notify;
pub mod position;
pub mod trigger;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
