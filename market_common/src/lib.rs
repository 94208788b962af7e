//!
//! Common types and utilities shared by the market feed server and client.
//!
//! This crate aggregates:
//! - `error`: unified error type `MarketError` used across the workspace.
//! - `result`: handy `Result<T, MarketError>` alias.
//! - `instruments`: instrument catalogue and symbol-file parsing.
//! - `model`: quotes, candles and snapshots produced by the generator.
//! - `wire`: JSON frames exchanged over the WebSocket feed.
//! - `net`: networking constants and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod instruments;
pub mod model;
pub mod net;
pub mod result;
pub mod wire;

pub use error::MarketError;
pub use result::Result;
pub use wire::{ClientMessage, ServerMessage};
