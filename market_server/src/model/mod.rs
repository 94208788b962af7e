//! Domain models and utilities for the market feed server.
//!
//! This module groups the state the server evolves over time:
//! - `candles`: bounded candle window and synthetic bar construction.
//! - `generator`: random-walk `MarketGenerator` producing snapshots.
//! - `heartbeat`: per-connection keep-alive tracker for idle clients.

pub mod candles;
pub mod generator;
pub mod heartbeat;
