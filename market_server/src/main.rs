//! Synthetic market data feed server.
//!
//! This binary random-walks a fixed catalogue of equities, indices and a candle series,
//! and streams the result to WebSocket clients. Internally, it wires together four
//! building blocks:
//!
//! - `MarketGenerator`: advances every instrument and the candle window by one step per
//!   tick and returns a complete snapshot.
//! - `Broadcaster`: owns the generator and the connection table; pushes the initial
//!   snapshot to new connections and fans each tick out to matching subscribers.
//! - `TickerHandle`: a dedicated thread that calls `Broadcaster::tick` on a fixed
//!   interval until it is stopped.
//! - `WsListener`: accepts TCP connections, upgrades them on `/ws` and runs one thread
//!   per client that applies subscribe/unsubscribe frames and drains its outbound queue.
//!
//! Concurrency and shutdown:
//! - The connection table and the generator each sit behind a `Mutex`; connection
//!   threads and the tick thread only hold them for the duration of one operation.
//! - Each connection owns an unbounded `crossbeam_channel`; a push never blocks the tick
//!   and a failed push prunes only that connection.
//! - Ctrl+C stops the accept loop, then the tick loop is stopped through its handle.
//!
//! Network protocol (high-level):
//! - Bind address: `0.0.0.0:3001` by default (see `config`).
//! - On connect the server sends `{"type":"market_data","data":<snapshot>}`.
//! - Client sends `{"event":"subscribe","symbols":["TCS"]}` and receives
//!   `{"type":"price_update","data":<quote>}` for each subscribed symbol on every tick.
#![warn(missing_docs)]
use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::model::generator::MarketGenerator;
use crate::ticker::TickerHandle;
use crate::ws::WsListener;
use clap::Parser;
use log::{info, warn};
use market_common::MarketError;
use market_common::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod broadcast;
mod config;
pub mod model;
mod ticker;
mod ws;

fn main() -> Result<(), MarketError> {
    let dotenv = dotenvy::dotenv();
    let config = ServerConfig::parse();
    init_logger(config.log_level());
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }
    config.validate()?;
    info!("Environment: {:?}", config.environment);

    let generator = MarketGenerator::new(config.generator_config());
    let broadcaster = Arc::new(Broadcaster::new(generator, config.push_mode));
    let ticker = TickerHandle::spawn(Arc::clone(&broadcaster), config.tick_interval())?;

    let listener = WsListener::bind(
        &config.bind_address(),
        Arc::clone(&broadcaster),
        config.session_settings(),
    )?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            warn!("Ctrl+C received. Shutting down server...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| MarketError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    listener.accept_loop(&shutdown)?;
    ticker.stop();
    info!("Server stopped");
    Ok(())
}

fn init_logger(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
