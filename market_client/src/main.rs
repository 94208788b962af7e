//! Market Client: a WebSocket client that subscribes to the synthetic market feed and
//! logs every update it receives. It collects symbols from the command line and/or a
//! text file, sends one `subscribe` frame, and then keeps reading until Ctrl+C, when it
//! unsubscribes and closes the connection.
//!
//! Usage example (CLI):
//! ```bash
//! market_client --server 192.168.0.10:3001 --symbols RELIANCE,TCS --path ./symbols.txt
//! ```
//!
//! The symbol file should contain symbols separated by commas, spaces, or new lines.
//! See `market_common::instruments` for the catalogue.
#![warn(missing_docs)]
mod args;
mod sender;

use crate::args::Args;
use crate::sender::CommandSender;
use chrono::DateTime;
use clap::Parser;
use log::{debug, error, info, warn};
use market_common::instruments::{Instrument, SymbolParser};
use market_common::net::ws_url;
use market_common::wire::{MessagePayload, ServerMessage};
use market_common::{MarketError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tungstenite::{Message, WebSocket};

/// Read timeout used to re-check the shutdown flag.
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// One log line for a server frame.
fn describe(message: &ServerMessage) -> String {
    let time = message
        .timestamp
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    match &message.data {
        MessagePayload::Quote(quote) => format!(
            "QUOTE: {} Price={:.2} Change={:+.2} ({:+.2}%) Volume={} Time={}",
            quote.symbol, quote.price, quote.change, quote.change_percent, quote.volume, time
        ),
        MessagePayload::Snapshot(snapshot) => format!(
            "SNAPSHOT: {} quotes, {}={:.2} {}={:.2} {}={:.2}, {} candles Time={}",
            snapshot.quotes.len(),
            snapshot.indices.primary.symbol,
            snapshot.indices.primary.price,
            snapshot.indices.secondary.symbol,
            snapshot.indices.secondary.price,
            snapshot.indices.tertiary.symbol,
            snapshot.indices.tertiary.price,
            snapshot.candles.len(),
            time
        ),
    }
}

/// Runs a blocking loop that receives frames from `socket` and logs them.
/// Returns when the server closes the connection or `shutdown` is set.
fn start_receiver_loop(
    socket: &mut WebSocket<TcpStream>,
    shutdown: &AtomicBool,
) -> Result<(), MarketError> {
    while !shutdown.load(Ordering::Relaxed) {
        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(message) => info!("{}", describe(&message)),
                Err(_) => debug!("Received non-feed message: {}", text),
            },
            Ok(Message::Close(frame)) => {
                info!("Server closed the connection: {:?}", frame);
                return Ok(());
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(tungstenite::Error::ConnectionClosed) => return Ok(()),
            Err(e) => {
                error!("Receive data error: {}", e);
                return Err(e.into());
            }
        }
    }
    info!("Receiver loop stopping...");
    Ok(())
}

/// Merge command-line symbols with the optional symbol file, keeping order and
/// dropping duplicates.
fn collect_symbols(args: &Args) -> Result<Vec<Instrument>, MarketError> {
    let mut instruments: Vec<Instrument> = Vec::new();
    for instrument in &args.symbols {
        if !instruments.contains(instrument) {
            instruments.push(*instrument);
        }
    }

    if let Some(raw) = &args.path {
        let file_path = normalize_path(raw);
        if !is_file_exist(&file_path) {
            return Err(MarketError::Format(format!(
                "Symbol file not found: {}",
                file_path.display()
            )));
        }
        let file = File::open(&file_path)?;
        for instrument in Instrument::parse_from_file(BufReader::new(file))? {
            if !instruments.contains(&instrument) {
                instruments.push(instrument);
            }
        }
    }
    Ok(instruments)
}

fn main() -> Result<(), MarketError> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| MarketError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let instruments = collect_symbols(&args)?;
    if instruments.is_empty() {
        return Err(MarketError::Format(
            "No symbols given; use --symbols or --path".to_string(),
        ));
    }
    info!("Symbols: {:?}", instruments);

    let server = args.server.trim().replace('"', "");
    let url = ws_url(&server);
    info!("Connecting to {}", url);
    let stream = TcpStream::connect(&server)
        .map_err(|e| MarketError::Format(format!("Failed to connect to server: {}", e)))?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let (mut socket, _response) =
        tungstenite::client(url.as_str(), stream).map_err(|e| MarketError::Handshake(e.to_string()))?;

    CommandSender::send_command(&mut socket, &CommandSender::command(&instruments, true))?;
    info!("Client is running. Press Ctrl+C to exit.");

    let result = start_receiver_loop(&mut socket, &shutdown);

    if shutdown.load(Ordering::Relaxed) {
        if let Err(e) =
            CommandSender::send_command(&mut socket, &CommandSender::command(&instruments, false))
        {
            warn!("Failed to unsubscribe: {}", e);
        }
        let _ = socket.close(None);
        let _ = socket.flush();
    }
    result
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}
