//! Subscription table and snapshot fan-out.
//!
//! The `Broadcaster` owns the `MarketGenerator` and a table of live connections. Each
//! connection is registered with the sending half of an unbounded `crossbeam_channel`;
//! the connection's own thread drains the receiving half into its socket. Pushing a
//! message therefore never blocks the tick, and a slow client only grows its own queue.
//!
//! Connection lifecycle:
//!
//! ```text
//! Connected --subscribe--> Subscribed(topics) <--unsubscribe/subscribe--> Unsubscribed
//!     \____________________________|_____________________________________/
//!                                  v
//!                             Disconnected (record removed)
//! ```
//!
//! Broadcast is best-effort: if a push fails because the receiver is gone, that
//! connection is pruned once the pass is over and the remaining connections are
//! still served. A tick never fails: if a thread panicked while holding the generator
//! or the table, the lock is cleared and the data taken back.

use crate::model::generator::MarketGenerator;
use chrono::Utc;
use clap::ValueEnum;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use market_common::ServerMessage;
use market_common::{MarketError, Result};
use market_common::model::Snapshot;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifier assigned to every accepted connection.
pub type ConnectionId = u64;

/// Message handed to a connection's outbound queue.
pub type Outbound = Arc<ServerMessage>;

/// How each tick is delivered to connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PushMode {
    /// One `price_update` per subscribed symbol.
    #[default]
    Topics,
    /// The whole snapshot to every connection, regardless of topics.
    Snapshot,
}

/// Subscription state of a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, never subscribed.
    Connected,
    /// Holding at least one topic.
    Subscribed,
    /// Had topics and dropped all of them.
    Unsubscribed,
}

/// Outcome of one broadcast pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Messages queued to connections.
    pub delivered: usize,
    /// Connections removed because their receiver was gone.
    pub pruned: usize,
}

struct Session {
    topics: HashSet<String>,
    state: SessionState,
    tx: Sender<Outbound>,
}

impl Session {
    fn push(&self, id: ConnectionId, msg: &Outbound) -> Result<()> {
        self.tx
            .send(Arc::clone(msg))
            .map_err(|_| MarketError::ChannelSend(format!("connection {} queue closed", id)))
    }

    fn refresh_state(&mut self) {
        self.state = match (self.state, self.topics.is_empty()) {
            (_, false) => SessionState::Subscribed,
            (SessionState::Connected, true) => SessionState::Connected,
            (_, true) => SessionState::Unsubscribed,
        };
    }
}

#[derive(Default)]
struct SessionTable {
    next_id: ConnectionId,
    sessions: HashMap<ConnectionId, Session>,
}

/// Owner of the generator and the connection table.
pub struct Broadcaster {
    generator: Mutex<MarketGenerator>,
    sessions: Mutex<SessionTable>,
    mode: PushMode,
}

/// Lock `mutex`, taking the data back if a previous holder panicked.
fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("{} lock was poisoned; recovering", name);
        mutex.clear_poison();
        poisoned.into_inner()
    })
}

fn normalize(topics: &[String]) -> impl Iterator<Item = String> + '_ {
    topics
        .iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
}

impl Broadcaster {
    /// Create a broadcaster around `generator`.
    pub fn new(generator: MarketGenerator, mode: PushMode) -> Self {
        Self {
            generator: Mutex::new(generator),
            sessions: Mutex::new(SessionTable::default()),
            mode,
        }
    }

    /// Register a connection and push it the current snapshot.
    pub fn on_connect(&self, tx: Sender<Outbound>) -> Result<ConnectionId> {
        let snapshot = self.generator.lock()?.snapshot();
        let initial: Outbound = Arc::new(ServerMessage::market_data(
            snapshot,
            Utc::now().timestamp_millis(),
        ));

        let mut table = self.sessions.lock()?;
        let id = table.next_id;
        table.next_id += 1;
        let session = Session {
            topics: HashSet::new(),
            state: SessionState::Connected,
            tx,
        };
        match session.push(id, &initial) {
            Ok(()) => {
                table.sessions.insert(id, session);
                info!(
                    "Connection {} registered. Total connections: {}",
                    id,
                    table.sessions.len()
                );
            }
            Err(e) => warn!("Initial snapshot not delivered: {}", e),
        }
        Ok(id)
    }

    /// Add `topics` to the connection's set. Unknown connections are ignored.
    pub fn subscribe(&self, id: ConnectionId, topics: &[String]) -> Result<Option<SessionState>> {
        let mut table = self.sessions.lock()?;
        let Some(session) = table.sessions.get_mut(&id) else {
            debug!("Subscribe for unknown connection {}", id);
            return Ok(None);
        };
        session.topics.extend(normalize(topics));
        session.refresh_state();
        info!("Connection {} subscribed to: {}", id, topics.join(", "));
        Ok(Some(session.state))
    }

    /// Remove `topics` from the connection's set. Unknown connections are ignored.
    pub fn unsubscribe(&self, id: ConnectionId, topics: &[String]) -> Result<Option<SessionState>> {
        let mut table = self.sessions.lock()?;
        let Some(session) = table.sessions.get_mut(&id) else {
            debug!("Unsubscribe for unknown connection {}", id);
            return Ok(None);
        };
        for topic in normalize(topics) {
            session.topics.remove(&topic);
        }
        session.refresh_state();
        info!("Connection {} unsubscribed from: {}", id, topics.join(", "));
        Ok(Some(session.state))
    }

    /// Drop the connection and its subscriptions. Returns `false` if it was already gone.
    pub fn on_disconnect(&self, id: ConnectionId) -> Result<bool> {
        let mut table = self.sessions.lock()?;
        let removed = table.sessions.remove(&id).is_some();
        if removed {
            info!(
                "Connection {} disconnected. Total connections: {}",
                id,
                table.sessions.len()
            );
            if table.sessions.is_empty() {
                debug!("No connections left; ticks keep running");
            }
        }
        Ok(removed)
    }

    /// Produce one snapshot and deliver it to every matching connection.
    pub fn tick(&self) -> TickReport {
        let snapshot = lock_or_recover(&self.generator, "generator").produce();
        let timestamp = Utc::now().timestamp_millis();

        let mut table = lock_or_recover(&self.sessions, "connection table");
        let mut report = TickReport::default();
        let mut dead = Vec::new();

        match self.mode {
            PushMode::Topics => {
                let updates = price_updates(&snapshot, timestamp);
                for (id, session) in &table.sessions {
                    for (symbol, msg) in &updates {
                        if !session.topics.contains(*symbol) {
                            continue;
                        }
                        if let Err(e) = session.push(*id, msg) {
                            debug!("{}", e);
                            dead.push(*id);
                            break;
                        }
                        report.delivered += 1;
                    }
                }
            }
            PushMode::Snapshot => {
                let msg: Outbound = Arc::new(ServerMessage::market_data(snapshot, timestamp));
                for (id, session) in &table.sessions {
                    match session.push(*id, &msg) {
                        Ok(()) => report.delivered += 1,
                        Err(e) => {
                            debug!("{}", e);
                            dead.push(*id);
                        }
                    }
                }
            }
        }

        for id in dead {
            if table.sessions.remove(&id).is_some() {
                warn!("Connection {} pruned: outbound queue closed", id);
                report.pruned += 1;
            }
        }
        debug!(
            "Tick delivered {} messages to {} connections ({} pruned)",
            report.delivered,
            table.sessions.len(),
            report.pruned
        );
        report
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> Result<usize> {
        Ok(self.sessions.lock()?.sessions.len())
    }

    /// Topics and state of a connection, if it is registered.
    pub fn session(&self, id: ConnectionId) -> Result<Option<(SessionState, Vec<String>)>> {
        let table = self.sessions.lock()?;
        Ok(table.sessions.get(&id).map(|s| {
            let mut topics: Vec<String> = s.topics.iter().cloned().collect();
            topics.sort();
            (s.state, topics)
        }))
    }
}

fn price_updates(snapshot: &Snapshot, timestamp: i64) -> Vec<(&str, Outbound)> {
    snapshot
        .all_quotes()
        .map(|quote| {
            (
                quote.symbol.as_str(),
                Arc::new(ServerMessage::price_update(quote.clone(), timestamp)),
            )
        })
        .collect()
}

/// Leave both broadcaster locks poisoned by panicking while holding them.
#[cfg(test)]
pub(crate) fn poison_locks(broadcaster: &Arc<Broadcaster>) {
    let held = Arc::clone(broadcaster);
    let _ = std::thread::spawn(move || {
        let _generator = held.generator.lock();
        let _table = held.sessions.lock();
        panic!("panic while holding the broadcaster locks");
    })
    .join();
}
