//! Scheduled tick task.
//!
//! `TickerHandle::spawn` starts a dedicated thread that calls [`Broadcaster::tick`] on a
//! fixed interval. The handle owns the stop channel: calling [`TickerHandle::stop`] (or
//! dropping the handle) signals the thread and joins it, so the loop never outlives the
//! server. A tick never fails, so the loop only ends when it is stopped.

use crate::broadcast::Broadcaster;
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::{debug, error, info};
use market_common::Result;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Owned handle to the running tick loop.
pub struct TickerHandle {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl TickerHandle {
    /// Start ticking `broadcaster` every `interval`.
    pub fn spawn(broadcaster: Arc<Broadcaster>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name("market-ticker".into())
            .spawn(move || run(&broadcaster, interval, &stop_rx))?;
        info!("Tick loop started with an interval of {:?}", interval);
        Ok(Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    /// Signal the loop to stop and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("Tick loop panicked");
            } else {
                info!("Tick loop stopped");
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(broadcaster: &Broadcaster, interval: Duration, stop_rx: &Receiver<()>) {
    let ticks = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticks) -> _ => {
                let report = broadcaster.tick();
                debug!("Tick: {} delivered, {} pruned", report.delivered, report.pruned);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{PushMode, poison_locks};
    use crate::model::generator::{GeneratorConfig, MarketGenerator};
    use crossbeam_channel::unbounded;
    use market_common::wire::MessageKind;

    #[test]
    fn ticks_until_stopped() {
        let broadcaster = Arc::new(Broadcaster::new(
            MarketGenerator::with_seed(GeneratorConfig::default(), 2),
            PushMode::Topics,
        ));
        let (tx, rx) = unbounded();
        let id = broadcaster.on_connect(tx).unwrap();
        broadcaster.subscribe(id, &["TCS".to_string()]).unwrap();
        rx.recv().unwrap();

        let handle = TickerHandle::spawn(Arc::clone(&broadcaster), Duration::from_millis(10)).unwrap();
        for _ in 0..3 {
            let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(msg.kind, MessageKind::PriceUpdate);
            assert_eq!(msg.symbol(), Some("TCS"));
        }
        handle.stop();

        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn keeps_ticking_after_a_panicked_lock_holder() {
        let broadcaster = Arc::new(Broadcaster::new(
            MarketGenerator::with_seed(GeneratorConfig::default(), 6),
            PushMode::Topics,
        ));
        let (tx, rx) = unbounded();
        let id = broadcaster.on_connect(tx).unwrap();
        broadcaster.subscribe(id, &["INFY".to_string()]).unwrap();
        rx.recv().unwrap();
        poison_locks(&broadcaster);

        let handle = TickerHandle::spawn(Arc::clone(&broadcaster), Duration::from_millis(10)).unwrap();
        for _ in 0..2 {
            let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(msg.symbol(), Some("INFY"));
        }
        handle.stop();
        assert_eq!(broadcaster.connection_count().unwrap(), 1);
    }

    #[test]
    fn dropping_handle_stops_loop() {
        let broadcaster = Arc::new(Broadcaster::new(
            MarketGenerator::with_seed(GeneratorConfig::default(), 4),
            PushMode::Snapshot,
        ));
        let handle = TickerHandle::spawn(Arc::clone(&broadcaster), Duration::from_millis(5)).unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(handle);
        assert_eq!(Arc::strong_count(&broadcaster), 1);
    }
}
