use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::constants::ZOMBIE_GRACE;

/// What the heartbeat task asks the connection loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatSignal {
    /// Send opcode 1 with the current sequence.
    Beat,
    /// Two heartbeats went unacknowledged; close with 1001.
    Zombie,
}

/// Delay before the first heartbeat: `round(interval * factor)`, with
/// `factor` drawn from `[0, 1)`. Later beats use the full interval.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn first_heartbeat_delay(interval_ms: u64, factor: f64) -> Duration {
    let factor = factor.clamp(0.0, 1.0);
    Duration::from_millis((interval_ms as f64 * factor).round() as u64)
}

/// Runs the heartbeat timer for one socket. Aborted on drop, so a
/// reconnect never races a timer left over from the previous socket.
pub struct HeartbeatManager {
    interval: Duration,
    ack_received: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HeartbeatManager {
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            ack_received: Arc::new(AtomicBool::new(true)),
            handle: None,
        }
    }

    /// Marks the last heartbeat as acknowledged.
    pub fn acknowledge(&self) {
        self.ack_received.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_acknowledged(&self) -> bool {
        self.ack_received.load(Ordering::SeqCst)
    }

    /// Starts ticking with a random first delay.
    pub fn start(&mut self, signal_tx: mpsc::Sender<HeartbeatSignal>) {
        #[allow(clippy::cast_possible_truncation)]
        let first_delay = first_heartbeat_delay(self.interval.as_millis() as u64, rand::random());
        self.start_with_delay(first_delay, signal_tx);
    }

    pub fn start_with_delay(&mut self, first_delay: Duration, signal_tx: mpsc::Sender<HeartbeatSignal>) {
        self.stop();

        let interval = self.interval;
        let ack_received = self.ack_received.clone();
        ack_received.store(true, Ordering::SeqCst);

        debug!(
            interval_ms = interval.as_millis(),
            first_delay_ms = first_delay.as_millis(),
            "Starting heartbeat"
        );

        self.handle = Some(tokio::spawn(async move {
            sleep(first_delay).await;

            loop {
                if ack_received.swap(false, Ordering::SeqCst) {
                    if signal_tx.send(HeartbeatSignal::Beat).await.is_err() {
                        break;
                    }
                } else {
                    warn!("Heartbeat ACK not received, retrying once");
                    if signal_tx.send(HeartbeatSignal::Beat).await.is_err() {
                        break;
                    }

                    sleep(ZOMBIE_GRACE).await;

                    if !ack_received.load(Ordering::SeqCst) {
                        warn!("Heartbeat still unacknowledged, connection is a zombie");
                        let _ = signal_tx.send(HeartbeatSignal::Zombie).await;
                        break;
                    }
                }

                sleep(interval).await;
            }

            debug!("Heartbeat loop stopped");
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for HeartbeatManager {
    fn drop(&mut self) {
        self.stop();
    }
}
