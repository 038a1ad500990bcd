//! Periodic refresh loop.
//!
//! The driver waits on a crossbeam ticker and a stop channel. Each tick runs
//! the supplied closure to completion on the calling thread, so ticks never
//! overlap and the closure may hold `&mut` state for the whole run.

use std::ops::ControlFlow;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, tick, unbounded};

use crate::constants::{MAX_REFRESH_HZ, MIN_REFRESH_HZ};
use crate::error::{Result, TickgraphError};

/// Ends a running [`RefreshDriver`] from any thread.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        // The loop may already have exited
        let _ = self.tx.send(());
    }
}

pub struct RefreshDriver {
    interval: Duration,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    handles_issued: bool,
}

impl RefreshDriver {
    /// Driver ticking `refresh_hz` times per second.
    pub fn new(refresh_hz: f64) -> Result<Self> {
        if !(MIN_REFRESH_HZ..=MAX_REFRESH_HZ).contains(&refresh_hz) {
            return Err(TickgraphError::Config(format!(
                "Refresh rate must be within [{}, {}] Hz, got {}",
                MIN_REFRESH_HZ, MAX_REFRESH_HZ, refresh_hz
            )));
        }
        Ok(Self::with_interval(Duration::from_secs_f64(1.0 / refresh_hz)))
    }

    pub fn with_interval(interval: Duration) -> Self {
        let (stop_tx, stop_rx) = unbounded();
        Self {
            interval,
            stop_tx,
            stop_rx,
            handles_issued: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Once a handle has been issued, dropping every handle also stops the loop.
    pub fn stop_handle(&mut self) -> StopHandle {
        self.handles_issued = true;
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Run `on_tick` every interval until it breaks or a stop is requested.
    ///
    /// Returns the number of completed ticks.
    pub fn run<F>(self, mut on_tick: F) -> u64
    where
        F: FnMut() -> ControlFlow<()>,
    {
        let Self {
            interval,
            stop_tx,
            stop_rx,
            handles_issued,
        } = self;
        // Keep our own sender only when nobody else can stop us
        let _keepalive = if handles_issued {
            drop(stop_tx);
            None
        } else {
            Some(stop_tx)
        };

        log::debug!("Refresh driver started, interval {:?}", interval);
        let ticker = tick(interval);
        let mut ticks = 0;

        loop {
            select! {
                recv(stop_rx) -> _ => {
                    log::debug!("Refresh driver stopped after {} ticks", ticks);
                    break;
                }
                recv(ticker) -> _ => {
                    ticks += 1;
                    if on_tick().is_break() {
                        log::debug!("Refresh driver finished after {} ticks", ticks);
                        break;
                    }
                }
            }
        }

        ticks
    }
}
