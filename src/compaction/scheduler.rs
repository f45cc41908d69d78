//! Background compaction
//!
//! A dedicated thread that compacts its target on a fixed interval, owned
//! by the collection's lifecycle: started explicitly, stopped and joined
//! on close or drop. `trigger` runs one compaction on the thread and waits
//! for the result, so tests can step it deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{Result, StoreError};

use super::CompactionStats;

/// Something the scheduler can compact
pub trait CompactionTarget: Send + Sync + 'static {
    /// Name for log lines
    fn name(&self) -> String;

    /// Run one compaction
    fn compact(&self) -> Result<CompactionStats>;
}

enum Signal {
    /// Compact now and send the result back
    Trigger(Sender<Result<CompactionStats>>),
    Shutdown,
}

/// Handle to a running background compaction thread
///
/// The thread shares ownership of its target until it exits; dropping
/// the handle signals it and joins it, so the target is released by the
/// time the drop returns.
pub struct CompactionScheduler {
    control: Sender<Signal>,
    handle: Option<JoinHandle<()>>,
    runs: Arc<AtomicU64>,
}

impl CompactionScheduler {
    /// Spawn the compaction thread
    pub fn start<T: CompactionTarget>(target: Arc<T>, interval: Duration) -> Result<Self> {
        let (control, signals) = channel::unbounded();
        let runs = Arc::new(AtomicU64::new(0));
        let thread_runs = Arc::clone(&runs);

        let handle = thread::Builder::new()
            .name("slotstore-compaction".to_string())
            .spawn(move || run_loop(target, interval, signals, thread_runs))?;

        tracing::info!(interval_ms = interval.as_millis() as u64, "Background compaction started");

        Ok(Self {
            control,
            handle: Some(handle),
            runs,
        })
    }

    /// Compact now on the background thread and wait for the result
    pub fn trigger(&self) -> Result<CompactionStats> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.control
            .send(Signal::Trigger(reply_tx))
            .map_err(|_| StoreError::Compaction("compaction thread has stopped".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| StoreError::Compaction("compaction thread has stopped".to_string()))?
    }

    /// Number of compactions run so far (interval + triggered)
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.control.send(Signal::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Compaction thread panicked");
            }
        }
        tracing::info!("Background compaction stopped");
    }
}

impl Drop for CompactionScheduler {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

fn run_loop<T: CompactionTarget>(
    target: Arc<T>,
    interval: Duration,
    signals: Receiver<Signal>,
    runs: Arc<AtomicU64>,
) {
    let ticker = channel::tick(interval);

    loop {
        channel::select! {
            recv(ticker) -> _ => {
                match run_once(&*target, &runs) {
                    // The collection closed underneath us; wait for shutdown
                    Err(StoreError::Closed) => {}
                    Err(e) => tracing::error!(error = %e, "Background compaction failed"),
                    Ok(_) => {}
                }
            }
            recv(signals) -> signal => match signal {
                Ok(Signal::Trigger(reply)) => {
                    let _ = reply.send(run_once(&*target, &runs));
                }
                Ok(Signal::Shutdown) | Err(_) => break,
            },
        }
    }
}

fn run_once<T: CompactionTarget>(target: &T, runs: &AtomicU64) -> Result<CompactionStats> {
    runs.fetch_add(1, Ordering::SeqCst);
    tracing::debug!(target = %target.name(), "Running compaction");
    target.compact()
}
