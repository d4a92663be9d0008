//! Periodic aggregator: refreshes every device snapshot under one lock and
//! feeds the results into the debounced live values.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::debounce::{self, DebounceInput, DebounceOutput};
use crate::snapshots::{DeviceSnapshot, Metric};

/// Debounced outputs for every metric, readable from any task.
#[derive(Debug, Clone)]
pub struct LiveValues {
    outputs: HashMap<Metric, DebounceOutput<String>>,
}

impl LiveValues {
    /// Creates one debounce channel per metric.
    pub fn channels(
        period: Duration,
        cancel: &CancellationToken,
    ) -> (HashMap<Metric, DebounceInput<String>>, Self) {
        let mut inputs = HashMap::new();
        let mut outputs = HashMap::new();
        for metric in Metric::ALL {
            let (input, output) = debounce::channel(None, period, cancel.child_token());
            inputs.insert(metric, input);
            outputs.insert(metric, output);
        }
        (inputs, Self { outputs })
    }

    pub fn get(&self, metric: Metric) -> Option<String> {
        self.outputs.get(&metric).and_then(DebounceOutput::get)
    }

    /// Current value of every metric, `None` until first published.
    pub fn all(&self) -> BTreeMap<Metric, Option<String>> {
        Metric::ALL.iter().map(|&m| (m, self.get(m))).collect()
    }
}

/// Outcome of one aggregator tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub refreshed: usize,
    pub failed: Vec<&'static str>,
}

pub struct Aggregator {
    snapshots: Mutex<Vec<Box<dyn DeviceSnapshot>>>,
    inputs: HashMap<Metric, DebounceInput<String>>,
}

impl Aggregator {
    /// Snapshots are refreshed in the order given.
    pub fn new(
        snapshots: Vec<Box<dyn DeviceSnapshot>>,
        inputs: HashMap<Metric, DebounceInput<String>>,
    ) -> Self {
        Self {
            snapshots: Mutex::new(snapshots),
            inputs,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn DeviceSnapshot>>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refreshes all snapshots, then pushes their values into the debounce inputs.
    ///
    /// A failed snapshot keeps its last-known values, which are pushed as well.
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let values: Vec<(Metric, String)> = {
            let mut snapshots = self.lock();
            for snapshot in snapshots.iter_mut() {
                match snapshot.refresh() {
                    Ok(()) => report.refreshed += 1,
                    Err(e) => {
                        warn!(device = snapshot.name(), error = %e, "Snapshot refresh failed");
                        report.failed.push(snapshot.name());
                    }
                }
            }
            snapshots.iter().flat_map(|s| s.current_values()).collect()
        };

        for (metric, value) in values {
            if let Some(input) = self.inputs.get(&metric) {
                input.set(value);
            }
        }
        report
    }

    /// Runs `f` against the snapshots without racing a refresh.
    pub fn read<R>(&self, f: impl FnOnce(&[Box<dyn DeviceSnapshot>]) -> R) -> R {
        let snapshots = self.lock();
        f(&snapshots)
    }

    /// Releases every snapshot's provider.
    pub fn close(&self) {
        for snapshot in self.lock().iter_mut() {
            snapshot.close();
        }
        info!("Aggregator closed all snapshots");
    }

    /// Ticks every `period` until cancelled, then closes the snapshots.
    ///
    /// Refreshes run on the blocking pool since backends read sysfs.
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let aggregator = self.clone();
            let report = match tokio::task::spawn_blocking(move || aggregator.tick()).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Aggregator tick aborted: {}", e);
                    consecutive_failures += 1;
                    continue;
                }
            };
            if report.failed.is_empty() {
                if consecutive_failures > 0 {
                    info!("All snapshots refreshed again after {} degraded ticks", consecutive_failures);
                }
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
                debug!(
                    refreshed = report.refreshed,
                    failed = ?report.failed,
                    consecutive_failures,
                    "Degraded aggregator tick"
                );
            }
        }

        self.close();
    }
}
