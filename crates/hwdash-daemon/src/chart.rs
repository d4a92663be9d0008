//! Chart pollers.
//!
//! Each poller owns its own snapshot and rolling window and runs on its own
//! timer, independent of the aggregator.

use anyhow::{bail, Result};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::snapshots::format::leading_number;
use crate::snapshots::{CpuSnapshot, DeviceSnapshot, GpuSnapshot, Metric, Sources};
use crate::window::{Point, RollingWindow};

/// Consecutive refresh failures after which a poller stops.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// A built-in chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartSeries {
    CpuClock,
    CpuTemperature,
    GpuTemperature,
    GpuClock,
}

impl ChartSeries {
    pub fn name(&self) -> &'static str {
        match self {
            ChartSeries::CpuClock => "cpu-clock",
            ChartSeries::CpuTemperature => "cpu-temperature",
            ChartSeries::GpuTemperature => "gpu-temperature",
            ChartSeries::GpuClock => "gpu-clock",
        }
    }

    /// Axis unit of the plotted value.
    pub fn unit(&self) -> &'static str {
        match self {
            ChartSeries::CpuClock => "GHz",
            ChartSeries::CpuTemperature | ChartSeries::GpuTemperature => "°C",
            ChartSeries::GpuClock => "MHz",
        }
    }

    /// Formatted field the plotted value is parsed from.
    pub fn metric(&self) -> Metric {
        match self {
            ChartSeries::CpuClock => Metric::CpuClockSpeed,
            ChartSeries::CpuTemperature => Metric::CpuTemp,
            ChartSeries::GpuTemperature => Metric::GpuTemp,
            ChartSeries::GpuClock => Metric::GpuClockSpeed,
        }
    }

    /// Opens a snapshot private to this series.
    pub fn open_snapshot(&self, sources: &Sources) -> hwdash_hw::Result<Box<dyn DeviceSnapshot>> {
        Ok(match self {
            ChartSeries::CpuClock | ChartSeries::CpuTemperature => {
                Box::new(CpuSnapshot::open(sources)?)
            }
            ChartSeries::GpuTemperature | ChartSeries::GpuClock => {
                Box::new(GpuSnapshot::open(sources)?)
            }
        })
    }
}

impl FromStr for ChartSeries {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu-clock" => Ok(ChartSeries::CpuClock),
            "cpu-temperature" | "cpu-temp" => Ok(ChartSeries::CpuTemperature),
            "gpu-temperature" | "gpu-temp" => Ok(ChartSeries::GpuTemperature),
            "gpu-clock" => Ok(ChartSeries::GpuClock),
            _ => bail!("unknown chart series '{s}'"),
        }
    }
}

impl std::fmt::Display for ChartSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Published view of a poller's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartWindow {
    pub series: ChartSeries,
    pub unit: &'static str,
    pub capacity: usize,
    pub points: Vec<Point>,
    /// Set once the poller gave up after repeated failures.
    pub stopped: bool,
}

/// Result of a single poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Sampled(f64),
    /// The field was "N/A" or otherwise unparsable.
    Skipped,
    Failed,
    /// The failure limit was reached.
    Stopped,
}

pub struct ChartPoller {
    series: ChartSeries,
    snapshot: Box<dyn DeviceSnapshot>,
    window: RollingWindow,
    next_index: u64,
    consecutive_failures: u32,
    publish: watch::Sender<ChartWindow>,
}

impl ChartPoller {
    pub fn new(
        series: ChartSeries,
        snapshot: Box<dyn DeviceSnapshot>,
        capacity: usize,
    ) -> (Self, watch::Receiver<ChartWindow>) {
        let window = RollingWindow::new(capacity);
        let (publish, rx) = watch::channel(ChartWindow {
            series,
            unit: series.unit(),
            capacity: window.capacity(),
            points: Vec::new(),
            stopped: false,
        });
        let poller = Self {
            series,
            snapshot,
            window,
            next_index: 0,
            consecutive_failures: 0,
            publish,
        };
        (poller, rx)
    }

    /// Refreshes the snapshot and appends the parsed value.
    ///
    /// The sample index advances on every poll, so skipped and failed polls
    /// leave gaps in the indices.
    pub fn poll(&mut self) -> PollOutcome {
        let index = self.next_index;
        self.next_index += 1;

        if let Err(e) = self.snapshot.refresh() {
            self.consecutive_failures += 1;
            warn!(
                series = %self.series,
                failures = self.consecutive_failures,
                "Chart refresh failed: {}", e
            );
            if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                return PollOutcome::Stopped;
            }
            return PollOutcome::Failed;
        }
        self.consecutive_failures = 0;

        let metric = self.series.metric();
        let value = self
            .snapshot
            .current_values()
            .into_iter()
            .find(|(m, _)| *m == metric)
            .and_then(|(_, formatted)| leading_number(&formatted));

        match value {
            Some(value) => {
                self.window.push(index, value);
                self.publish(false);
                PollOutcome::Sampled(value)
            }
            None => {
                debug!(series = %self.series, "No value to plot, skipping tick");
                PollOutcome::Skipped
            }
        }
    }

    fn publish(&self, stopped: bool) {
        let points = self.window.points();
        self.publish.send_modify(|view| {
            view.points = points;
            view.stopped = stopped;
        });
    }

    /// Polls every `period` until cancelled or stopped by repeated failures.
    pub async fn run(mut self, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(series = %self.series, period_ms = period.as_millis() as u64, "Chart poller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.poll() == PollOutcome::Stopped {
                warn!(
                    series = %self.series,
                    "Stopping chart after {} consecutive failures",
                    MAX_CONSECUTIVE_FAILURES
                );
                self.publish(true);
                break;
            }
        }

        self.snapshot.close();
    }
}
