//! Device snapshots.
//!
//! Each snapshot owns its own [`SensorProvider`] and turns raw readings into
//! the formatted strings the dashboard displays. A refresh computes a complete
//! new value set and only commits it when every query succeeded, so a faulty
//! tick leaves the previous values in place.

pub mod cpu;
pub mod format;
pub mod gpu;
pub mod memory;
pub mod motherboard;
pub mod storage;

pub use cpu::CpuSnapshot;
pub use gpu::GpuSnapshot;
pub use memory::MemorySnapshot;
pub use motherboard::MotherboardSnapshot;
pub use storage::StorageSnapshot;

use hwdash_hw::{Backend, DeviceClass, Inventory, SensorProvider};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// A debounced live field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuTemp,
    CpuFanSpeed,
    CpuUsage,
    CpuPowerUsage,
    CpuClockSpeed,
    CoresClockSpeed,
    GpuTemp,
    GpuFanSpeed,
    GpuClockSpeed,
    GpuMemoryClockSpeed,
    GpuLoad,
    GpuPowerLoad,
    MbTemp,
    MbFanSpeed,
    StorageTemp,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::CpuTemp,
        Metric::CpuFanSpeed,
        Metric::CpuUsage,
        Metric::CpuPowerUsage,
        Metric::CpuClockSpeed,
        Metric::CoresClockSpeed,
        Metric::GpuTemp,
        Metric::GpuFanSpeed,
        Metric::GpuClockSpeed,
        Metric::GpuMemoryClockSpeed,
        Metric::GpuLoad,
        Metric::GpuPowerLoad,
        Metric::MbTemp,
        Metric::MbFanSpeed,
        Metric::StorageTemp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::CpuTemp => "cpu_temp",
            Metric::CpuFanSpeed => "cpu_fan_speed",
            Metric::CpuUsage => "cpu_usage",
            Metric::CpuPowerUsage => "cpu_power_usage",
            Metric::CpuClockSpeed => "cpu_clock_speed",
            Metric::CoresClockSpeed => "cores_clock_speed",
            Metric::GpuTemp => "gpu_temp",
            Metric::GpuFanSpeed => "gpu_fan_speed",
            Metric::GpuClockSpeed => "gpu_clock_speed",
            Metric::GpuMemoryClockSpeed => "gpu_memory_clock_speed",
            Metric::GpuLoad => "gpu_load",
            Metric::GpuPowerLoad => "gpu_power_load",
            Metric::MbTemp => "mb_temp",
            Metric::MbFanSpeed => "mb_fan_speed",
            Metric::StorageTemp => "storage_temp",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot refresh failed; the previous values were kept.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("{device} sensor query failed: {source}")]
    Provider {
        device: &'static str,
        #[source]
        source: hwdash_hw::Error,
    },
}

impl SnapshotError {
    pub(crate) fn provider(device: &'static str) -> impl FnOnce(hwdash_hw::Error) -> Self {
        move |source| SnapshotError::Provider { device, source }
    }
}

/// A per-device-class view over the sensor provider.
pub trait DeviceSnapshot: Send {
    /// Device label used in logs, e.g. "cpu".
    fn name(&self) -> &'static str;

    /// Re-queries the provider and replaces the current values.
    fn refresh(&mut self) -> Result<(), SnapshotError>;

    /// Formatted live values keyed by metric.
    fn current_values(&self) -> Vec<(Metric, String)>;

    /// True once a refresh has succeeded and the provider is still open.
    fn is_ready(&self) -> bool;

    /// Releases the provider handle.
    fn close(&mut self);
}

type BackendFactory = dyn Fn() -> Box<dyn Backend> + Send + Sync;

/// Everything a snapshot needs to open its provider and resolve static facts.
///
/// Each snapshot opens its own provider so that chart pollers never share
/// sensor state with the aggregator.
#[derive(Clone)]
pub struct Sources {
    backend: Arc<BackendFactory>,
    inventory: Arc<dyn Inventory>,
}

impl Sources {
    pub fn new<F>(backend: F, inventory: Arc<dyn Inventory>) -> Self
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        Self {
            backend: Arc::new(backend),
            inventory,
        }
    }

    /// Opens a fresh provider over the given classes.
    pub fn open(&self, classes: &[DeviceClass]) -> hwdash_hw::Result<SensorProvider> {
        SensorProvider::open((self.backend)(), classes)
    }

    pub fn inventory(&self) -> &dyn Inventory {
        self.inventory.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use hwdash_hw::{FixtureBackend, FixtureHandle, Hardware, StaticInventory};

    /// Sources over a shared fixture tree.
    pub(crate) fn sources(tree: Vec<Hardware>, inventory: StaticInventory) -> (Sources, FixtureHandle) {
        let backend = FixtureBackend::new(tree);
        let handle = backend.handle();
        let sources = Sources::new(
            move || Box::new(backend.clone()) as Box<dyn Backend>,
            Arc::new(inventory),
        );
        (sources, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique() {
        let mut names: Vec<&str> = Metric::ALL.iter().map(Metric::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Metric::ALL.len());
    }

    #[test]
    fn test_metric_serializes_as_name() {
        let json = serde_json::to_string(&Metric::GpuMemoryClockSpeed).unwrap();
        assert_eq!(json, "\"gpu_memory_clock_speed\"");
    }
}
