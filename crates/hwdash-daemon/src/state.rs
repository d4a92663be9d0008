//! Application state shared with the web surface.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::aggregator::{Aggregator, LiveValues};
use crate::chart::{ChartSeries, ChartWindow};
use crate::snapshots::cpu::CpuInfo;
use crate::snapshots::motherboard::BoardIdentity;
use crate::snapshots::{
    CpuSnapshot, GpuSnapshot, Metric, MemorySnapshot, MotherboardSnapshot, StorageSnapshot,
};

/// Facts resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticInfo {
    pub cpu: CpuInfo,
    pub gpu: String,
    pub board: BoardIdentity,
    pub storage: Vec<String>,
}

impl StaticInfo {
    pub fn collect(
        cpu: &CpuSnapshot,
        gpu: &GpuSnapshot,
        board: &MotherboardSnapshot,
        storage: &StorageSnapshot,
    ) -> Self {
        Self {
            cpu: cpu.info().clone(),
            gpu: gpu.device_name().to_string(),
            board: board.identity().clone(),
            storage: storage.names().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub name: &'static str,
    pub ready: bool,
}

/// Read-only view over everything the background tasks fill in.
pub struct AppState {
    info: StaticInfo,
    memory: MemorySnapshot,
    live: LiveValues,
    aggregator: Arc<Aggregator>,
    charts: Vec<watch::Receiver<ChartWindow>>,
}

impl AppState {
    pub fn new(
        info: StaticInfo,
        memory: MemorySnapshot,
        live: LiveValues,
        aggregator: Arc<Aggregator>,
        charts: Vec<watch::Receiver<ChartWindow>>,
    ) -> Self {
        Self {
            info,
            memory,
            live,
            aggregator,
            charts,
        }
    }

    pub fn info(&self) -> &StaticInfo {
        &self.info
    }

    pub fn memory(&self) -> &MemorySnapshot {
        &self.memory
    }

    pub fn live(&self) -> BTreeMap<Metric, Option<String>> {
        self.live.all()
    }

    /// Readiness of each aggregated snapshot.
    pub fn devices(&self) -> Vec<DeviceStatus> {
        self.aggregator.read(|snapshots| {
            snapshots
                .iter()
                .map(|s| DeviceStatus {
                    name: s.name(),
                    ready: s.is_ready(),
                })
                .collect()
        })
    }

    pub fn charts(&self) -> Vec<ChartWindow> {
        self.charts.iter().map(|rx| rx.borrow().clone()).collect()
    }

    /// Current window of `series`, if a poller for it was configured.
    pub fn chart(&self, series: ChartSeries) -> Option<ChartWindow> {
        self.charts
            .iter()
            .find(|rx| rx.borrow().series == series)
            .map(|rx| rx.borrow().clone())
    }
}
