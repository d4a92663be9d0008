//! Storage snapshot: one temperature per physical drive.

use super::format::{with_unit, NOT_AVAILABLE};
use super::{DeviceSnapshot, Metric, SnapshotError, Sources};
use hwdash_hw::{DeviceClass, Selection, SensorKind, SensorProvider};
use tracing::{debug, warn};

pub struct StorageSnapshot {
    provider: SensorProvider,
    names: Vec<String>,
    temperatures: Vec<String>,
    ready: bool,
}

impl StorageSnapshot {
    pub fn open(sources: &Sources) -> hwdash_hw::Result<Self> {
        let names = match sources.inventory().disk_models() {
            Ok(models) => models
                .into_iter()
                .map(|m| {
                    if m.trim().is_empty() {
                        "Unknown Storage".to_string()
                    } else {
                        m
                    }
                })
                .collect(),
            Err(e) => {
                warn!("Disk inventory unavailable: {}", e);
                Vec::new()
            }
        };

        let mut snapshot = Self {
            provider: sources.open(&[DeviceClass::Storage])?,
            names,
            temperatures: Vec::new(),
            ready: false,
        };
        if let Err(e) = snapshot.refresh() {
            warn!("Initial storage refresh failed: {}", e);
        }
        Ok(snapshot)
    }

    /// Disk model names, in inventory order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// One entry per storage device, "N/A" when it has no reading.
    pub fn temperatures(&self) -> &[String] {
        &self.temperatures
    }

    fn read(&mut self) -> hwdash_hw::Result<Vec<String>> {
        let items = self
            .provider
            .readings_per_item(&Selection::new(DeviceClass::Storage, SensorKind::Temperature))?;
        Ok(items
            .into_iter()
            .map(|item| {
                item.readings
                    .first()
                    .map(|r| with_unit(r.value, 1, "°C"))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string())
            })
            .collect())
    }
}

impl DeviceSnapshot for StorageSnapshot {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn refresh(&mut self) -> Result<(), SnapshotError> {
        let temperatures = self.read().map_err(SnapshotError::provider("storage"))?;
        debug!(devices = temperatures.len(), "Storage refreshed");
        self.temperatures = temperatures;
        self.ready = true;
        Ok(())
    }

    fn current_values(&self) -> Vec<(Metric, String)> {
        vec![(Metric::StorageTemp, self.temperatures.join("\n"))]
    }

    fn is_ready(&self) -> bool {
        self.ready && self.provider.is_open()
    }

    fn close(&mut self) {
        self.provider.close();
    }
}
