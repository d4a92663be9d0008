//! Motherboard snapshot.
//!
//! Readings come from the Super I/O chips nested under the board node. The
//! first temperature and the first two fan channels are skipped; the fan
//! headers among them are reported by the CPU snapshot.

use super::format::{with_unit, NOT_AVAILABLE};
use super::{DeviceSnapshot, Metric, SnapshotError, Sources};
use hwdash_hw::{DeviceClass, Depth, Inventory, Selection, SensorKind, SensorProvider};
use serde::Serialize;
use tracing::{debug, warn};

const UNKNOWN: &str = "Unknown";
const SKIPPED_TEMPERATURES: usize = 1;
const SKIPPED_FANS: usize = 2;

/// Board and firmware identity, resolved once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardIdentity {
    pub name: String,
    pub manufacturer: String,
    pub bios_name: String,
    pub bios_manufacturer: String,
}

impl BoardIdentity {
    pub fn resolve(inventory: &dyn Inventory) -> Self {
        let known = |s: String| {
            if s.trim().is_empty() {
                UNKNOWN.to_string()
            } else {
                s
            }
        };

        let (name, manufacturer) = match inventory.board() {
            Ok(board) => (known(board.product), known(board.manufacturer)),
            Err(e) => {
                warn!("Board inventory unavailable: {}", e);
                (UNKNOWN.to_string(), UNKNOWN.to_string())
            }
        };
        let (bios_name, bios_manufacturer) = match inventory.bios() {
            Ok(bios) => (known(bios.version), known(bios.vendor)),
            Err(e) => {
                warn!("BIOS inventory unavailable: {}", e);
                (UNKNOWN.to_string(), UNKNOWN.to_string())
            }
        };

        Self {
            name,
            manufacturer,
            bios_name,
            bios_manufacturer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotherboardValues {
    pub temperature: String,
    pub fans: Vec<String>,
}

impl Default for MotherboardValues {
    fn default() -> Self {
        Self {
            temperature: NOT_AVAILABLE.to_string(),
            fans: Vec::new(),
        }
    }
}

pub struct MotherboardSnapshot {
    provider: SensorProvider,
    identity: BoardIdentity,
    values: MotherboardValues,
    ready: bool,
}

impl MotherboardSnapshot {
    pub fn open(sources: &Sources) -> hwdash_hw::Result<Self> {
        let mut snapshot = Self {
            provider: sources.open(&[DeviceClass::Motherboard])?,
            identity: BoardIdentity::resolve(sources.inventory()),
            values: MotherboardValues::default(),
            ready: false,
        };
        if let Err(e) = snapshot.refresh() {
            warn!("Initial motherboard refresh failed: {}", e);
        }
        Ok(snapshot)
    }

    pub fn identity(&self) -> &BoardIdentity {
        &self.identity
    }

    pub fn values(&self) -> &MotherboardValues {
        &self.values
    }

    fn read(&mut self) -> hwdash_hw::Result<MotherboardValues> {
        let select =
            |kind| Selection::new(DeviceClass::Motherboard, kind).depth(Depth::SubDevices);

        let temperature = self
            .provider
            .readings(&select(SensorKind::Temperature))?
            .into_iter()
            .nth(SKIPPED_TEMPERATURES)
            .map(|r| with_unit(r.value, 1, "°C"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        let fans = self
            .provider
            .readings(&select(SensorKind::Fan))?
            .into_iter()
            .skip(SKIPPED_FANS)
            .map(|r| with_unit(r.value, 0, "RPM"))
            .collect();

        Ok(MotherboardValues { temperature, fans })
    }
}

impl DeviceSnapshot for MotherboardSnapshot {
    fn name(&self) -> &'static str {
        "motherboard"
    }

    fn refresh(&mut self) -> Result<(), SnapshotError> {
        let values = self.read().map_err(SnapshotError::provider("motherboard"))?;
        debug!(temperature = %values.temperature, fans = values.fans.len(), "Motherboard refreshed");
        self.values = values;
        self.ready = true;
        Ok(())
    }

    fn current_values(&self) -> Vec<(Metric, String)> {
        vec![
            (Metric::MbTemp, self.values.temperature.clone()),
            (Metric::MbFanSpeed, self.values.fans.join("\n")),
        ]
    }

    fn is_ready(&self) -> bool {
        self.ready && self.provider.is_open()
    }

    fn close(&mut self) {
        self.provider.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshots::testing::sources;
    use hwdash_hw::{BiosInfo, BoardInfo, Hardware, HardwareType, Sensor, StaticInventory};
    use SensorKind::*;

    fn board(temperatures: &[f32]) -> Hardware {
        let mut sio = Hardware::new("/mb/nct", "NCT6798D", HardwareType::SuperIo);
        for (i, t) in temperatures.iter().enumerate() {
            sio = sio.with_sensor(Sensor::new(&format!("Temperature #{}", i + 1), Temperature, Some(*t)));
        }
        Hardware::new("/mb", "Board", HardwareType::Motherboard)
            // Own sensors of the board node are never reported.
            .with_sensor(Sensor::new("Board", Temperature, Some(99.0)))
            .with_sub_hardware(sio)
    }

    fn temperature_with(temperatures: &[f32]) -> String {
        let (sources, _) = sources(vec![board(temperatures)], StaticInventory::default());
        let snapshot = MotherboardSnapshot::open(&sources).unwrap();
        snapshot.values().temperature.clone()
    }

    #[test]
    fn test_temperature_reports_second_sensor() {
        assert_eq!(temperature_with(&[]), "N/A");
        assert_eq!(temperature_with(&[30.0]), "N/A");
        assert_eq!(temperature_with(&[30.0, 41.5]), "41.5 °C");
        assert_eq!(temperature_with(&[30.0, 41.5, 50.0]), "41.5 °C");
    }

    #[test]
    fn test_fans_skip_first_two() {
        let sio = Hardware::new("/mb/it", "IT8688E", HardwareType::SuperIo)
            .with_sensor(Sensor::new("Fan #1", Fan, Some(900.0)))
            .with_sensor(Sensor::new("Fan #2", Fan, Some(950.0)))
            .with_sensor(Sensor::new("Fan #3", Fan, Some(1210.4)))
            .with_sensor(Sensor::new("Fan #4", Fan, None));
        let tree = Hardware::new("/mb", "Board", HardwareType::Motherboard).with_sub_hardware(sio);
        let (sources, _) = sources(vec![tree], StaticInventory::default());
        let snapshot = MotherboardSnapshot::open(&sources).unwrap();
        assert_eq!(snapshot.values().fans, vec!["1210 RPM", "N/A"]);
    }

    #[test]
    fn test_no_board() {
        let (sources, _) = sources(Vec::new(), StaticInventory::default());
        let mut snapshot = MotherboardSnapshot::open(&sources).unwrap();
        snapshot.refresh().unwrap();
        assert_eq!(snapshot.values().temperature, "N/A");
        assert!(snapshot.values().fans.is_empty());
    }

    #[test]
    fn test_identity() {
        let inventory = StaticInventory {
            board: Some(BoardInfo {
                product: "PRIME Z370-A".to_string(),
                manufacturer: String::new(),
            }),
            bios: Some(BiosInfo {
                version: "2401".to_string(),
                vendor: "American Megatrends Inc.".to_string(),
            }),
            ..StaticInventory::default()
        };
        let identity = BoardIdentity::resolve(&inventory);
        assert_eq!(identity.name, "PRIME Z370-A");
        assert_eq!(identity.manufacturer, "Unknown");
        assert_eq!(identity.bios_name, "2401");

        let missing = BoardIdentity::resolve(&StaticInventory::default());
        assert_eq!(missing.name, "Unknown");
        assert_eq!(missing.bios_manufacturer, "Unknown");
    }

    #[test]
    fn test_fault_keeps_last_values() {
        let (sources, handle) = sources(vec![board(&[30.0, 41.5])], StaticInventory::default());
        let mut snapshot = MotherboardSnapshot::open(&sources).unwrap();
        handle.set_failing("/mb/nct", true);
        assert!(snapshot.refresh().is_err());
        assert_eq!(snapshot.values().temperature, "41.5 °C");
    }
}
