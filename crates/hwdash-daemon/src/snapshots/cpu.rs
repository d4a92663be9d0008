//! CPU snapshot.

use super::format::{plain, with_unit, NOT_AVAILABLE};
use super::{DeviceSnapshot, Metric, SnapshotError, Sources};
use hwdash_hw::{DeviceClass, Inventory, NameMatch, Selection, SensorKind, SensorProvider};
use serde::Serialize;
use tracing::{debug, warn};

/// The motherboard class is enabled too: on most boards the CPU fan headers
/// live on the Super I/O chip, not on the CPU.
const CLASSES: [DeviceClass; 2] = [DeviceClass::Cpu, DeviceClass::Motherboard];

const PACKAGE: &str = "CPU Package";
const TOTAL: &str = "CPU Total";
const BUS_SPEED: &str = "Bus Speed";
const MAX_FANS: usize = 2;

/// Static processor facts, resolved once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuInfo {
    pub name: String,
    /// Summed across all processor packages; -1 when unknown.
    pub physical_cores: i32,
    pub logical_cores: i32,
    /// Summed across all processor packages, in MHz; -1 when unknown.
    pub max_clock_speed: i32,
}

impl CpuInfo {
    pub fn resolve(inventory: &dyn Inventory) -> Self {
        let processors = inventory
            .processors()
            .map_err(|e| warn!("Processor inventory unavailable: {}", e))
            .ok();

        let name = match &processors {
            Some(list) => list
                .iter()
                .rev()
                .map(|p| p.name.trim())
                .find(|n| !n.is_empty())
                .unwrap_or("Unknown CPU")
                .to_string(),
            None => NOT_AVAILABLE.to_string(),
        };

        Self {
            name,
            physical_cores: processors
                .as_ref()
                .map_or(-1, |list| list.iter().map(|p| p.physical_cores as i32).sum()),
            logical_cores: inventory.logical_cores().map_or(-1, |n| n as i32),
            max_clock_speed: processors
                .as_ref()
                .map_or(-1, |list| list.iter().map(|p| p.max_clock_mhz as i32).sum()),
        }
    }
}

/// Live CPU values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuValues {
    pub temperature: String,
    pub power_usage: String,
    pub cpu_usage: String,
    pub fans: Vec<String>,
    pub clock_speeds: Vec<String>,
    pub total_clock_speed: String,
    pub core_load: f32,
}

impl Default for CpuValues {
    fn default() -> Self {
        Self {
            temperature: NOT_AVAILABLE.to_string(),
            power_usage: NOT_AVAILABLE.to_string(),
            cpu_usage: NOT_AVAILABLE.to_string(),
            fans: Vec::new(),
            clock_speeds: Vec::new(),
            total_clock_speed: ghz(None),
            core_load: 0.0,
        }
    }
}

fn ghz(mean_mhz: Option<f64>) -> String {
    format!("{:.2} GHz", mean_mhz.unwrap_or(0.0) / 1000.0)
}

pub struct CpuSnapshot {
    provider: SensorProvider,
    info: CpuInfo,
    values: CpuValues,
    ready: bool,
}

impl CpuSnapshot {
    /// Opens a provider, resolves the static facts and takes a first reading.
    pub fn open(sources: &Sources) -> hwdash_hw::Result<Self> {
        let mut snapshot = Self {
            provider: sources.open(&CLASSES)?,
            info: CpuInfo::resolve(sources.inventory()),
            values: CpuValues::default(),
            ready: false,
        };
        if let Err(e) = snapshot.refresh() {
            warn!("Initial CPU refresh failed: {}", e);
        }
        Ok(snapshot)
    }

    pub fn info(&self) -> &CpuInfo {
        &self.info
    }

    pub fn values(&self) -> &CpuValues {
        &self.values
    }

    fn read(&mut self) -> hwdash_hw::Result<CpuValues> {
        let package = NameMatch::Contains(PACKAGE);
        let temperature = self
            .provider
            .query(&Selection::new(DeviceClass::Cpu, SensorKind::Temperature).named(package))?;
        let power = self
            .provider
            .query(&Selection::new(DeviceClass::Cpu, SensorKind::Power).named(package))?;
        let usage = self.provider.query(
            &Selection::new(DeviceClass::Cpu, SensorKind::Load).named(NameMatch::Contains(TOTAL)),
        )?;

        let fans = self
            .provider
            .readings(&Selection::everywhere(SensorKind::Fan).by_name())?
            .into_iter()
            .take(MAX_FANS)
            .map(|r| match r.value {
                Some(v) => format!("{v:.2} {}", r.unit),
                None => format!("{NOT_AVAILABLE} {}", r.unit),
            })
            .collect();

        let clocks = Selection::new(DeviceClass::Cpu, SensorKind::Clock);
        let clock_speeds = self
            .provider
            .readings(&clocks)?
            .into_iter()
            .filter_map(|r| Some(format!("{}: {} {}", r.name, plain(r.value?), r.unit)))
            .collect();
        let core_clocks: Vec<f64> = self
            .provider
            .readings(&clocks.named(NameMatch::Except(BUS_SPEED)))?
            .into_iter()
            .filter_map(|r| r.value)
            .map(f64::from)
            .collect();
        let mean = (!core_clocks.is_empty())
            .then(|| core_clocks.iter().sum::<f64>() / core_clocks.len() as f64);

        Ok(CpuValues {
            temperature: with_unit(temperature, 1, "°C"),
            power_usage: with_unit(power, 1, "W"),
            cpu_usage: with_unit(usage, 1, "%"),
            fans,
            clock_speeds,
            total_clock_speed: ghz(mean),
            core_load: usage.unwrap_or(0.0),
        })
    }
}

impl DeviceSnapshot for CpuSnapshot {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn refresh(&mut self) -> Result<(), SnapshotError> {
        let values = self.read().map_err(SnapshotError::provider("cpu"))?;
        debug!(temperature = %values.temperature, clock = %values.total_clock_speed, "CPU refreshed");
        self.values = values;
        self.ready = true;
        Ok(())
    }

    fn current_values(&self) -> Vec<(Metric, String)> {
        let v = &self.values;
        vec![
            (Metric::CpuTemp, v.temperature.clone()),
            (Metric::CpuFanSpeed, v.fans.join("\n")),
            (Metric::CpuUsage, v.cpu_usage.clone()),
            (Metric::CpuPowerUsage, v.power_usage.clone()),
            (Metric::CpuClockSpeed, v.total_clock_speed.clone()),
            (Metric::CoresClockSpeed, v.clock_speeds.join("\n")),
        ]
    }

    fn is_ready(&self) -> bool {
        self.ready && self.provider.is_open()
    }

    fn close(&mut self) {
        self.provider.close();
    }
}
