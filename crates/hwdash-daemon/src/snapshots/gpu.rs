//! GPU snapshot. Only discrete NVIDIA and AMD adapters are reported.

use super::format::{plain, with_unit, NOT_AVAILABLE};
use super::{DeviceSnapshot, Metric, SnapshotError, Sources};
use hwdash_hw::{
    DeviceClass, HardwareFilter, HardwareType, NameMatch, Selection, SensorKind, SensorProvider,
};
use serde::Serialize;
use tracing::{debug, info, warn};

const DISCRETE: [HardwareType; 2] = [HardwareType::GpuNvidia, HardwareType::GpuAmd];
const CORE: &str = "GPU Core";
const MEMORY: &str = "GPU Memory";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuValues {
    pub temperature: String,
    pub core_clock_speed: f32,
    pub memory_clock_speed: f32,
    pub power_load: f32,
    pub core_load: f32,
    pub fans: Vec<String>,
}

impl Default for GpuValues {
    fn default() -> Self {
        Self {
            temperature: NOT_AVAILABLE.to_string(),
            core_clock_speed: 0.0,
            memory_clock_speed: 0.0,
            power_load: 0.0,
            core_load: 0.0,
            fans: Vec::new(),
        }
    }
}

pub struct GpuSnapshot {
    provider: SensorProvider,
    name: String,
    values: GpuValues,
    ready: bool,
}

impl GpuSnapshot {
    pub fn open(sources: &Sources) -> hwdash_hw::Result<Self> {
        let provider = sources.open(&[DeviceClass::Gpu])?;
        if provider.count(HardwareFilter::Types(&DISCRETE)) == 0 {
            info!("No discrete GPU found, GPU values will read N/A");
        }

        // Last adapter listed wins.
        let name = match sources.inventory().video_controllers() {
            Ok(list) => list
                .last()
                .filter(|n| !n.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| "Unknown GPU".to_string()),
            Err(e) => {
                warn!("Video controller inventory unavailable: {}", e);
                NOT_AVAILABLE.to_string()
            }
        };

        let mut snapshot = Self {
            provider,
            name,
            values: GpuValues::default(),
            ready: false,
        };
        if let Err(e) = snapshot.refresh() {
            warn!("Initial GPU refresh failed: {}", e);
        }
        Ok(snapshot)
    }

    pub fn device_name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &GpuValues {
        &self.values
    }

    fn read(&mut self) -> hwdash_hw::Result<GpuValues> {
        let select = |kind| Selection::types(&DISCRETE, kind);

        let temperature = self.provider.query(&select(SensorKind::Temperature))?;
        let core_clock = self
            .provider
            .query(&select(SensorKind::Clock).named(NameMatch::Contains(CORE)))?;
        let memory_clock = self
            .provider
            .query(&select(SensorKind::Clock).named(NameMatch::Contains(MEMORY)))?;
        let power = self.provider.query(&select(SensorKind::Power))?;
        let load = self
            .provider
            .query(&select(SensorKind::Load).named(NameMatch::Contains(CORE)))?;
        let fans = self
            .provider
            .readings(&select(SensorKind::Fan))?
            .into_iter()
            .map(|r| with_unit(r.value, 1, r.unit))
            .collect();

        Ok(GpuValues {
            temperature: with_unit(temperature, 1, "°C"),
            core_clock_speed: core_clock.unwrap_or(0.0),
            memory_clock_speed: memory_clock.unwrap_or(0.0),
            power_load: power.unwrap_or(0.0),
            core_load: load.unwrap_or(0.0),
            fans,
        })
    }
}

impl DeviceSnapshot for GpuSnapshot {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn refresh(&mut self) -> Result<(), SnapshotError> {
        let values = self.read().map_err(SnapshotError::provider("gpu"))?;
        debug!(temperature = %values.temperature, clock = values.core_clock_speed, "GPU refreshed");
        self.values = values;
        self.ready = true;
        Ok(())
    }

    fn current_values(&self) -> Vec<(Metric, String)> {
        let v = &self.values;
        vec![
            (Metric::GpuTemp, v.temperature.clone()),
            (Metric::GpuFanSpeed, v.fans.join("\n")),
            (Metric::GpuClockSpeed, format!("{} MHz", plain(v.core_clock_speed))),
            (
                Metric::GpuMemoryClockSpeed,
                format!("{} MHz", plain(v.memory_clock_speed)),
            ),
            (Metric::GpuLoad, format!("{}%", plain(v.core_load))),
            (Metric::GpuPowerLoad, format!("{} W", plain(v.power_load))),
        ]
    }

    fn is_ready(&self) -> bool {
        self.ready && self.provider.is_open()
    }

    fn close(&mut self) {
        self.provider.close();
    }
}
