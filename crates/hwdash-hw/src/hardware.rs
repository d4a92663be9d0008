//! Hardware tree model shared by the provider and its backends.

use serde::Serialize;

/// Hardware category a snapshot monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Motherboard,
    Storage,
    Memory,
}

impl DeviceClass {
    /// Returns true if a hardware item of `ty` belongs to this class.
    pub fn matches(&self, ty: HardwareType) -> bool {
        ty.class() == *self
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Cpu => write!(f, "cpu"),
            DeviceClass::Gpu => write!(f, "gpu"),
            DeviceClass::Motherboard => write!(f, "motherboard"),
            DeviceClass::Storage => write!(f, "storage"),
            DeviceClass::Memory => write!(f, "memory"),
        }
    }
}

/// Concrete type of a node in the hardware tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HardwareType {
    Cpu,
    GpuNvidia,
    GpuAmd,
    GpuIntel,
    Motherboard,
    /// Fan/temperature controller chip, nested under the motherboard.
    SuperIo,
    Storage,
    Memory,
}

impl HardwareType {
    /// Device class this hardware type reports under.
    pub fn class(&self) -> DeviceClass {
        match self {
            HardwareType::Cpu => DeviceClass::Cpu,
            HardwareType::GpuNvidia | HardwareType::GpuAmd | HardwareType::GpuIntel => {
                DeviceClass::Gpu
            }
            HardwareType::Motherboard | HardwareType::SuperIo => DeviceClass::Motherboard,
            HardwareType::Storage => DeviceClass::Storage,
            HardwareType::Memory => DeviceClass::Memory,
        }
    }
}

/// Physical quantity a sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Clock,
    Load,
    Power,
    Fan,
}

impl SensorKind {
    /// Unit implied by the sensor kind.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Clock => "MHz",
            SensorKind::Load => "%",
            SensorKind::Power => "W",
            SensorKind::Fan => "RPM",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorKind::Temperature => write!(f, "temperature"),
            SensorKind::Clock => write!(f, "clock"),
            SensorKind::Load => write!(f, "load"),
            SensorKind::Power => write!(f, "power"),
            SensorKind::Fan => write!(f, "fan"),
        }
    }
}

/// A single sensor on a hardware item.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: String,
    pub kind: SensorKind,
    /// `None` until the backend has sampled it.
    pub value: Option<f32>,
}

impl Sensor {
    pub fn new(name: &str, kind: SensorKind, value: Option<f32>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value,
        }
    }
}

/// A node in the hardware tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Hardware {
    /// Stable backend key, e.g. `/hwmon/hwmon3`.
    pub identifier: String,
    pub name: String,
    pub hardware_type: HardwareType,
    pub sensors: Vec<Sensor>,
    pub sub_hardware: Vec<Hardware>,
}

impl Hardware {
    pub fn new(identifier: &str, name: &str, hardware_type: HardwareType) -> Self {
        Self {
            identifier: identifier.to_string(),
            name: name.to_string(),
            hardware_type,
            sensors: Vec::new(),
            sub_hardware: Vec::new(),
        }
    }

    /// Builder helper that appends a sensor.
    pub fn with_sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Builder helper that appends a nested hardware item.
    pub fn with_sub_hardware(mut self, hardware: Hardware) -> Self {
        self.sub_hardware.push(hardware);
        self
    }

    /// Finds a node by identifier, searching depth-first.
    pub fn find_mut(&mut self, identifier: &str) -> Option<&mut Hardware> {
        if self.identifier == identifier {
            return Some(self);
        }
        self.sub_hardware
            .iter_mut()
            .find_map(|sub| sub.find_mut(identifier))
    }
}

/// A sensor value read through the provider.
///
/// Produced fresh on every query; never cached by the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub name: String,
    pub value: Option<f32>,
    pub unit: &'static str,
}
