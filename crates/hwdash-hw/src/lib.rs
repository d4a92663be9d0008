//! hwdash hardware library
//!
//! Provides typed access to hardware sensors (temperature, clock, load,
//! power, fan speed) over a pluggable backend, plus the static system
//! inventory (processors, board, BIOS, memory modules, disks, GPUs).

pub mod backend;
pub mod error;
pub mod hardware;
pub mod inventory;
pub mod provider;

pub use backend::{Backend, FixtureBackend, FixtureHandle, SysfsBackend};
pub use error::{Error, Result};
pub use hardware::{DeviceClass, Hardware, HardwareType, Sensor, SensorKind, SensorReading};
pub use inventory::{
    BiosInfo, BoardInfo, Inventory, MemoryModule, ProcessorInfo, StaticInventory, SysfsInventory,
};
pub use provider::{Depth, HardwareFilter, ItemReadings, NameMatch, Order, Selection, SensorProvider};
