//! System inventory: static facts about the machine, queried once.
//!
//! Unlike the sensor provider, nothing here changes while the machine runs,
//! so snapshots resolve these values at construction and keep them.

pub mod smbios;
pub mod sysfs;

pub use sysfs::SysfsInventory;

use crate::{Error, Result};
use serde::Serialize;

/// One processor package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorInfo {
    pub name: String,
    pub physical_cores: u32,
    pub max_clock_mhz: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardInfo {
    pub product: String,
    pub manufacturer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BiosInfo {
    pub version: String,
    pub vendor: String,
}

/// A populated memory slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryModule {
    pub slot: String,
    pub manufacturer: String,
    pub part_number: String,
    pub capacity_bytes: u64,
    /// Configured speed in MT/s, 0 when unknown.
    pub configured_speed: u32,
}

/// Source of static machine facts.
pub trait Inventory: Send + Sync {
    fn processors(&self) -> Result<Vec<ProcessorInfo>>;
    fn logical_cores(&self) -> Result<u32>;
    fn board(&self) -> Result<BoardInfo>;
    fn bios(&self) -> Result<BiosInfo>;
    fn memory_modules(&self) -> Result<Vec<MemoryModule>>;
    /// Model names of physical disks, in enumeration order.
    fn disk_models(&self) -> Result<Vec<String>>;
    fn video_controllers(&self) -> Result<Vec<String>>;
}

/// Plain-data inventory for tests and demo mode.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    pub processors: Vec<ProcessorInfo>,
    pub logical_cores: u32,
    pub board: Option<BoardInfo>,
    pub bios: Option<BiosInfo>,
    pub memory_modules: Vec<MemoryModule>,
    pub disk_models: Vec<String>,
    pub video_controllers: Vec<String>,
    /// Makes every query fail.
    pub unavailable: bool,
}

impl StaticInventory {
    /// Inventory matching [`FixtureBackend::demo`](crate::backend::FixtureBackend::demo).
    pub fn demo() -> Self {
        const GIB: u64 = 1 << 30;
        let module = |slot: &str| MemoryModule {
            slot: slot.to_string(),
            manufacturer: "G.Skill".to_string(),
            part_number: "F4-3600C16-16GTZNC".to_string(),
            capacity_bytes: 16 * GIB,
            configured_speed: 3600,
        };

        Self {
            processors: vec![ProcessorInfo {
                name: "AMD Ryzen 7 5800X 8-Core Processor".to_string(),
                physical_cores: 8,
                max_clock_mhz: 4850,
            }],
            logical_cores: 16,
            board: Some(BoardInfo {
                product: "B550 AORUS ELITE".to_string(),
                manufacturer: "Gigabyte Technology Co., Ltd.".to_string(),
            }),
            bios: Some(BiosInfo {
                version: "F15".to_string(),
                vendor: "American Megatrends International, LLC.".to_string(),
            }),
            memory_modules: vec![module("DIMM_A2"), module("DIMM_B2")],
            disk_models: vec![
                "Samsung SSD 980 PRO 1TB".to_string(),
                "WDC WD40EFRX".to_string(),
            ],
            video_controllers: vec!["AMD Radeon RX 6800".to_string()],
            unavailable: false,
        }
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.unavailable {
            return Err(Error::Injected(format!("{what} inventory unavailable")));
        }
        Ok(())
    }
}

fn missing(what: &str) -> Error {
    Error::Parse {
        path: "inventory".to_string(),
        detail: format!("no {what} information"),
    }
}

impl Inventory for StaticInventory {
    fn processors(&self) -> Result<Vec<ProcessorInfo>> {
        self.check("processor")?;
        Ok(self.processors.clone())
    }

    fn logical_cores(&self) -> Result<u32> {
        self.check("processor")?;
        Ok(self.logical_cores)
    }

    fn board(&self) -> Result<BoardInfo> {
        self.check("board")?;
        self.board.clone().ok_or_else(|| missing("board"))
    }

    fn bios(&self) -> Result<BiosInfo> {
        self.check("bios")?;
        self.bios.clone().ok_or_else(|| missing("bios"))
    }

    fn memory_modules(&self) -> Result<Vec<MemoryModule>> {
        self.check("memory")?;
        Ok(self.memory_modules.clone())
    }

    fn disk_models(&self) -> Result<Vec<String>> {
        self.check("disk")?;
        Ok(self.disk_models.clone())
    }

    fn video_controllers(&self) -> Result<Vec<String>> {
        self.check("video")?;
        Ok(self.video_controllers.clone())
    }
}
