//! Installed memory modules. Built once; memory layout does not change at runtime.

use hwdash_hw::{Inventory, MemoryModule};
use serde::Serialize;
use tracing::warn;

const GIB: f64 = (1u64 << 30) as f64;

/// One populated memory slot, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryModuleInfo {
    pub slot: String,
    pub manufacturer: String,
    pub part_number: String,
    /// Capacity in GiB, rounded to two decimals.
    pub capacity_gb: f64,
    /// Configured speed in MT/s.
    pub configured_speed: u32,
    pub capacity: String,
    pub speed: String,
}

impl From<MemoryModule> for MemoryModuleInfo {
    fn from(module: MemoryModule) -> Self {
        let or_unknown = |s: String, what: &str| {
            if s.trim().is_empty() {
                format!("Unknown {what}")
            } else {
                s
            }
        };
        let capacity_gb = round2(module.capacity_bytes as f64 / GIB);

        Self {
            slot: or_unknown(module.slot, "slot"),
            manufacturer: or_unknown(module.manufacturer, "manufacturer"),
            part_number: or_unknown(module.part_number, "part number"),
            capacity_gb,
            configured_speed: module.configured_speed,
            capacity: format!("{capacity_gb} GB"),
            speed: format!("{} MHz", module.configured_speed),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub modules: Vec<MemoryModuleInfo>,
    /// Sum of the rounded module capacities, e.g. "32 GB".
    pub total: String,
}

impl MemorySnapshot {
    /// Reads the module list. An inventory failure yields an empty list.
    pub fn load(inventory: &dyn Inventory) -> Self {
        let modules: Vec<MemoryModuleInfo> = match inventory.memory_modules() {
            Ok(modules) => modules.into_iter().map(MemoryModuleInfo::from).collect(),
            Err(e) => {
                warn!("Memory module inventory unavailable: {}", e);
                Vec::new()
            }
        };
        let total = round2(modules.iter().map(|m| m.capacity_gb).sum());

        Self {
            modules,
            total: format!("{total} GB"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwdash_hw::StaticInventory;

    fn module(slot: &str, bytes: u64) -> MemoryModule {
        MemoryModule {
            slot: slot.to_string(),
            manufacturer: "Kingston".to_string(),
            part_number: String::new(),
            capacity_bytes: bytes,
            configured_speed: 3200,
        }
    }

    #[test]
    fn test_modules_and_total() {
        let inventory = StaticInventory {
            memory_modules: vec![module("DIMM_A1", 16 << 30), module("DIMM_B1", 16 << 30)],
            ..StaticInventory::default()
        };
        let memory = MemorySnapshot::load(&inventory);
        assert_eq!(memory.modules.len(), 2);
        assert_eq!(memory.modules[0].capacity, "16 GB");
        assert_eq!(memory.modules[0].speed, "3200 MHz");
        assert_eq!(memory.modules[0].part_number, "Unknown part number");
        assert_eq!(memory.total, "32 GB");
    }

    #[test]
    fn test_fractional_capacity_rounds() {
        // 8000 MiB
        let inventory = StaticInventory {
            memory_modules: vec![module("DIMM0", 8000 << 20)],
            ..StaticInventory::default()
        };
        let memory = MemorySnapshot::load(&inventory);
        assert_eq!(memory.modules[0].capacity_gb, 7.81);
        assert_eq!(memory.total, "7.81 GB");
    }

    #[test]
    fn test_inventory_failure() {
        let inventory = StaticInventory {
            unavailable: true,
            ..StaticInventory::default()
        };
        let memory = MemorySnapshot::load(&inventory);
        assert!(memory.modules.is_empty());
        assert_eq!(memory.total, "0 GB");
    }
}
