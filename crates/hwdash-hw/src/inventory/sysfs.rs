//! Inventory read from procfs, sysfs and the kernel's DMI exports.

use super::smbios::{self, MEMORY_DEVICE};
use super::{BiosInfo, BoardInfo, Inventory, MemoryModule, ProcessorInfo};
use crate::backend::sysfs::{cpuinfo_field, parse_number, read_trimmed};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Block device prefixes that are never physical disks.
const VIRTUAL_BLOCK: &[&str] = &["loop", "ram", "zram", "dm-", "md", "sr", "nbd"];

/// Inventory over the Linux pseudo-filesystems.
#[derive(Debug, Clone)]
pub struct SysfsInventory {
    root: PathBuf,
}

impl Default for SysfsInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsInventory {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Creates an inventory rooted at `root` instead of `/`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn dmi(&self, field: &str) -> Result<String> {
        read_trimmed(&self.path(&format!("sys/class/dmi/id/{field}")))
    }

    /// Reads a pair of DMI fields, each falling back to an empty string.
    ///
    /// Fails only when neither field is exported.
    fn dmi_pair(&self, first: &str, second: &str) -> Result<(String, String)> {
        match (self.dmi(first), self.dmi(second)) {
            (Err(e), Err(_)) => Err(e),
            (a, b) => {
                let or_empty = |field: &str, r: Result<String>| {
                    r.unwrap_or_else(|e| {
                        debug!("DMI {} unavailable: {}", field, e);
                        String::new()
                    })
                };
                Ok((or_empty(first, a), or_empty(second, b)))
            }
        }
    }

    fn cpuinfo(&self) -> Result<String> {
        read_trimmed(&self.path("proc/cpuinfo"))
    }

    fn max_clock_mhz(&self, cpu: u32, block: &str) -> u32 {
        let path = self.path(&format!(
            "sys/devices/system/cpu/cpu{cpu}/cpufreq/cpuinfo_max_freq"
        ));
        match read_trimmed(&path).and_then(|s| parse_number::<u64>(&path, &s)) {
            Ok(khz) => (khz / 1000) as u32,
            Err(_) => cpuinfo_field(block, "cpu MHz")
                .and_then(|mhz| mhz.parse::<f32>().ok())
                .map(|mhz| mhz.round() as u32)
                .unwrap_or(0),
        }
    }

    fn list_dir(&self, rel: &str) -> Result<Vec<String>> {
        let dir = self.path(rel);
        let entries = fs::read_dir(&dir).map_err(|e| Error::Read {
            path: dir.display().to_string(),
            source: e,
        })?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        Ok(names)
    }
}

impl Inventory for SysfsInventory {
    /// One entry per `physical id`, in ascending package order.
    fn processors(&self) -> Result<Vec<ProcessorInfo>> {
        let cpuinfo = self.cpuinfo()?;
        let mut packages: BTreeMap<u32, ProcessorInfo> = BTreeMap::new();

        for block in cpuinfo.split("\n\n").filter(|b| !b.trim().is_empty()) {
            let package = cpuinfo_field(block, "physical id")
                .and_then(|id| id.parse().ok())
                .unwrap_or(0);
            if packages.contains_key(&package) {
                continue;
            }
            let cpu = cpuinfo_field(block, "processor")
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            packages.insert(
                package,
                ProcessorInfo {
                    name: cpuinfo_field(block, "model name").unwrap_or_default(),
                    physical_cores: cpuinfo_field(block, "cpu cores")
                        .and_then(|n| n.parse().ok())
                        .unwrap_or(1),
                    max_clock_mhz: self.max_clock_mhz(cpu, block),
                },
            );
        }

        Ok(packages.into_values().collect())
    }

    fn logical_cores(&self) -> Result<u32> {
        let cpuinfo = self.cpuinfo()?;
        Ok(cpuinfo
            .lines()
            .filter(|line| line.split(':').next().map(str::trim) == Some("processor"))
            .count() as u32)
    }

    fn board(&self) -> Result<BoardInfo> {
        let (product, manufacturer) = self.dmi_pair("board_name", "board_vendor")?;
        Ok(BoardInfo {
            product,
            manufacturer,
        })
    }

    fn bios(&self) -> Result<BiosInfo> {
        let (version, vendor) = self.dmi_pair("bios_version", "bios_vendor")?;
        Ok(BiosInfo { version, vendor })
    }

    /// Populated slots from the SMBIOS type 17 entries, in handle order.
    ///
    /// Unreadable or malformed entries are skipped.
    fn memory_modules(&self) -> Result<Vec<MemoryModule>> {
        let prefix = format!("{MEMORY_DEVICE}-");
        let mut entries: Vec<(u32, String)> = self
            .list_dir("sys/firmware/dmi/entries")?
            .into_iter()
            .filter_map(|name| {
                let n = name.strip_prefix(&prefix)?.parse().ok()?;
                Some((n, name))
            })
            .collect();
        entries.sort_unstable();

        let mut modules = Vec::new();
        for (_, name) in entries {
            let path = self.path(&format!("sys/firmware/dmi/entries/{name}/raw"));
            let raw = match fs::read(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping memory device {}: {}", path.display(), e);
                    continue;
                }
            };
            match smbios::parse_memory_device(&path.display().to_string(), &raw) {
                Ok(Some(module)) => modules.push(module),
                Ok(None) => {}
                Err(e) => warn!("Skipping memory device: {}", e),
            }
        }
        debug!("Found {} populated memory slots", modules.len());
        Ok(modules)
    }

    fn disk_models(&self) -> Result<Vec<String>> {
        Ok(self
            .list_dir("sys/block")?
            .into_iter()
            .filter(|name| !VIRTUAL_BLOCK.iter().any(|p| name.starts_with(p)))
            .map(|name| {
                read_trimmed(&self.path(&format!("sys/block/{name}/device/model")))
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Display adapters under `/sys/class/drm`, named by PCI vendor and id.
    fn video_controllers(&self) -> Result<Vec<String>> {
        let mut controllers = Vec::new();
        for card in self.list_dir("sys/class/drm")? {
            let is_card = card
                .strip_prefix("card")
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
            if !is_card {
                continue;
            }
            let device = self.path(&format!("sys/class/drm/{card}/device"));
            let vendor = read_trimmed(&device.join("vendor")).unwrap_or_default();
            let id = read_trimmed(&device.join("device")).unwrap_or_default();
            let vendor_name = match vendor.as_str() {
                "0x10de" => "NVIDIA",
                "0x1002" => "AMD",
                "0x8086" => "Intel",
                _ => "Unknown",
            };
            controllers.push(format!(
                "{vendor_name} Graphics [{}:{}]",
                vendor.trim_start_matches("0x"),
                id.trim_start_matches("0x")
            ));
        }
        Ok(controllers)
    }
}
