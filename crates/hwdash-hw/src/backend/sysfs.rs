//! Linux backend reading hwmon, cpufreq, powercap and `/proc/stat`.
//!
//! Layout of the resulting tree:
//! - one `Cpu` item (package/core temperatures, per-core clocks, loads, RAPL power)
//! - one item per GPU hwmon chip (`amdgpu`, `nouveau`, `nvidia`, `i915`, `xe`)
//! - a `Motherboard` item with every unclassified hwmon chip nested as `SuperIo`
//! - one `Storage` item per `nvme`/`drivetemp` chip
//! - one `Memory` item per DIMM temperature chip

use super::Backend;
use crate::{Error, Hardware, HardwareType, Result, Sensor, SensorKind};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Where a sensor's live value comes from.
#[derive(Debug, Clone)]
enum Source {
    /// Integer file divided by `scale`.
    File { path: PathBuf, scale: f32 },
    /// Busy share of a `/proc/stat` line (`cpu`, `cpu0`, ...).
    CpuLoad { line: String },
    /// Power derived from a RAPL energy counter in microjoules.
    Rapl { path: PathBuf },
}

#[derive(Debug, Clone)]
struct Channel {
    sensor: usize,
    source: Source,
}

/// Role of a hwmon chip, decided from its `name` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChipRole {
    Cpu,
    Gpu(HardwareType),
    Storage,
    Memory,
    Board,
}

fn classify_chip(name: &str) -> ChipRole {
    match name {
        "coretemp" | "k10temp" | "zenpower" | "cpu_thermal" => ChipRole::Cpu,
        "amdgpu" | "radeon" => ChipRole::Gpu(HardwareType::GpuAmd),
        "nouveau" | "nvidia" => ChipRole::Gpu(HardwareType::GpuNvidia),
        "i915" | "xe" => ChipRole::Gpu(HardwareType::GpuIntel),
        "nvme" | "drivetemp" => ChipRole::Storage,
        "jc42" | "spd5118" => ChipRole::Memory,
        _ => ChipRole::Board,
    }
}

/// Backend over the Linux sysfs/procfs interfaces.
pub struct SysfsBackend {
    root: PathBuf,
    channels: HashMap<String, Vec<Channel>>,
    last_stat: HashMap<String, (u64, u64)>,
    last_energy: HashMap<PathBuf, (u64, Instant)>,
}

impl SysfsBackend {
    /// Creates a backend reading the live system.
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Creates a backend rooted at `root` instead of `/`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            channels: HashMap::new(),
            last_stat: HashMap::new(),
            last_energy: HashMap::new(),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn register(&mut self, hardware: &mut Hardware, name: String, kind: SensorKind, source: Source) {
        let index = hardware.sensors.len();
        hardware.sensors.push(Sensor {
            name,
            kind,
            value: None,
        });
        self.channels
            .entry(hardware.identifier.clone())
            .or_default()
            .push(Channel {
                sensor: index,
                source,
            });
    }

    /// Lists hwmon chip directories in numeric order.
    fn hwmon_chips(&self) -> Vec<(PathBuf, String)> {
        let dir = self.path("sys/class/hwmon");
        let Ok(entries) = fs::read_dir(&dir) else {
            debug!("No hwmon class at {}", dir.display());
            return Vec::new();
        };

        let mut chips: Vec<(u32, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().to_string();
                let n = file_name.strip_prefix("hwmon")?.parse().ok()?;
                Some((n, entry.path()))
            })
            .collect();
        chips.sort_by_key(|(n, _)| *n);

        chips
            .into_iter()
            .filter_map(|(_, path)| {
                let name = read_trimmed(&path.join("name")).ok()?;
                Some((path, name))
            })
            .collect()
    }

    fn build_cpu(&mut self, chips: &[(PathBuf, String)]) -> Option<Hardware> {
        let cpuinfo = read_trimmed(&self.path("proc/cpuinfo")).ok();
        let cpu_chips: Vec<&PathBuf> = chips
            .iter()
            .filter(|(_, name)| classify_chip(name) == ChipRole::Cpu)
            .map(|(path, _)| path)
            .collect();
        if cpuinfo.is_none() && cpu_chips.is_empty() {
            return None;
        }

        let name = cpuinfo
            .as_deref()
            .and_then(|content| cpuinfo_field(content, "model name"))
            .unwrap_or_else(|| "CPU".to_string());
        let mut cpu = Hardware::new("/cpu/0", &name, HardwareType::Cpu);

        for chip in cpu_chips {
            for index in channel_indices(chip, "temp") {
                let label = read_trimmed(&chip.join(format!("temp{index}_label"))).ok();
                let sensor_name = cpu_temperature_name(label.as_deref(), index);
                let source = Source::File {
                    path: chip.join(format!("temp{index}_input")),
                    scale: 1000.0,
                };
                self.register(&mut cpu, sensor_name, SensorKind::Temperature, source);
            }
        }

        let rapl = self.path("sys/class/powercap/intel-rapl:0/energy_uj");
        if read_trimmed(&rapl).is_ok() {
            self.register(
                &mut cpu,
                "CPU Package".to_string(),
                SensorKind::Power,
                Source::Rapl { path: rapl },
            );
        }

        self.register(
            &mut cpu,
            "CPU Total".to_string(),
            SensorKind::Load,
            Source::CpuLoad {
                line: "cpu".to_string(),
            },
        );

        for core in self.cpu_ids() {
            let core_name = format!("CPU Core #{}", core + 1);
            let freq = self.path(&format!(
                "sys/devices/system/cpu/cpu{core}/cpufreq/scaling_cur_freq"
            ));
            if freq.exists() {
                self.register(
                    &mut cpu,
                    core_name.clone(),
                    SensorKind::Clock,
                    Source::File {
                        path: freq,
                        scale: 1000.0,
                    },
                );
            }
            self.register(
                &mut cpu,
                core_name,
                SensorKind::Load,
                Source::CpuLoad {
                    line: format!("cpu{core}"),
                },
            );
        }

        Some(cpu)
    }

    /// CPU ids listed in `/proc/stat`, in file order.
    fn cpu_ids(&self) -> Vec<u32> {
        let Ok(content) = read_trimmed(&self.path("proc/stat")) else {
            return Vec::new();
        };
        content
            .lines()
            .filter_map(|line| {
                let label = line.split_whitespace().next()?;
                label.strip_prefix("cpu")?.parse().ok()
            })
            .collect()
    }

    fn build_gpu(&mut self, chip: &Path, chip_name: &str, ty: HardwareType, n: usize) -> Hardware {
        let mut gpu = Hardware::new(&format!("/gpu/{n}"), chip_name, ty);

        for index in channel_indices(chip, "temp") {
            let label = read_trimmed(&chip.join(format!("temp{index}_label"))).ok();
            let sensor_name = match label.as_deref() {
                None | Some("edge") | Some("GPU") => "GPU Core".to_string(),
                Some("junction") => "GPU Hot Spot".to_string(),
                Some("mem") => "GPU Memory".to_string(),
                Some(other) => format!("GPU {other}"),
            };
            let source = Source::File {
                path: chip.join(format!("temp{index}_input")),
                scale: 1000.0,
            };
            self.register(&mut gpu, sensor_name, SensorKind::Temperature, source);
        }

        for index in channel_indices(chip, "freq") {
            let label = read_trimmed(&chip.join(format!("freq{index}_label"))).ok();
            let sensor_name = match label.as_deref() {
                Some("sclk") => "GPU Core".to_string(),
                Some("mclk") => "GPU Memory".to_string(),
                Some(other) => format!("GPU {other}"),
                None => format!("GPU Clock #{index}"),
            };
            let source = Source::File {
                path: chip.join(format!("freq{index}_input")),
                scale: 1_000_000.0,
            };
            self.register(&mut gpu, sensor_name, SensorKind::Clock, source);
        }

        if let Some(path) = power_input(chip, 1) {
            self.register(
                &mut gpu,
                "GPU Package".to_string(),
                SensorKind::Power,
                Source::File {
                    path,
                    scale: 1_000_000.0,
                },
            );
        }

        let busy = chip.join("device/gpu_busy_percent");
        if busy.exists() {
            self.register(
                &mut gpu,
                "GPU Core".to_string(),
                SensorKind::Load,
                Source::File {
                    path: busy,
                    scale: 1.0,
                },
            );
        }

        for index in channel_indices(chip, "fan") {
            let source = Source::File {
                path: chip.join(format!("fan{index}_input")),
                scale: 1.0,
            };
            self.register(&mut gpu, format!("GPU Fan #{index}"), SensorKind::Fan, source);
        }

        gpu
    }

    fn build_generic(&mut self, chip: &Path, mut hardware: Hardware, temp_prefix: &str) -> Hardware {
        for index in channel_indices(chip, "temp") {
            let label = read_trimmed(&chip.join(format!("temp{index}_label"))).ok();
            let sensor_name = label.unwrap_or_else(|| format!("{temp_prefix} #{index}"));
            let source = Source::File {
                path: chip.join(format!("temp{index}_input")),
                scale: 1000.0,
            };
            self.register(&mut hardware, sensor_name, SensorKind::Temperature, source);
        }
        for index in channel_indices(chip, "fan") {
            let label = read_trimmed(&chip.join(format!("fan{index}_label"))).ok();
            let sensor_name = label.unwrap_or_else(|| format!("Fan #{index}"));
            let source = Source::File {
                path: chip.join(format!("fan{index}_input")),
                scale: 1.0,
            };
            self.register(&mut hardware, sensor_name, SensorKind::Fan, source);
        }
        hardware
    }

    /// Reads `/proc/stat` into `line -> (idle, total)` jiffies.
    fn read_stat(&self) -> Result<HashMap<String, (u64, u64)>> {
        let content = read_trimmed(&self.path("proc/stat"))?;
        Ok(content
            .lines()
            .filter(|line| line.starts_with("cpu"))
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let label = parts.next()?.to_string();
                let fields: Vec<u64> = parts.filter_map(|s| s.parse().ok()).collect();
                if fields.len() < 4 {
                    return None;
                }
                // idle + iowait
                let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
                Some((label, (idle, fields.iter().sum())))
            })
            .collect())
    }

    fn cpu_load(&mut self, line: &str, stat: &HashMap<String, (u64, u64)>) -> Option<f32> {
        let &(idle, total) = stat.get(line)?;
        let previous = self.last_stat.insert(line.to_string(), (idle, total));
        let (last_idle, last_total) = previous?;

        let total_delta = total.saturating_sub(last_total);
        if total_delta == 0 {
            return None;
        }
        let idle_delta = idle.saturating_sub(last_idle);
        Some((100.0 * (1.0 - idle_delta as f64 / total_delta as f64)) as f32)
    }

    fn rapl_power(&mut self, path: &Path) -> Result<Option<f32>> {
        let Some(content) = read_channel(path)? else {
            return Ok(None);
        };
        let energy: u64 = match parse_number(path, &content) {
            Ok(energy) => energy,
            Err(e) => {
                debug!("{}", e);
                return Ok(None);
            }
        };
        let now = Instant::now();
        let previous = self.last_energy.insert(path.to_path_buf(), (energy, now));

        let Some((last_energy, last_time)) = previous else {
            return Ok(None);
        };
        let elapsed = now.duration_since(last_time).as_secs_f64();
        // The counter wraps at max_energy_range_uj; skip the sample when it does.
        if elapsed <= 0.0 || energy < last_energy {
            return Ok(None);
        }
        let joules = (energy - last_energy) as f64 / 1_000_000.0;
        Ok(Some((joules / elapsed) as f32))
    }
}

impl Default for SysfsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SysfsBackend {
    fn enumerate(&mut self) -> Result<Vec<Hardware>> {
        self.channels.clear();
        let chips = self.hwmon_chips();
        let mut items = Vec::new();

        if let Some(cpu) = self.build_cpu(&chips) {
            items.push(cpu);
        }

        let mut gpus = Vec::new();
        let mut storage = Vec::new();
        let mut memory = Vec::new();
        let mut controllers = Vec::new();

        for (path, name) in &chips {
            let chip_id = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match classify_chip(name) {
                ChipRole::Cpu => {}
                ChipRole::Gpu(ty) => {
                    let gpu = self.build_gpu(path, name, ty, gpus.len());
                    gpus.push(gpu);
                }
                ChipRole::Storage => {
                    let model = read_trimmed(&path.join("device/model"))
                        .unwrap_or_else(|_| name.clone());
                    let hw = Hardware::new(
                        &format!("/storage/{chip_id}"),
                        &model,
                        HardwareType::Storage,
                    );
                    storage.push(self.build_generic(path, hw, "Temperature"));
                }
                ChipRole::Memory => {
                    let hw = Hardware::new(&format!("/memory/{chip_id}"), name, HardwareType::Memory);
                    memory.push(self.build_generic(path, hw, "DIMM"));
                }
                ChipRole::Board => {
                    let hw = Hardware::new(
                        &format!("/motherboard/{chip_id}"),
                        name,
                        HardwareType::SuperIo,
                    );
                    controllers.push(self.build_generic(path, hw, "Temperature"));
                }
            }
        }

        items.extend(gpus);

        let board_name = read_trimmed(&self.path("sys/class/dmi/id/board_name")).ok();
        if board_name.is_some() || !controllers.is_empty() {
            let mut board = Hardware::new(
                "/motherboard",
                board_name.as_deref().unwrap_or("Motherboard"),
                HardwareType::Motherboard,
            );
            board.sub_hardware = controllers;
            items.push(board);
        }

        items.extend(storage);
        items.extend(memory);

        info!(
            "Enumerated {} hardware items from {}",
            items.len(),
            self.root.display()
        );
        Ok(items)
    }

    fn update(&mut self, hardware: &mut Hardware) -> Result<()> {
        // Container nodes such as the motherboard root carry no channels.
        if hardware.sensors.is_empty() {
            return Ok(());
        }
        let channels = self
            .channels
            .get(&hardware.identifier)
            .cloned()
            .ok_or_else(|| Error::UnknownHardware(hardware.identifier.clone()))?;

        let needs_stat = channels
            .iter()
            .any(|c| matches!(c.source, Source::CpuLoad { .. }));
        let stat = if needs_stat {
            self.read_stat().unwrap_or_else(|e| {
                debug!("{}", e);
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        for channel in channels {
            let value = match &channel.source {
                Source::File { path, scale } => match read_channel(path)? {
                    Some(content) => match parse_number::<f64>(path, &content) {
                        Ok(raw) => Some((raw / *scale as f64) as f32),
                        Err(e) => {
                            debug!("{}", e);
                            None
                        }
                    },
                    None => None,
                },
                Source::CpuLoad { line } => self.cpu_load(line, &stat),
                Source::Rapl { path } => self.rapl_power(path)?,
            };
            if let Some(sensor) = hardware.sensors.get_mut(channel.sensor) {
                sensor.value = value;
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.channels.clear();
        self.last_stat.clear();
        self.last_energy.clear();
    }
}

fn cpu_temperature_name(label: Option<&str>, index: u32) -> String {
    match label {
        Some(l) if l.starts_with("Package") || l == "Tctl" || l == "Tdie" => {
            "CPU Package".to_string()
        }
        Some(l) if l.starts_with("Core ") => match l[5..].trim().parse::<u32>() {
            Ok(n) => format!("CPU Core #{}", n + 1),
            Err(_) => format!("CPU {l}"),
        },
        Some(l) => format!("CPU {l}"),
        None => format!("CPU Temperature #{index}"),
    }
}

/// Returns the sorted channel numbers for files named `{prefix}{N}_input`.
fn channel_indices(chip: &Path, prefix: &str) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(chip) else {
        return Vec::new();
    };
    let mut indices: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_prefix(prefix)?
                .strip_suffix("_input")?
                .parse()
                .ok()
        })
        .collect();
    indices.sort_unstable();
    indices
}

fn power_input(chip: &Path, index: u32) -> Option<PathBuf> {
    ["average", "input"]
        .iter()
        .map(|suffix| chip.join(format!("power{index}_{suffix}")))
        .find(|path| path.exists())
}

pub(crate) fn cpuinfo_field(content: &str, field: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == field).then(|| value.trim().to_string())
    })
}

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_trimmed(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| Error::Read {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads one sensor channel.
///
/// An unreadable channel (ENODATA, a suspended device) reads as unsampled;
/// only a vanished chip directory is a fault.
fn read_channel(path: &Path) -> Result<Option<String>> {
    match read_trimmed(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if path.parent().map_or(false, Path::is_dir) => {
            debug!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn parse_number<T: std::str::FromStr>(path: &Path, content: &str) -> Result<T> {
    content.trim().parse::<T>().map_err(|_| Error::Parse {
        path: path.display().to_string(),
        detail: format!("expected a number, got '{content}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fake_system() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "proc/cpuinfo",
            "processor\t: 0\nmodel name\t: Intel(R) Core(TM) i5-8400\nphysical id\t: 0\n",
        );
        write(
            root,
            "proc/stat",
            "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 50 0 50 400 0 0 0 0 0 0\ncpu1 50 0 50 400 0 0 0 0 0 0\nintr 0\n",
        );
        write(root, "sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq", "2400000\n");
        write(root, "sys/devices/system/cpu/cpu1/cpufreq/scaling_cur_freq", "3000000\n");

        write(root, "sys/class/hwmon/hwmon0/name", "coretemp\n");
        write(root, "sys/class/hwmon/hwmon0/temp1_input", "45000\n");
        write(root, "sys/class/hwmon/hwmon0/temp1_label", "Package id 0\n");
        write(root, "sys/class/hwmon/hwmon0/temp2_input", "43000\n");
        write(root, "sys/class/hwmon/hwmon0/temp2_label", "Core 0\n");

        write(root, "sys/class/hwmon/hwmon1/name", "nct6798\n");
        write(root, "sys/class/hwmon/hwmon1/temp1_input", "30000\n");
        write(root, "sys/class/hwmon/hwmon1/fan1_input", "800\n");
        write(root, "sys/class/hwmon/hwmon1/fan2_input", "1200\n");

        write(root, "sys/class/hwmon/hwmon10/name", "nvme\n");
        write(root, "sys/class/hwmon/hwmon10/temp1_input", "38850\n");
        write(root, "sys/class/hwmon/hwmon10/temp1_label", "Composite\n");
        write(root, "sys/class/hwmon/hwmon10/device/model", "Samsung SSD 970 EVO\n");

        write(root, "sys/class/hwmon/hwmon2/name", "amdgpu\n");
        write(root, "sys/class/hwmon/hwmon2/temp1_input", "51000\n");
        write(root, "sys/class/hwmon/hwmon2/temp1_label", "edge\n");
        write(root, "sys/class/hwmon/hwmon2/freq1_input", "1850000000\n");
        write(root, "sys/class/hwmon/hwmon2/freq1_label", "sclk\n");
        write(root, "sys/class/hwmon/hwmon2/power1_average", "45000000\n");
        write(root, "sys/class/hwmon/hwmon2/device/gpu_busy_percent", "7\n");

        write(root, "sys/class/dmi/id/board_name", "PRIME Z370-A\n");
        dir
    }

    #[test]
    fn test_enumerate_tree_layout() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let items = backend.enumerate().unwrap();

        let types: Vec<HardwareType> = items.iter().map(|h| h.hardware_type).collect();
        assert_eq!(
            types,
            vec![
                HardwareType::Cpu,
                HardwareType::GpuAmd,
                HardwareType::Motherboard,
                HardwareType::Storage
            ]
        );
        assert_eq!(items[0].name, "Intel(R) Core(TM) i5-8400");
        assert_eq!(items[2].name, "PRIME Z370-A");
        assert_eq!(items[2].sub_hardware[0].hardware_type, HardwareType::SuperIo);
        assert_eq!(items[3].name, "Samsung SSD 970 EVO");
    }

    #[test]
    fn test_cpu_sensor_names() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let items = backend.enumerate().unwrap();
        let names: Vec<(&str, SensorKind)> = items[0]
            .sensors
            .iter()
            .map(|s| (s.name.as_str(), s.kind))
            .collect();

        assert!(names.contains(&("CPU Package", SensorKind::Temperature)));
        assert!(names.contains(&("CPU Core #1", SensorKind::Temperature)));
        assert!(names.contains(&("CPU Total", SensorKind::Load)));
        assert!(names.contains(&("CPU Core #2", SensorKind::Clock)));
    }

    #[test]
    fn test_update_reads_scaled_values() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let mut items = backend.enumerate().unwrap();

        backend.update(&mut items[1]).unwrap();
        let gpu = &items[1];
        let temp = gpu.sensors.iter().find(|s| s.kind == SensorKind::Temperature);
        assert_eq!(temp.unwrap().value, Some(51.0));
        let clock = gpu.sensors.iter().find(|s| s.kind == SensorKind::Clock);
        assert_eq!(clock.unwrap().value, Some(1850.0));
        let power = gpu.sensors.iter().find(|s| s.kind == SensorKind::Power);
        assert_eq!(power.unwrap().value, Some(45.0));

        let mut sub = items[2].sub_hardware[0].clone();
        backend.update(&mut sub).unwrap();
        assert_eq!(sub.sensors[1].name, "Fan #1");
        assert_eq!(sub.sensors[1].value, Some(800.0));
    }

    #[test]
    fn test_cpu_load_needs_two_samples() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let mut items = backend.enumerate().unwrap();

        backend.update(&mut items[0]).unwrap();
        let total = |hw: &Hardware| {
            hw.sensors
                .iter()
                .find(|s| s.name == "CPU Total")
                .and_then(|s| s.value)
        };
        assert_eq!(total(&items[0]), None);

        write(
            dir.path(),
            "proc/stat",
            "cpu  150 0 150 900 0 0 0 0 0 0\ncpu0 75 0 75 450 0 0 0 0 0 0\ncpu1 75 0 75 450 0 0 0 0 0 0\n",
        );
        backend.update(&mut items[0]).unwrap();
        // 100 busy of 200 total jiffies
        let load = total(&items[0]).unwrap();
        assert!((load - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_unreadable_channel_reads_as_unsampled() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let mut items = backend.enumerate().unwrap();

        // A directory in place of the file makes the read fail.
        let power = dir.path().join("sys/class/hwmon/hwmon2/power1_average");
        fs::remove_file(&power).unwrap();
        fs::create_dir(&power).unwrap();

        backend.update(&mut items[1]).unwrap();
        let gpu = &items[1];
        let value = |kind| gpu.sensors.iter().find(|s| s.kind == kind).and_then(|s| s.value);
        assert_eq!(value(SensorKind::Temperature), Some(51.0));
        assert_eq!(value(SensorKind::Power), None);
    }

    #[test]
    fn test_vanished_chip_is_a_fault() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let mut items = backend.enumerate().unwrap();
        fs::remove_dir_all(dir.path().join("sys/class/hwmon/hwmon10")).unwrap();
        assert!(matches!(
            backend.update(&mut items[3]),
            Err(Error::Read { .. })
        ));
    }

    #[test]
    fn test_garbage_value_reads_as_unsampled() {
        let dir = fake_system();
        let mut backend = SysfsBackend::with_root(dir.path());
        let mut items = backend.enumerate().unwrap();
        write(dir.path(), "sys/class/hwmon/hwmon10/temp1_input", "N/A\n");
        backend.update(&mut items[3]).unwrap();
        assert_eq!(items[3].sensors[0].value, None);
    }

    #[test]
    fn test_empty_root() {
        let dir = TempDir::new().unwrap();
        let mut backend = SysfsBackend::with_root(dir.path());
        assert!(backend.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_cpu_temperature_name() {
        assert_eq!(cpu_temperature_name(Some("Tctl"), 1), "CPU Package");
        assert_eq!(cpu_temperature_name(Some("Core 3"), 4), "CPU Core #4");
        assert_eq!(cpu_temperature_name(Some("Tccd1"), 3), "CPU Tccd1");
        assert_eq!(cpu_temperature_name(None, 2), "CPU Temperature #2");
    }
}
