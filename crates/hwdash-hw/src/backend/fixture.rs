//! In-memory backend with scriptable values and fault injection.

use super::Backend;
use crate::{Error, Hardware, HardwareType, Result, Sensor, SensorKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct FixtureState {
    tree: Vec<Hardware>,
    fail_next: u32,
    failing: HashSet<String>,
    updates: usize,
    closed: bool,
    drift: bool,
}

/// Backend serving a fixed hardware tree.
///
/// Values can be changed and faults injected through a [`FixtureHandle`]
/// after the backend has been moved into a provider.
#[derive(Debug, Clone, Default)]
pub struct FixtureBackend {
    state: Arc<Mutex<FixtureState>>,
}

/// Control handle for a [`FixtureBackend`].
#[derive(Debug, Clone)]
pub struct FixtureHandle {
    state: Arc<Mutex<FixtureState>>,
}

fn lock(state: &Mutex<FixtureState>) -> MutexGuard<'_, FixtureState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FixtureBackend {
    /// Creates a backend serving `tree`.
    pub fn new(tree: Vec<Hardware>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FixtureState {
                tree,
                ..FixtureState::default()
            })),
        }
    }

    /// Returns a handle sharing this backend's state.
    pub fn handle(&self) -> FixtureHandle {
        FixtureHandle {
            state: self.state.clone(),
        }
    }

    /// A small desktop machine whose values drift slightly on every update.
    pub fn demo() -> Self {
        let backend = Self::new(demo_tree());
        lock(&backend.state).drift = true;
        backend
    }
}

impl Backend for FixtureBackend {
    fn enumerate(&mut self) -> Result<Vec<Hardware>> {
        let state = lock(&self.state);
        if state.closed {
            return Err(Error::Closed);
        }
        Ok(state.tree.clone())
    }

    fn update(&mut self, hardware: &mut Hardware) -> Result<()> {
        let mut state = lock(&self.state);
        state.updates += 1;

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(Error::Injected(format!("update of {}", hardware.identifier)));
        }
        if state.failing.contains(&hardware.identifier) {
            return Err(Error::Injected(format!("{} is failing", hardware.identifier)));
        }

        let drift = state.drift;
        let tick = state.updates;
        let source = state
            .tree
            .iter_mut()
            .find_map(|hw| hw.find_mut(&hardware.identifier))
            .ok_or_else(|| Error::UnknownHardware(hardware.identifier.clone()))?;

        hardware.sensors = source.sensors.clone();
        if drift {
            for (i, sensor) in hardware.sensors.iter_mut().enumerate() {
                if let Some(v) = sensor.value.as_mut() {
                    let phase = (tick + i) as f32 * 0.7;
                    *v *= 1.0 + 0.03 * phase.sin();
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.state).closed = true;
    }
}

impl FixtureHandle {
    /// Sets the value of the named sensor on the item `identifier`.
    ///
    /// Returns false if no such sensor exists.
    pub fn set_value(&self, identifier: &str, sensor: &str, value: Option<f32>) -> bool {
        let mut state = lock(&self.state);
        let Some(hw) = state.tree.iter_mut().find_map(|hw| hw.find_mut(identifier)) else {
            return false;
        };
        match hw.sensors.iter_mut().find(|s| s.name == sensor) {
            Some(s) => {
                s.value = value;
                true
            }
            None => false,
        }
    }

    /// Makes the next `n` update calls fail.
    pub fn fail_next(&self, n: u32) {
        lock(&self.state).fail_next = n;
    }

    /// Makes every update of `identifier` fail until cleared.
    pub fn set_failing(&self, identifier: &str, failing: bool) {
        let mut state = lock(&self.state);
        if failing {
            state.failing.insert(identifier.to_string());
        } else {
            state.failing.remove(identifier);
        }
    }

    /// Number of update calls seen so far.
    pub fn update_count(&self) -> usize {
        lock(&self.state).updates
    }

    /// Returns true once the backend has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}

fn demo_tree() -> Vec<Hardware> {
    use SensorKind::*;

    let mut cpu = Hardware::new("/cpu/0", "AMD Ryzen 7 5800X", HardwareType::Cpu)
        .with_sensor(Sensor::new("CPU Package", Temperature, Some(48.5)))
        .with_sensor(Sensor::new("CPU Package", Power, Some(42.3)))
        .with_sensor(Sensor::new("CPU Total", Load, Some(12.0)))
        .with_sensor(Sensor::new("Bus Speed", Clock, Some(100.0)));
    for core in 1..=8 {
        let name = format!("CPU Core #{core}");
        cpu = cpu
            .with_sensor(Sensor::new(&name, Clock, Some(3600.0 + core as f32 * 25.0)))
            .with_sensor(Sensor::new(&name, Load, Some(8.0 + core as f32)));
    }

    let gpu = Hardware::new("/gpu/0", "AMD Radeon RX 6800", HardwareType::GpuAmd)
        .with_sensor(Sensor::new("GPU Core", Temperature, Some(52.0)))
        .with_sensor(Sensor::new("GPU Core", Clock, Some(2105.0)))
        .with_sensor(Sensor::new("GPU Memory", Clock, Some(1000.0)))
        .with_sensor(Sensor::new("GPU Package", Power, Some(61.0)))
        .with_sensor(Sensor::new("GPU Core", Load, Some(17.0)))
        .with_sensor(Sensor::new("GPU Fan #1", Fan, Some(1120.0)));

    let board = Hardware::new("/motherboard", "B550 AORUS ELITE", HardwareType::Motherboard)
        .with_sub_hardware(
            Hardware::new("/motherboard/it8688", "ITE IT8688E", HardwareType::SuperIo)
                .with_sensor(Sensor::new("Temperature #1", Temperature, Some(27.0)))
                .with_sensor(Sensor::new("Temperature #2", Temperature, Some(38.0)))
                .with_sensor(Sensor::new("Temperature #3", Temperature, Some(44.0)))
                .with_sensor(Sensor::new("Fan #1", Fan, Some(980.0)))
                .with_sensor(Sensor::new("Fan #2", Fan, Some(0.0)))
                .with_sensor(Sensor::new("Fan #3", Fan, Some(1210.0)))
                .with_sensor(Sensor::new("Fan #4", Fan, Some(760.0))),
        );

    let nvme = Hardware::new("/storage/nvme0", "Samsung SSD 980 PRO 1TB", HardwareType::Storage)
        .with_sensor(Sensor::new("Composite", Temperature, Some(41.0)));
    let hdd = Hardware::new("/storage/sda", "WDC WD40EFRX", HardwareType::Storage)
        .with_sensor(Sensor::new("Temperature", Temperature, None));

    vec![cpu, gpu, board, nvme, hdd]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<Hardware> {
        vec![Hardware::new("/cpu/0", "CPU", HardwareType::Cpu).with_sensor(Sensor::new(
            "CPU Package",
            SensorKind::Temperature,
            Some(50.0),
        ))]
    }

    #[test]
    fn test_update_copies_scripted_values() {
        let mut backend = FixtureBackend::new(tree());
        let handle = backend.handle();
        let mut items = backend.enumerate().unwrap();

        assert!(handle.set_value("/cpu/0", "CPU Package", Some(61.5)));
        backend.update(&mut items[0]).unwrap();
        assert_eq!(items[0].sensors[0].value, Some(61.5));
        assert_eq!(handle.update_count(), 1);
    }

    #[test]
    fn test_fail_next_is_consumed() {
        let mut backend = FixtureBackend::new(tree());
        let handle = backend.handle();
        let mut items = backend.enumerate().unwrap();

        handle.fail_next(1);
        assert!(matches!(
            backend.update(&mut items[0]),
            Err(Error::Injected(_))
        ));
        assert!(backend.update(&mut items[0]).is_ok());
    }

    #[test]
    fn test_unknown_item() {
        let mut backend = FixtureBackend::new(tree());
        let mut stray = Hardware::new("/gpu/9", "ghost", HardwareType::GpuAmd);
        assert!(matches!(
            backend.update(&mut stray),
            Err(Error::UnknownHardware(_))
        ));
    }

    #[test]
    fn test_close_marks_handle() {
        let mut backend = FixtureBackend::new(tree());
        let handle = backend.handle();
        backend.close();
        assert!(handle.is_closed());
        assert!(backend.enumerate().is_err());
    }

    #[test]
    fn test_demo_tree_shape() {
        let mut backend = FixtureBackend::demo();
        let items = backend.enumerate().unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[2].sub_hardware.len(), 1);
    }
}
