//! Sensor provider: typed queries over a backend's hardware tree.
//!
//! Every query refreshes the hardware items it traverses before reading them,
//! so results are always live. Missing hardware or sensors are reported as
//! empty results, never as errors; only backend faults surface as `Err`.

use crate::backend::Backend;
use crate::{DeviceClass, Error, Hardware, HardwareType, Result, SensorKind, SensorReading};
use tracing::{debug, info};

/// Sensor name predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch<'a> {
    Any,
    /// Case-insensitive substring match.
    Contains(&'a str),
    /// Everything except this exact name.
    Except(&'a str),
}

impl NameMatch<'_> {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Any => true,
            NameMatch::Contains(needle) => name
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            NameMatch::Except(excluded) => name != *excluded,
        }
    }
}

/// Which top-level hardware items a selection visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareFilter<'a> {
    All,
    Class(DeviceClass),
    Types(&'a [HardwareType]),
}

impl HardwareFilter<'_> {
    fn accepts(&self, ty: HardwareType) -> bool {
        match self {
            HardwareFilter::All => true,
            HardwareFilter::Class(class) => class.matches(ty),
            HardwareFilter::Types(types) => types.contains(&ty),
        }
    }
}

/// How deep into a matched item's sub-hardware a selection reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// The item's own sensors only.
    Own,
    /// The item and all of its descendants, depth-first.
    Nested,
    /// Descendants only, skipping the item's own sensors.
    SubDevices,
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Traversal,
    /// Ascending by sensor name; ties keep traversal order.
    ByName,
}

/// A sensor query.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub hardware: HardwareFilter<'a>,
    pub kind: SensorKind,
    pub name: NameMatch<'a>,
    pub depth: Depth,
    pub order: Order,
}

impl<'a> Selection<'a> {
    /// Sensors of `kind` on the top-level items of `class`.
    pub fn new(class: DeviceClass, kind: SensorKind) -> Self {
        Self {
            hardware: HardwareFilter::Class(class),
            kind,
            name: NameMatch::Any,
            depth: Depth::Own,
            order: Order::Traversal,
        }
    }

    /// Sensors of `kind` anywhere in the tree.
    pub fn everywhere(kind: SensorKind) -> Self {
        Self {
            hardware: HardwareFilter::All,
            depth: Depth::Nested,
            ..Self::new(DeviceClass::Cpu, kind)
        }
    }

    /// Sensors of `kind` on top-level items of the given hardware types.
    pub fn types(types: &'a [HardwareType], kind: SensorKind) -> Self {
        Self {
            hardware: HardwareFilter::Types(types),
            ..Self::new(DeviceClass::Cpu, kind)
        }
    }

    pub fn named(mut self, name: NameMatch<'a>) -> Self {
        self.name = name;
        self
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn by_name(mut self) -> Self {
        self.order = Order::ByName;
        self
    }
}

/// Readings gathered from one top-level hardware item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReadings {
    pub name: String,
    pub readings: Vec<SensorReading>,
}

/// Owned handle over a hardware backend.
///
/// Opened explicitly with [`SensorProvider::open`] and released with
/// [`SensorProvider::close`]; dropping an open provider closes it.
pub struct SensorProvider {
    backend: Box<dyn Backend>,
    hardware: Vec<Hardware>,
    open: bool,
}

impl SensorProvider {
    /// Opens `backend` and keeps the top-level items of the enabled classes.
    pub fn open<B: Backend + 'static>(backend: B, classes: &[DeviceClass]) -> Result<Self> {
        let mut backend: Box<dyn Backend> = Box::new(backend);
        let hardware: Vec<Hardware> = backend
            .enumerate()?
            .into_iter()
            .filter(|hw| classes.contains(&hw.hardware_type.class()))
            .collect();

        debug!(
            "Sensor provider opened with {} items for {:?}",
            hardware.len(),
            classes
        );

        Ok(Self {
            backend,
            hardware,
            open: true,
        })
    }

    /// Returns true until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The hardware tree as of the last query.
    pub fn hardware(&self) -> &[Hardware] {
        &self.hardware
    }

    /// Number of top-level items accepted by `filter`.
    pub fn count(&self, filter: HardwareFilter<'_>) -> usize {
        self.hardware
            .iter()
            .filter(|hw| filter.accepts(hw.hardware_type))
            .count()
    }

    /// Returns every matching reading.
    pub fn readings(&mut self, selection: &Selection<'_>) -> Result<Vec<SensorReading>> {
        let mut out = Vec::new();
        for item in self.readings_per_item(selection)? {
            out.extend(item.readings);
        }
        if selection.order == Order::ByName {
            out.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(out)
    }

    /// Returns matching readings grouped by top-level item, in enumeration order.
    ///
    /// Every accepted item appears, even when it has no matching sensors.
    pub fn readings_per_item(&mut self, selection: &Selection<'_>) -> Result<Vec<ItemReadings>> {
        if !self.open {
            return Err(Error::Closed);
        }

        let backend = self.backend.as_mut();
        let mut items = Vec::new();
        for hw in self
            .hardware
            .iter_mut()
            .filter(|hw| selection.hardware.accepts(hw.hardware_type))
        {
            let mut readings = Vec::new();
            let include_own = selection.depth != Depth::SubDevices;
            let recurse = selection.depth != Depth::Own;
            collect(backend, hw, selection, include_own, recurse, &mut readings)?;
            if selection.order == Order::ByName {
                readings.sort_by(|a, b| a.name.cmp(&b.name));
            }
            items.push(ItemReadings {
                name: hw.name.clone(),
                readings,
            });
        }
        Ok(items)
    }

    /// Value of the first matching sensor.
    ///
    /// `Ok(None)` covers both a missing sensor and one not yet sampled.
    pub fn query(&mut self, selection: &Selection<'_>) -> Result<Option<f32>> {
        self.query_nth(selection, 0)
    }

    /// Value of the `n`-th (zero-based) matching sensor.
    pub fn query_nth(&mut self, selection: &Selection<'_>, n: usize) -> Result<Option<f32>> {
        Ok(self
            .readings(selection)?
            .into_iter()
            .nth(n)
            .and_then(|r| r.value))
    }

    /// Releases the backend. Further queries fail with [`Error::Closed`].
    pub fn close(&mut self) {
        if self.open {
            self.backend.close();
            self.hardware.clear();
            self.open = false;
            info!("Sensor provider closed");
        }
    }
}

impl Drop for SensorProvider {
    fn drop(&mut self) {
        self.close();
    }
}

fn collect(
    backend: &mut dyn Backend,
    hw: &mut Hardware,
    selection: &Selection<'_>,
    include_own: bool,
    recurse: bool,
    out: &mut Vec<SensorReading>,
) -> Result<()> {
    backend.update(hw)?;

    if include_own {
        out.extend(
            hw.sensors
                .iter()
                .filter(|s| s.kind == selection.kind && selection.name.matches(&s.name))
                .map(|s| SensorReading {
                    kind: s.kind,
                    name: s.name.clone(),
                    value: s.value,
                    unit: s.kind.unit(),
                }),
        );
    }

    if recurse {
        for sub in hw.sub_hardware.iter_mut() {
            collect(backend, sub, selection, true, true, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FixtureBackend, FixtureHandle};
    use crate::Sensor;
    use SensorKind::*;

    fn machine() -> Vec<Hardware> {
        vec![
            Hardware::new("/cpu/0", "CPU", HardwareType::Cpu)
                .with_sensor(Sensor::new("CPU Core #1", Temperature, Some(40.0)))
                .with_sensor(Sensor::new("CPU Package", Temperature, Some(50.0)))
                .with_sensor(Sensor::new("CPU Package", Power, None)),
            Hardware::new("/mb", "Board", HardwareType::Motherboard)
                .with_sensor(Sensor::new("Board Fan", Fan, Some(1.0)))
                .with_sub_hardware(
                    Hardware::new("/mb/sio", "SIO", HardwareType::SuperIo)
                        .with_sensor(Sensor::new("B-Fan", Fan, Some(10.0)))
                        .with_sensor(Sensor::new("A-Fan", Fan, Some(20.0))),
                ),
        ]
    }

    fn open(classes: &[DeviceClass]) -> (SensorProvider, FixtureHandle) {
        let backend = FixtureBackend::new(machine());
        let handle = backend.handle();
        (SensorProvider::open(backend, classes).unwrap(), handle)
    }

    #[test]
    fn test_open_filters_classes() {
        let (provider, _) = open(&[DeviceClass::Cpu]);
        assert_eq!(provider.hardware().len(), 1);
        assert_eq!(provider.count(HardwareFilter::Class(DeviceClass::Motherboard)), 0);
    }

    #[test]
    fn test_query_first_match_case_insensitive() {
        let (mut provider, _) = open(&[DeviceClass::Cpu]);
        let sel = Selection::new(DeviceClass::Cpu, Temperature).named(NameMatch::Contains("package"));
        assert_eq!(provider.query(&sel).unwrap(), Some(50.0));
    }

    #[test]
    fn test_unsampled_value_is_none() {
        let (mut provider, _) = open(&[DeviceClass::Cpu]);
        let sel = Selection::new(DeviceClass::Cpu, Power);
        assert_eq!(provider.query(&sel).unwrap(), None);
    }

    #[test]
    fn test_absent_class_is_not_an_error() {
        let (mut provider, _) = open(&[DeviceClass::Cpu]);
        let sel = Selection::new(DeviceClass::Gpu, Temperature);
        assert_eq!(provider.query(&sel).unwrap(), None);
        assert!(provider.readings(&sel).unwrap().is_empty());
    }

    #[test]
    fn test_depth_first_traversal_order() {
        let (mut provider, _) = open(&[DeviceClass::Cpu, DeviceClass::Motherboard]);
        let sel = Selection::everywhere(Fan);
        let names: Vec<String> = provider
            .readings(&sel)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Board Fan", "B-Fan", "A-Fan"]);
    }

    #[test]
    fn test_sub_devices_skip_own_sensors() {
        let (mut provider, _) = open(&[DeviceClass::Motherboard]);
        let sel = Selection::new(DeviceClass::Motherboard, Fan).depth(Depth::SubDevices);
        assert_eq!(provider.query_nth(&sel, 1).unwrap(), Some(20.0));
        assert_eq!(provider.query_nth(&sel, 2).unwrap(), None);
    }

    #[test]
    fn test_by_name_ordering() {
        let (mut provider, _) = open(&[DeviceClass::Motherboard]);
        let sel = Selection::new(DeviceClass::Motherboard, Fan)
            .depth(Depth::SubDevices)
            .by_name();
        let values: Vec<Option<f32>> = provider
            .readings(&sel)
            .unwrap()
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![Some(20.0), Some(10.0)]);
    }

    #[test]
    fn test_by_name_ordering_is_ordinal() {
        let backend = FixtureBackend::new(vec![Hardware::new(
            "/mb",
            "Board",
            HardwareType::Motherboard,
        )
        .with_sensor(Sensor::new("fan 2", Fan, Some(2.0)))
        .with_sensor(Sensor::new("Fan 10", Fan, Some(10.0)))
        .with_sensor(Sensor::new("Fan 9", Fan, Some(9.0)))]);
        let mut provider = SensorProvider::open(backend, &[DeviceClass::Motherboard]).unwrap();
        let sel = Selection::new(DeviceClass::Motherboard, Fan).by_name();
        let names: Vec<String> = provider
            .readings(&sel)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        // Byte order: uppercase first, digits compared one by one.
        assert_eq!(names, vec!["Fan 10", "Fan 9", "fan 2"]);
    }

    #[test]
    fn test_query_updates_traversed_items() {
        let (mut provider, handle) = open(&[DeviceClass::Cpu, DeviceClass::Motherboard]);
        handle.set_value("/cpu/0", "CPU Package", Some(77.0));
        let sel = Selection::new(DeviceClass::Cpu, Temperature).named(NameMatch::Contains("CPU Package"));
        assert_eq!(provider.query(&sel).unwrap(), Some(77.0));
        // Only the CPU item was traversed.
        assert_eq!(handle.update_count(), 1);

        provider.readings(&Selection::everywhere(Fan)).unwrap();
        assert_eq!(handle.update_count(), 4);
    }

    #[test]
    fn test_backend_fault_propagates() {
        let (mut provider, handle) = open(&[DeviceClass::Cpu]);
        handle.fail_next(1);
        let sel = Selection::new(DeviceClass::Cpu, Temperature);
        assert!(matches!(provider.query(&sel), Err(Error::Injected(_))));
        assert!(provider.query(&sel).is_ok());
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let (mut provider, handle) = open(&[DeviceClass::Cpu]);
        provider.close();
        provider.close();
        assert!(handle.is_closed());
        assert!(!provider.is_open());
        let sel = Selection::new(DeviceClass::Cpu, Temperature);
        assert!(matches!(provider.query(&sel), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_closes_backend() {
        let (provider, handle) = open(&[DeviceClass::Cpu]);
        drop(provider);
        assert!(handle.is_closed());
    }

    #[test]
    fn test_name_match() {
        assert!(NameMatch::Any.matches("x"));
        assert!(NameMatch::Contains("TOTAL").matches("CPU Total"));
        assert!(!NameMatch::Except("Bus Speed").matches("Bus Speed"));
        assert!(NameMatch::Except("Bus Speed").matches("CPU Core #1"));
    }
}
