//! Hardware access backends.
//!
//! A backend is the opaque OS layer behind [`SensorProvider`](crate::SensorProvider):
//! it discovers the hardware tree once and refreshes live sensor values on demand.

pub mod fixture;
pub mod sysfs;

pub use fixture::{FixtureBackend, FixtureHandle};
pub use sysfs::SysfsBackend;

use crate::{Hardware, Result};

/// Source of hardware items and their live sensor values.
pub trait Backend: Send {
    /// Discovers the hardware tree.
    fn enumerate(&mut self) -> Result<Vec<Hardware>>;

    /// Refreshes the sensor values of `hardware` itself (not its sub-hardware).
    fn update(&mut self, hardware: &mut Hardware) -> Result<()>;

    /// Releases any handles held by the backend.
    fn close(&mut self) {}
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn enumerate(&mut self) -> Result<Vec<Hardware>> {
        (**self).enumerate()
    }

    fn update(&mut self, hardware: &mut Hardware) -> Result<()> {
        (**self).update(hardware)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
