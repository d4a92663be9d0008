//! Error types for the hwdash hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the hardware.
#[derive(Error, Debug)]
pub enum Error {
    /// A sysfs/procfs file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// A sysfs/procfs file held something other than the expected value.
    #[error("failed to parse value from {path}: {detail}")]
    Parse { path: String, detail: String },

    /// The provider handle was used after `close()`.
    #[error("sensor provider is closed")]
    Closed,

    /// The backend has no channels registered for a hardware item.
    #[error("unknown hardware item: {0}")]
    UnknownHardware(String),

    /// A fault injected through a fixture handle.
    #[error("injected fault: {0}")]
    Injected(String),

    /// Malformed SMBIOS structure.
    #[error("invalid SMBIOS structure in {path}: {detail}")]
    Smbios { path: String, detail: String },
}
