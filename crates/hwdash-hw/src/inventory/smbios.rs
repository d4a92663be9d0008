//! SMBIOS type 17 (Memory Device) parser.
//!
//! Input is one raw structure as exposed under
//! `/sys/firmware/dmi/entries/17-N/raw`: the formatted area followed by the
//! string set, terminated by a double NUL.

use super::MemoryModule;
use crate::{Error, Result};

pub const MEMORY_DEVICE: u8 = 17;

const SIZE: usize = 0x0C;
const DEVICE_LOCATOR: usize = 0x10;
const SPEED: usize = 0x15;
const MANUFACTURER: usize = 0x17;
const PART_NUMBER: usize = 0x1A;
const EXTENDED_SIZE: usize = 0x1C;
const CONFIGURED_SPEED: usize = 0x20;

/// Parses a memory device structure.
///
/// Returns `Ok(None)` for an empty or unknown-size slot.
pub fn parse_memory_device(path: &str, raw: &[u8]) -> Result<Option<MemoryModule>> {
    let invalid = |detail: String| Error::Smbios {
        path: path.to_string(),
        detail,
    };

    if raw.len() < 4 {
        return Err(invalid(format!("structure too short ({} bytes)", raw.len())));
    }
    if raw[0] != MEMORY_DEVICE {
        return Err(invalid(format!("expected type {MEMORY_DEVICE}, got {}", raw[0])));
    }
    let length = raw[1] as usize;
    if length < SPEED || raw.len() < length {
        return Err(invalid(format!("bad formatted length {length}")));
    }

    let formatted = &raw[..length];
    let strings = string_set(&raw[length..]);

    let Some(capacity_bytes) = capacity(formatted) else {
        return Ok(None);
    };

    let string_at = |offset: usize| -> String {
        byte(formatted, offset)
            .filter(|&index| index > 0)
            .and_then(|index| strings.get(index as usize - 1))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let configured_speed = match word(formatted, CONFIGURED_SPEED) {
        Some(speed) if speed != 0 && speed != 0xFFFF => speed as u32,
        _ => word(formatted, SPEED)
            .filter(|&speed| speed != 0xFFFF)
            .unwrap_or(0) as u32,
    };

    Ok(Some(MemoryModule {
        slot: string_at(DEVICE_LOCATOR),
        manufacturer: string_at(MANUFACTURER),
        part_number: string_at(PART_NUMBER),
        capacity_bytes,
        configured_speed,
    }))
}

fn capacity(formatted: &[u8]) -> Option<u64> {
    match word(formatted, SIZE)? {
        0 | 0xFFFF => None,
        0x7FFF => {
            let mib = dword(formatted, EXTENDED_SIZE)? & 0x7FFF_FFFF;
            (mib > 0).then_some(mib as u64 * 1024 * 1024)
        }
        size if size & 0x8000 != 0 => Some((size & 0x7FFF) as u64 * 1024),
        size => Some(size as u64 * 1024 * 1024),
    }
}

fn string_set(bytes: &[u8]) -> Vec<String> {
    bytes
        .split(|&b| b == 0)
        .take_while(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

fn byte(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

fn word(data: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes([*data.get(offset)?, *data.get(offset + 1)?]))
}

fn dword(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a 0x22-byte type 17 structure with locator, manufacturer and
    /// part number as strings 1-3.
    pub(crate) fn memory_device(size: u16, extended_mib: u32, speed: u16, configured: u16) -> Vec<u8> {
        let mut raw = vec![0u8; 0x22];
        raw[0] = MEMORY_DEVICE;
        raw[1] = 0x22;
        raw[SIZE..SIZE + 2].copy_from_slice(&size.to_le_bytes());
        raw[DEVICE_LOCATOR] = 1;
        raw[SPEED..SPEED + 2].copy_from_slice(&speed.to_le_bytes());
        raw[MANUFACTURER] = 2;
        raw[PART_NUMBER] = 3;
        raw[EXTENDED_SIZE..EXTENDED_SIZE + 4].copy_from_slice(&extended_mib.to_le_bytes());
        raw[CONFIGURED_SPEED..CONFIGURED_SPEED + 2].copy_from_slice(&configured.to_le_bytes());
        for s in ["DIMM_A1", "Kingston", "KF432C16BB/16   "] {
            raw.extend_from_slice(s.as_bytes());
            raw.push(0);
        }
        raw.push(0);
        raw
    }

    #[test]
    fn test_parse_populated_slot() {
        let module = parse_memory_device("17-0", &memory_device(16384, 0, 3200, 2933))
            .unwrap()
            .unwrap();
        assert_eq!(module.slot, "DIMM_A1");
        assert_eq!(module.manufacturer, "Kingston");
        assert_eq!(module.part_number, "KF432C16BB/16");
        assert_eq!(module.capacity_bytes, 16 << 30);
        assert_eq!(module.configured_speed, 2933);
    }

    #[test]
    fn test_extended_size() {
        let module = parse_memory_device("17-0", &memory_device(0x7FFF, 65536, 4800, 4800))
            .unwrap()
            .unwrap();
        assert_eq!(module.capacity_bytes, 64 << 30);
    }

    #[test]
    fn test_kib_granularity() {
        let module = parse_memory_device("17-0", &memory_device(0x8000 | 512, 0, 0, 0))
            .unwrap()
            .unwrap();
        assert_eq!(module.capacity_bytes, 512 * 1024);
        assert_eq!(module.configured_speed, 0);
    }

    #[test]
    fn test_falls_back_to_rated_speed() {
        let module = parse_memory_device("17-0", &memory_device(8192, 0, 2400, 0))
            .unwrap()
            .unwrap();
        assert_eq!(module.configured_speed, 2400);
    }

    #[test]
    fn test_empty_slot() {
        assert!(parse_memory_device("17-1", &memory_device(0, 0, 0, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_rejects_wrong_type_and_truncation() {
        let mut raw = memory_device(8192, 0, 2400, 2400);
        raw[0] = 16;
        assert!(parse_memory_device("x", &raw).is_err());
        assert!(parse_memory_device("x", &[17, 0x22, 0]).is_err());
    }
}
