//! Device discovery.

use crate::error::{Error, Result};
use crate::{pids, REMAPPER_VID};
use tracing::{debug, info};

/// USB identifiers used to find the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub vid: u16,
    pub pid: u16,
}

impl Default for DeviceId {
    fn default() -> Self {
        Self {
            vid: REMAPPER_VID,
            pid: pids::REMAPPER,
        }
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VID=0x{:04X} PID=0x{:04X}", self.vid, self.pid)
    }
}

/// Parse a USB vendor or product ID given as `0x`-prefixed hex or decimal.
pub fn parse_usb_id(text: &str) -> Result<u16> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|e| Error::Document(format!("invalid USB ID {text:?}: {e}")))
}

/// Information about a discovered device interface.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub interface_number: i32,
    pub product: Option<String>,
    pub serial: Option<String>,
}

/// Discover all connected HID interfaces matching `id`.
pub fn discover_devices(id: DeviceId) -> Result<Vec<DeviceInfo>> {
    debug!(%id, "Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::Hid(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        if info.vendor_id() != id.vid || info.product_id() != id.pid {
            continue;
        }

        info!(
            vid = format_args!("0x{:04X}", info.vendor_id()),
            pid = format_args!("0x{:04X}", info.product_id()),
            interface = info.interface_number(),
            path = %info.path().to_string_lossy(),
            "Found remapper"
        );
        devices.push(DeviceInfo {
            vid: info.vendor_id(),
            pid: info.product_id(),
            path: info.path().to_string_lossy().into_owned(),
            interface_number: info.interface_number(),
            product: info.product_string().map(|s| s.to_string()),
            serial: info.serial_number().map(|s| s.to_string()),
        });
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_id_is_remapper() {
        let id = DeviceId::default();
        assert_eq!(id.vid, 0xCAFE);
        assert_eq!(id.pid, 0xBAF3);
        assert_eq!(id.to_string(), "VID=0xCAFE PID=0xBAF3");
    }

    #[test]
    fn parse_usb_id_hex_and_decimal() {
        assert_eq!(parse_usb_id("0xCAFE").unwrap(), 0xCAFE);
        assert_eq!(parse_usb_id("0xbaf3").unwrap(), 0xBAF3);
        assert_eq!(parse_usb_id("51966").unwrap(), 0xCAFE);
        assert_eq!(parse_usb_id(" 0X0001 ").unwrap(), 1);
    }

    #[test]
    fn parse_usb_id_rejects_garbage() {
        assert!(parse_usb_id("").is_err());
        assert!(parse_usb_id("0x").is_err());
        assert!(parse_usb_id("0x10000").is_err());
        assert!(parse_usb_id("cafe").is_err());
        assert!(parse_usb_id("-1").is_err());
    }
}
