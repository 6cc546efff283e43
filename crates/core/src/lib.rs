//! remapper-config-core: feature-report protocol, device discovery, and
//! configuration transactions.
//!
//! This crate provides the cross-platform core logic for reading and writing
//! the configuration of a USB HID remapper over 33-byte feature reports.

pub mod crc;
pub mod device;
pub mod document;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod records;
pub mod safety;
pub mod transport;

/// Default USB Vendor ID of the remapper firmware.
pub const REMAPPER_VID: u16 = 0xCAFE;

/// Known remapper product IDs.
pub mod pids {
    /// Remapper configuration interface.
    pub const REMAPPER: u16 = 0xBAF3;
}
