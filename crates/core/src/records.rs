//! Record types carried by configuration frames.
//!
//! These are transfer objects: built right before a request is encoded or
//! right after a reply is decoded. Field widths match the wire layout.

/// Number of virtual screens the device supports.
pub const NSCREENS: usize = 2;

/// Bit 0 of the configuration flags byte.
pub const UNMAPPED_PASSTHROUGH_FLAG: u8 = 0x01;
/// Bit 0 of the mapping flags byte.
pub const STICKY_FLAG: u8 = 0x01;

pub const DEFAULT_PARTIAL_SCROLL_TIMEOUT: u32 = 1_000_000;
pub const DEFAULT_OFFSCREEN_SENSITIVITY: u32 = 1000;
pub const DEFAULT_SCALING: i32 = 1000;
pub const DEFAULT_SCREEN_SENSITIVITY: u32 = 1000;

/// Global device settings, as sent with SET_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub unmapped_passthrough: bool,
    pub partial_scroll_timeout: u32,
    pub interval_override: u8,
    pub constraint_mode: u8,
    pub offscreen_sensitivity: u32,
}

impl Configuration {
    /// Flags byte as it appears on the wire.
    pub fn flags(&self) -> u8 {
        if self.unmapped_passthrough {
            UNMAPPED_PASSTHROUGH_FLAG
        } else {
            0
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            unmapped_passthrough: true,
            partial_scroll_timeout: DEFAULT_PARTIAL_SCROLL_TIMEOUT,
            interval_override: 0,
            constraint_mode: 0,
            offscreen_sensitivity: DEFAULT_OFFSCREEN_SENSITIVITY,
        }
    }
}

/// Reply to GET_CONFIG: the settings plus device-reported counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigReport {
    pub version: u8,
    pub config: Configuration,
    /// Number of mappings currently stored on the device.
    pub mapping_count: u32,
    /// Usage ranges in the device's own report descriptor.
    pub our_usage_count: u32,
    /// Usage ranges seen on the attached peripheral.
    pub their_usage_count: u32,
}

/// One input-to-output usage remap.
///
/// Mappings have no identity beyond their position in the device's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub target_usage: u32,
    pub source_usage: u32,
    /// Signed, so a mapping may invert direction. 1000 = 1.0x.
    pub scaling: i32,
    pub layer: u8,
    pub sticky: bool,
}

impl Mapping {
    /// Mapping with default scaling, layer 0, not sticky.
    pub fn new(target_usage: u32, source_usage: u32) -> Self {
        Self {
            target_usage,
            source_usage,
            scaling: DEFAULT_SCALING,
            layer: 0,
            sticky: false,
        }
    }

    /// Flags byte as it appears on the wire.
    pub fn flags(&self) -> u8 {
        if self.sticky {
            STICKY_FLAG
        } else {
            0
        }
    }
}

/// One virtual display region, in device coordinate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    /// Position in `[0, NSCREENS)`.
    pub index: u8,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub sensitivity: u32,
}

/// A run-length encoded range of HID usages: `count` usages starting at `usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRun {
    pub usage: u32,
    pub count: u32,
}

/// Which usage list to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSource {
    /// Usages in the descriptor the device presents to the host.
    Ours,
    /// Usages found on the peripheral plugged into the device.
    Theirs,
}

impl UsageSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ours => "our",
            Self::Theirs => "their",
        }
    }
}

/// A complete configuration to write: settings, mappings in order, screens in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub config: Configuration,
    pub mappings: Vec<Mapping>,
    pub screens: Vec<Screen>,
}

/// Everything a read transaction returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub report: ConfigReport,
    pub mappings: Vec<Mapping>,
    pub screens: Vec<Screen>,
}

impl ConfigSnapshot {
    /// The writable part of a snapshot.
    pub fn to_device_config(&self) -> DeviceConfig {
        DeviceConfig {
            config: self.report.config,
            mappings: self.mappings.clone(),
            screens: self.screens.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_defaults() {
        let c = Configuration::default();
        assert!(c.unmapped_passthrough);
        assert_eq!(c.partial_scroll_timeout, 1_000_000);
        assert_eq!(c.interval_override, 0);
        assert_eq!(c.constraint_mode, 0);
        assert_eq!(c.offscreen_sensitivity, 1000);
    }

    #[test]
    fn flag_bits() {
        let mut c = Configuration::default();
        assert_eq!(c.flags(), 0x01);
        c.unmapped_passthrough = false;
        assert_eq!(c.flags(), 0x00);

        let mut m = Mapping::new(0x0009_0001, 0x0009_0002);
        assert_eq!(m.flags(), 0x00);
        m.sticky = true;
        assert_eq!(m.flags(), 0x01);
    }

    #[test]
    fn new_mapping_uses_default_scaling() {
        let m = Mapping::new(1, 2);
        assert_eq!(m.scaling, 1000);
        assert_eq!(m.layer, 0);
        assert!(!m.sticky);
    }
}
