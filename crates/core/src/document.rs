//! JSON configuration document.
//!
//! The human-facing form of a device configuration. Usage codes appear as
//! `0x`-prefixed, 8-digit hex strings; every other number is plain JSON.
//! Missing optional fields take the device defaults. Numbers are kept wide
//! here and narrowed to their wire widths by [`ConfigDocument::to_device_config`].

use crate::error::{Error, Result};
use crate::frame::CONFIG_VERSION;
use crate::records::{
    ConfigSnapshot, Configuration, DeviceConfig, Mapping, Screen, DEFAULT_OFFSCREEN_SENSITIVITY,
    DEFAULT_PARTIAL_SCROLL_TIMEOUT, DEFAULT_SCALING, DEFAULT_SCREEN_SENSITIVITY,
};
use crate::safety::{self, narrow_i32, narrow_u32, narrow_u8};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// A HID usage code (usage page in the high 16 bits, usage ID in the low 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsageCode(pub u32);

impl UsageCode {
    /// Parse `0x`-prefixed hex text with 1 to 8 digits.
    pub fn parse(text: &str) -> Result<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(|| Error::Document(format!("usage {text:?} must start with 0x")))?;
        if digits.is_empty() || digits.len() > 8 {
            return Err(Error::Document(format!(
                "usage {text:?} must have 1 to 8 hex digits"
            )));
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| Error::Document(format!("usage {text:?}: {e}")))
    }
}

impl std::fmt::Display for UsageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Serialize for UsageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UsageCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        UsageCode::parse(&text).map_err(serde::de::Error::custom)
    }
}

fn default_version() -> i64 {
    CONFIG_VERSION as i64
}
fn default_true() -> bool {
    true
}
fn default_partial_scroll_timeout() -> i64 {
    DEFAULT_PARTIAL_SCROLL_TIMEOUT as i64
}
fn default_offscreen_sensitivity() -> i64 {
    DEFAULT_OFFSCREEN_SENSITIVITY as i64
}
fn default_scaling() -> i64 {
    DEFAULT_SCALING as i64
}
fn default_screen_sensitivity() -> i64 {
    DEFAULT_SCREEN_SENSITIVITY as i64
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default = "default_true")]
    pub unmapped_passthrough: bool,
    #[serde(default = "default_partial_scroll_timeout")]
    pub partial_scroll_timeout: i64,
    #[serde(default)]
    pub interval_override: i64,
    #[serde(default)]
    pub constraint_mode: i64,
    #[serde(default = "default_offscreen_sensitivity")]
    pub offscreen_sensitivity: i64,
    #[serde(default)]
    pub screens: Vec<ScreenEntry>,
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
}

/// One mapping in a document. Position in the list is the device index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub target_usage: UsageCode,
    pub source_usage: UsageCode,
    #[serde(default = "default_scaling")]
    pub scaling: i64,
    #[serde(default)]
    pub layer: i64,
    #[serde(default)]
    pub sticky: bool,
}

/// One screen in a document. Position in the list is the screen slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    #[serde(default = "default_screen_sensitivity")]
    pub sensitivity: i64,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            unmapped_passthrough: true,
            partial_scroll_timeout: default_partial_scroll_timeout(),
            interval_override: 0,
            constraint_mode: 0,
            offscreen_sensitivity: default_offscreen_sensitivity(),
            screens: Vec::new(),
            mappings: Vec::new(),
        }
    }
}

impl ConfigDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Document(e.to_string()))
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Document(e.to_string()))
    }

    /// Validate and narrow every field to its wire width.
    ///
    /// The document's `version` is not checked here: frames always carry the
    /// protocol version and the device decides whether to accept them.
    pub fn to_device_config(&self) -> Result<DeviceConfig> {
        if self.version != CONFIG_VERSION as i64 {
            warn!(
                document_version = self.version,
                protocol_version = CONFIG_VERSION,
                "Document version differs from protocol version"
            );
        }
        safety::validate_screen_count(self.screens.len())?;

        let config = Configuration {
            unmapped_passthrough: self.unmapped_passthrough,
            partial_scroll_timeout: narrow_u32(
                "partial_scroll_timeout",
                self.partial_scroll_timeout,
            )?,
            interval_override: narrow_u8("interval_override", self.interval_override)?,
            constraint_mode: narrow_u8("constraint_mode", self.constraint_mode)?,
            offscreen_sensitivity: narrow_u32(
                "offscreen_sensitivity",
                self.offscreen_sensitivity,
            )?,
        };

        let mappings = self
            .mappings
            .iter()
            .map(MappingEntry::to_record)
            .collect::<Result<Vec<_>>>()?;

        let screens = self
            .screens
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.to_record(safety::validate_screen_index(i)?))
            .collect::<Result<Vec<_>>>()?;

        Ok(DeviceConfig {
            config,
            mappings,
            screens,
        })
    }
}

impl MappingEntry {
    pub fn to_record(&self) -> Result<Mapping> {
        Ok(Mapping {
            target_usage: self.target_usage.0,
            source_usage: self.source_usage.0,
            scaling: narrow_i32("scaling", self.scaling)?,
            layer: narrow_u8("layer", self.layer)?,
            sticky: self.sticky,
        })
    }
}

impl From<&Mapping> for MappingEntry {
    fn from(m: &Mapping) -> Self {
        Self {
            target_usage: UsageCode(m.target_usage),
            source_usage: UsageCode(m.source_usage),
            scaling: m.scaling.into(),
            layer: m.layer.into(),
            sticky: m.sticky,
        }
    }
}

impl ScreenEntry {
    pub fn to_record(&self, index: u8) -> Result<Screen> {
        Ok(Screen {
            index,
            x: narrow_u32("x", self.x)?,
            y: narrow_u32("y", self.y)?,
            w: narrow_u32("w", self.w)?,
            h: narrow_u32("h", self.h)?,
            sensitivity: narrow_u32("sensitivity", self.sensitivity)?,
        })
    }
}

impl From<&Screen> for ScreenEntry {
    fn from(s: &Screen) -> Self {
        Self {
            x: s.x.into(),
            y: s.y.into(),
            w: s.w.into(),
            h: s.h.into(),
            sensitivity: s.sensitivity.into(),
        }
    }
}

impl From<&ConfigSnapshot> for ConfigDocument {
    fn from(snapshot: &ConfigSnapshot) -> Self {
        let config = &snapshot.report.config;
        Self {
            version: snapshot.report.version.into(),
            unmapped_passthrough: config.unmapped_passthrough,
            partial_scroll_timeout: config.partial_scroll_timeout.into(),
            interval_override: config.interval_override.into(),
            constraint_mode: config.constraint_mode.into(),
            offscreen_sensitivity: config.offscreen_sensitivity.into(),
            screens: snapshot.screens.iter().map(ScreenEntry::from).collect(),
            mappings: snapshot.mappings.iter().map(MappingEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ConfigReport;

    const TWO_SCREENS: &str = r#"{
        "version": 4,
        "unmapped_passthrough": true,
        "partial_scroll_timeout": 1000000,
        "interval_override": 0,
        "constraint_mode": 2,
        "offscreen_sensitivity": 4000,
        "screens": [
            { "x": 0, "y": 0, "w": 14400000, "h": 9000000, "sensitivity": 8000 },
            { "x": 14400000, "y": 0, "w": 13500000, "h": 9000000, "sensitivity": 8000 }
        ],
        "mappings": []
    }"#;

    #[test]
    fn usage_code_formats_as_fixed_width_hex() {
        assert_eq!(UsageCode(0x0009_0001).to_string(), "0x00090001");
        assert_eq!(UsageCode(0).to_string(), "0x00000000");
        assert_eq!(UsageCode(u32::MAX).to_string(), "0xffffffff");
    }

    #[test]
    fn usage_code_parse() {
        assert_eq!(UsageCode::parse("0x00090001").unwrap().0, 0x0009_0001);
        assert_eq!(UsageCode::parse("0xFFFF0001").unwrap().0, 0xFFFF_0001);
        assert_eq!(UsageCode::parse("0x1").unwrap().0, 1);
        assert!(UsageCode::parse("00090001").is_err());
        assert!(UsageCode::parse("0x").is_err());
        assert!(UsageCode::parse("0x100000000").is_err());
        assert!(UsageCode::parse("0xzz").is_err());
    }

    #[test]
    fn parses_example_document() {
        let doc = ConfigDocument::from_json(TWO_SCREENS).unwrap();
        let config = doc.to_device_config().unwrap();
        assert_eq!(config.config.constraint_mode, 2);
        assert_eq!(config.config.offscreen_sensitivity, 4000);
        assert_eq!(config.screens.len(), 2);
        assert_eq!(config.screens[1].index, 1);
        assert_eq!(config.screens[1].w, 13_500_000);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let doc = ConfigDocument::from_json(
            r#"{
                "screens": [ { "x": 0, "y": 0, "w": 10, "h": 10 } ],
                "mappings": [ { "target_usage": "0x00090001", "source_usage": "0x00090002" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.version, 4);
        let config = doc.to_device_config().unwrap();
        assert_eq!(config.config, Configuration::default());
        assert_eq!(config.mappings[0].scaling, 1000);
        assert_eq!(config.mappings[0].layer, 0);
        assert!(!config.mappings[0].sticky);
        assert_eq!(config.screens[0].sensitivity, 1000);
    }

    #[test]
    fn empty_document_is_valid() {
        let config = ConfigDocument::from_json("{}")
            .unwrap()
            .to_device_config()
            .unwrap();
        assert!(config.mappings.is_empty());
        assert!(config.screens.is_empty());
    }

    #[test]
    fn layer_256_is_out_of_range() {
        let doc = ConfigDocument::from_json(
            r#"{ "mappings": [ { "target_usage": "0x00090001", "source_usage": "0x00090002", "layer": 256 } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            doc.to_device_config(),
            Err(Error::OutOfRange { field: "layer", value: 256, .. })
        ));
    }

    #[test]
    fn third_screen_is_out_of_range() {
        let mut doc = ConfigDocument::from_json(TWO_SCREENS).unwrap();
        doc.screens.push(doc.screens[0].clone());
        assert!(matches!(
            doc.to_device_config(),
            Err(Error::OutOfRange { field: "screen_count", .. })
        ));
    }

    #[test]
    fn negative_geometry_is_out_of_range() {
        let mut doc = ConfigDocument::from_json(TWO_SCREENS).unwrap();
        doc.screens[0].x = -1;
        assert!(matches!(
            doc.to_device_config(),
            Err(Error::OutOfRange { field: "x", .. })
        ));
    }

    #[test]
    fn bad_usage_text_is_a_document_error() {
        let result = ConfigDocument::from_json(
            r#"{ "mappings": [ { "target_usage": "90001", "source_usage": "0x00090002" } ] }"#,
        );
        assert!(matches!(result, Err(Error::Document(_))));
    }

    #[test]
    fn snapshot_serializes_with_hex_usages_in_document_order() {
        let snapshot = ConfigSnapshot {
            report: ConfigReport {
                version: 4,
                config: Configuration::default(),
                mapping_count: 1,
                our_usage_count: 0,
                their_usage_count: 0,
            },
            mappings: vec![Mapping {
                target_usage: 0x0009_0001,
                source_usage: 0x0001_0030,
                scaling: -500,
                layer: 2,
                sticky: true,
            }],
            screens: vec![],
        };
        let json = ConfigDocument::from(&snapshot).to_json_pretty().unwrap();
        assert!(json.contains(r#""target_usage": "0x00090001""#), "{json}");
        assert!(json.contains(r#""source_usage": "0x00010030""#), "{json}");
        assert!(json.contains(r#""scaling": -500"#), "{json}");

        let order = [
            "\"version\"",
            "\"unmapped_passthrough\"",
            "\"partial_scroll_timeout\"",
            "\"interval_override\"",
            "\"constraint_mode\"",
            "\"offscreen_sensitivity\"",
            "\"screens\"",
            "\"mappings\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn document_survives_json_and_records() {
        let doc = ConfigDocument::from_json(TWO_SCREENS).unwrap();
        let reparsed = ConfigDocument::from_json(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed, doc);
    }
}
