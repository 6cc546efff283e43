//! Configuration frame encoding and decoding.
//!
//! Every exchange uses 33-byte feature reports on report ID 100. All
//! multi-byte fields are little-endian; unused bytes are zero.
//!
//! Request layout:
//!
//! | offset | size | field                                    |
//! |--------|------|------------------------------------------|
//! | 0      | 1    | report ID (100)                          |
//! | 1      | 1    | protocol version (4)                     |
//! | 2      | 1    | command code                             |
//! | 3      | 26   | command payload, zero-padded             |
//! | 29     | 4    | CRC-32 over bytes 1..29                  |
//!
//! Replies carry no version or command byte: bytes 1..29 hold fields whose
//! shape depends on the query that produced them, followed by the CRC.

use crate::crc;
use crate::error::{Error, Result};
use crate::records::{
    ConfigReport, Configuration, Mapping, Screen, UsageRun, NSCREENS, STICKY_FLAG,
    UNMAPPED_PASSTHROUGH_FLAG,
};
use crate::safety;

/// Feature report ID used for configuration frames.
pub const REPORT_ID_CONFIG: u8 = 100;
/// Protocol version this codec speaks.
pub const CONFIG_VERSION: u8 = 4;

/// Frame length including the report ID.
pub const FRAME_LEN: usize = 33;
/// Offset of the command payload in a request.
pub const PAYLOAD_OFFSET: usize = 3;
/// Offset of the trailing CRC.
pub const CRC_OFFSET: usize = 29;
/// Bytes available for a request payload.
pub const PAYLOAD_LEN: usize = CRC_OFFSET - PAYLOAD_OFFSET;
/// Offset of the first field in a reply.
pub const REPLY_OFFSET: usize = 1;

/// Usage runs carried by one GET_OUR_USAGES / GET_THEIR_USAGES reply.
pub const USAGES_PER_FRAME: usize = 3;

/// One configuration frame.
pub type Frame = [u8; FRAME_LEN];

/// Configuration command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    ResetIntoBootsel = 1,
    SetConfig = 2,
    GetConfig = 3,
    ClearMapping = 4,
    AddMapping = 5,
    GetMapping = 6,
    PersistConfig = 7,
    GetOurUsages = 8,
    GetTheirUsages = 9,
    Suspend = 10,
    Resume = 11,
    SetScreen = 12,
    GetScreen = 13,
}

impl Command {
    pub const ALL: &'static [Command] = &[
        Command::ResetIntoBootsel,
        Command::SetConfig,
        Command::GetConfig,
        Command::ClearMapping,
        Command::AddMapping,
        Command::GetMapping,
        Command::PersistConfig,
        Command::GetOurUsages,
        Command::GetTheirUsages,
        Command::Suspend,
        Command::Resume,
        Command::SetScreen,
        Command::GetScreen,
    ];

    /// Wire code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a command from its wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Protocol name, as used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResetIntoBootsel => "RESET_INTO_BOOTSEL",
            Self::SetConfig => "SET_CONFIG",
            Self::GetConfig => "GET_CONFIG",
            Self::ClearMapping => "CLEAR_MAPPING",
            Self::AddMapping => "ADD_MAPPING",
            Self::GetMapping => "GET_MAPPING",
            Self::PersistConfig => "PERSIST_CONFIG",
            Self::GetOurUsages => "GET_OUR_USAGES",
            Self::GetTheirUsages => "GET_THEIR_USAGES",
            Self::Suspend => "SUSPEND",
            Self::Resume => "RESUME",
            Self::SetScreen => "SET_SCREEN",
            Self::GetScreen => "GET_SCREEN",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed configuration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ResetIntoBootsel,
    Suspend,
    Resume,
    PersistConfig,
    ClearMapping,
    GetConfig,
    SetConfig(Configuration),
    AddMapping(Mapping),
    SetScreen(Screen),
    GetMapping { index: u32 },
    GetScreen { index: u32 },
    GetOurUsages { start: u32 },
    GetTheirUsages { start: u32 },
}

impl Request {
    pub fn command(&self) -> Command {
        match self {
            Self::ResetIntoBootsel => Command::ResetIntoBootsel,
            Self::Suspend => Command::Suspend,
            Self::Resume => Command::Resume,
            Self::PersistConfig => Command::PersistConfig,
            Self::ClearMapping => Command::ClearMapping,
            Self::GetConfig => Command::GetConfig,
            Self::SetConfig(_) => Command::SetConfig,
            Self::AddMapping(_) => Command::AddMapping,
            Self::SetScreen(_) => Command::SetScreen,
            Self::GetMapping { .. } => Command::GetMapping,
            Self::GetScreen { .. } => Command::GetScreen,
            Self::GetOurUsages { .. } => Command::GetOurUsages,
            Self::GetTheirUsages { .. } => Command::GetTheirUsages,
        }
    }

    /// Encode into a sealed 33-byte request frame.
    ///
    /// Payloads, starting at offset 3:
    /// - SET_CONFIG: `flags:u8, partial_scroll_timeout:u32, interval_override:u8,
    ///   constraint_mode:u8, offscreen_sensitivity:u32`
    /// - ADD_MAPPING: `target_usage:u32, source_usage:u32, scaling:i32, layer:u8, flags:u8`
    /// - SET_SCREEN: `index:u8, x:u32, y:u32, w:u32, h:u32, sensitivity:u32`
    /// - GET_MAPPING, GET_SCREEN, GET_OUR_USAGES, GET_THEIR_USAGES: `index:u32`
    /// - everything else: empty
    ///
    /// Fails with [`Error::OutOfRange`] when a screen index is not a valid slot.
    pub fn encode(&self) -> Result<Frame> {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = REPORT_ID_CONFIG;
        frame[1] = CONFIG_VERSION;
        frame[2] = self.command().code();

        let mut w = FieldWriter::new(&mut frame[PAYLOAD_OFFSET..CRC_OFFSET]);
        match self {
            Self::SetConfig(config) => {
                w.u8(config.flags());
                w.u32(config.partial_scroll_timeout);
                w.u8(config.interval_override);
                w.u8(config.constraint_mode);
                w.u32(config.offscreen_sensitivity);
            }
            Self::AddMapping(mapping) => {
                w.u32(mapping.target_usage);
                w.u32(mapping.source_usage);
                w.i32(mapping.scaling);
                w.u8(mapping.layer);
                w.u8(mapping.flags());
            }
            Self::SetScreen(screen) => {
                w.u8(safety::validate_screen_index(screen.index as usize)?);
                w.u32(screen.x);
                w.u32(screen.y);
                w.u32(screen.w);
                w.u32(screen.h);
                w.u32(screen.sensitivity);
            }
            Self::GetScreen { index } => {
                safety::validate_screen_index(*index as usize)?;
                w.u32(*index);
            }
            Self::GetMapping { index }
            | Self::GetOurUsages { start: index }
            | Self::GetTheirUsages { start: index } => {
                w.u32(*index);
            }
            Self::ResetIntoBootsel
            | Self::Suspend
            | Self::Resume
            | Self::PersistConfig
            | Self::ClearMapping
            | Self::GetConfig => {}
        }

        crc::seal(&mut frame);
        Ok(frame)
    }
}

/// Copy a raw report into a frame, rejecting anything that is not exactly 33 bytes.
pub fn frame_from_slice(data: &[u8]) -> Result<Frame> {
    Frame::try_from(data).map_err(|_| Error::MalformedFrame {
        expected: FRAME_LEN,
        actual: data.len(),
    })
}

/// Decode a GET_CONFIG reply.
///
/// | offset | size | field                  |
/// |--------|------|------------------------|
/// | 1      | 1    | version                |
/// | 2      | 1    | flags                  |
/// | 3      | 4    | partial_scroll_timeout |
/// | 7      | 4    | mapping_count          |
/// | 11     | 4    | our_usage_count        |
/// | 15     | 4    | their_usage_count      |
/// | 19     | 1    | interval_override      |
/// | 20     | 1    | constraint_mode        |
/// | 21     | 4    | offscreen_sensitivity  |
/// | 25     | 4    | padding                |
pub fn decode_config_reply(frame: &Frame) -> Result<ConfigReport> {
    crc::check_frame(frame)?;
    let mut r = FieldReader::new(&frame[REPLY_OFFSET..CRC_OFFSET]);
    let version = r.u8();
    let flags = r.u8();
    let partial_scroll_timeout = r.u32();
    let mapping_count = r.u32();
    let our_usage_count = r.u32();
    let their_usage_count = r.u32();
    let interval_override = r.u8();
    let constraint_mode = r.u8();
    let offscreen_sensitivity = r.u32();
    Ok(ConfigReport {
        version,
        config: Configuration {
            unmapped_passthrough: flags & UNMAPPED_PASSTHROUGH_FLAG != 0,
            partial_scroll_timeout,
            interval_override,
            constraint_mode,
            offscreen_sensitivity,
        },
        mapping_count,
        our_usage_count,
        their_usage_count,
    })
}

/// Decode a GET_MAPPING reply.
///
/// | offset | size | field        |
/// |--------|------|--------------|
/// | 1      | 4    | target_usage |
/// | 5      | 4    | source_usage |
/// | 9      | 4    | scaling      |
/// | 13     | 1    | layer        |
/// | 14     | 1    | flags        |
/// | 15     | 14   | padding      |
pub fn decode_mapping_reply(frame: &Frame) -> Result<Mapping> {
    crc::check_frame(frame)?;
    let mut r = FieldReader::new(&frame[REPLY_OFFSET..CRC_OFFSET]);
    let target_usage = r.u32();
    let source_usage = r.u32();
    let scaling = r.i32();
    let layer = r.u8();
    let flags = r.u8();
    Ok(Mapping {
        target_usage,
        source_usage,
        scaling,
        layer,
        sticky: flags & STICKY_FLAG != 0,
    })
}

/// Decode a GET_SCREEN reply for slot `index`.
///
/// | offset | size | field       |
/// |--------|------|-------------|
/// | 1      | 4    | x           |
/// | 5      | 4    | y           |
/// | 9      | 4    | w           |
/// | 13     | 4    | h           |
/// | 17     | 4    | sensitivity |
/// | 21     | 8    | padding     |
pub fn decode_screen_reply(frame: &Frame, index: u8) -> Result<Screen> {
    crc::check_frame(frame)?;
    let mut r = FieldReader::new(&frame[REPLY_OFFSET..CRC_OFFSET]);
    Ok(Screen {
        index,
        x: r.u32(),
        y: r.u32(),
        w: r.u32(),
        h: r.u32(),
        sensitivity: r.u32(),
    })
}

/// Decode a GET_OUR_USAGES / GET_THEIR_USAGES reply: three `(usage:u32, count:u32)`
/// pairs at offsets 1..25, then 4 padding bytes.
///
/// Slots past the end of the device's list come back zeroed; the caller
/// decides how many are meaningful.
pub fn decode_usage_reply(frame: &Frame) -> Result<[UsageRun; USAGES_PER_FRAME]> {
    crc::check_frame(frame)?;
    let mut r = FieldReader::new(&frame[REPLY_OFFSET..CRC_OFFSET]);
    let mut runs = [UsageRun { usage: 0, count: 0 }; USAGES_PER_FRAME];
    for run in runs.iter_mut() {
        run.usage = r.u32();
        run.count = r.u32();
    }
    Ok(runs)
}

/// Device-side encoders: build the replies a device sends back.
///
/// Used to emulate the device in tests and tooling.
pub mod reply {
    use super::*;

    fn sealed(fill: impl FnOnce(&mut FieldWriter<'_>)) -> Frame {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = REPORT_ID_CONFIG;
        fill(&mut FieldWriter::new(&mut frame[REPLY_OFFSET..CRC_OFFSET]));
        crc::seal(&mut frame);
        frame
    }

    /// Reply with no fields, as sent after mutation commands.
    pub fn empty() -> Frame {
        sealed(|_| {})
    }

    pub fn config(report: &ConfigReport) -> Frame {
        sealed(|w| {
            w.u8(report.version);
            w.u8(report.config.flags());
            w.u32(report.config.partial_scroll_timeout);
            w.u32(report.mapping_count);
            w.u32(report.our_usage_count);
            w.u32(report.their_usage_count);
            w.u8(report.config.interval_override);
            w.u8(report.config.constraint_mode);
            w.u32(report.config.offscreen_sensitivity);
        })
    }

    pub fn mapping(mapping: &Mapping) -> Frame {
        sealed(|w| {
            w.u32(mapping.target_usage);
            w.u32(mapping.source_usage);
            w.i32(mapping.scaling);
            w.u8(mapping.layer);
            w.u8(mapping.flags());
        })
    }

    pub fn screen(screen: &Screen) -> Frame {
        sealed(|w| {
            w.u32(screen.x);
            w.u32(screen.y);
            w.u32(screen.w);
            w.u32(screen.h);
            w.u32(screen.sensitivity);
        })
    }

    /// At most [`USAGES_PER_FRAME`] runs are encoded; the rest of the slots stay zero.
    pub fn usages(runs: &[UsageRun]) -> Frame {
        sealed(|w| {
            for run in runs.iter().take(USAGES_PER_FRAME) {
                w.u32(run.usage);
                w.u32(run.count);
            }
        })
    }
}

/// Sequential little-endian writer over a fixed region of a frame.
struct FieldWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    fn u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    fn u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.put(&value.to_le_bytes());
    }
}

/// Sequential little-endian reader over a fixed region of a frame.
struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }
}

// Screen slots must be addressable by the u8 index field.
const _: () = assert!(NSCREENS <= u8::MAX as usize);
