//! Configuration transactions.
//!
//! A read is an unbracketed sequence of queries:
//!   GET_CONFIG → GET_MAPPING(0..mapping_count) → GET_SCREEN(0..NSCREENS)
//!
//! A write is bracketed so the device never acts on a half-written
//! configuration:
//!   SUSPEND → SET_CONFIG → CLEAR_MAPPING → ADD_MAPPING* → SET_SCREEN* →
//!   PERSIST_CONFIG → RESUME
//!
//! Each step is one write-then-read exchange. The first failure aborts the
//! transaction; nothing is retried or rolled back.

use crate::error::Result;
use crate::frame::{self, Command, Frame, Request, USAGES_PER_FRAME};
use crate::records::{
    ConfigReport, ConfigSnapshot, DeviceConfig, Screen, UsageRun, UsageSource, NSCREENS,
};
use crate::safety;
use crate::transport::{self, FeatureTransport};
use tracing::{debug, info};

/// One encoded step of a write transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Step name used in logs and errors, e.g. `ADD_MAPPING #2`.
    pub label: String,
    pub command: Command,
    pub frame: Frame,
}

fn planned(label: String, request: Request) -> Result<PlannedStep> {
    let frame = request.encode().map_err(|e| e.at_step(label.as_str()))?;
    Ok(PlannedStep {
        label,
        command: request.command(),
        frame,
    })
}

/// Encode every frame of a write transaction up front.
///
/// Mappings keep document order (position = device index) and screens are
/// written to the slot matching their position. Any value that does not fit
/// its field fails here, before anything reaches the device.
pub fn plan_write(config: &DeviceConfig) -> Result<Vec<PlannedStep>> {
    safety::validate_screen_count(config.screens.len())
        .map_err(|e| e.at_step(Command::SetScreen.name()))?;

    let mut steps = Vec::with_capacity(config.mappings.len() + config.screens.len() + 5);
    steps.push(planned(Command::Suspend.name().into(), Request::Suspend)?);
    steps.push(planned(
        Command::SetConfig.name().into(),
        Request::SetConfig(config.config),
    )?);
    steps.push(planned(
        Command::ClearMapping.name().into(),
        Request::ClearMapping,
    )?);
    for (i, mapping) in config.mappings.iter().enumerate() {
        steps.push(planned(
            format!("{} #{i}", Command::AddMapping),
            Request::AddMapping(*mapping),
        )?);
    }
    for (i, screen) in config.screens.iter().enumerate() {
        let label = format!("{} #{i}", Command::SetScreen);
        let index = safety::validate_screen_index(i).map_err(|e| e.at_step(label.as_str()))?;
        steps.push(planned(label, Request::SetScreen(Screen { index, ..*screen }))?);
    }
    steps.push(planned(
        Command::PersistConfig.name().into(),
        Request::PersistConfig,
    )?);
    steps.push(planned(Command::Resume.name().into(), Request::Resume)?);
    Ok(steps)
}

/// Write a complete configuration to the device.
pub fn write_config(transport: &dyn FeatureTransport, config: &DeviceConfig) -> Result<()> {
    let plan = plan_write(config)?;
    info!(
        mappings = config.mappings.len(),
        screens = config.screens.len(),
        frames = plan.len(),
        "Writing device configuration"
    );

    for step in &plan {
        debug!(step = %step.label, "write step");
        transport::exchange_frame(transport, &step.frame)
            .map_err(|e| e.at_step(step.label.as_str()))?;
    }

    info!("Configuration written and persisted");
    Ok(())
}

/// Send one query and decode its reply, labelling any failure with `label`.
fn query<T>(
    transport: &dyn FeatureTransport,
    label: &str,
    request: Request,
    decode: impl FnOnce(&Frame) -> Result<T>,
) -> Result<T> {
    transport::exchange(transport, &request)
        .and_then(|reply| decode(&reply))
        .map_err(|e| e.at_step(label))
}

/// Send GET_CONFIG alone and return the settings and device counters.
pub fn read_report(transport: &dyn FeatureTransport) -> Result<ConfigReport> {
    let report = query(
        transport,
        Command::GetConfig.name(),
        Request::GetConfig,
        frame::decode_config_reply,
    )?;
    debug!(
        version = report.version,
        mapping_count = report.mapping_count,
        our_usage_count = report.our_usage_count,
        their_usage_count = report.their_usage_count,
        "GET_CONFIG decoded"
    );
    Ok(report)
}

/// Read the complete configuration from the device.
///
/// The mapping count reported by GET_CONFIG bounds the mapping queries.
/// Storage grows with each decoded reply, never from the reported count.
pub fn read_config(transport: &dyn FeatureTransport) -> Result<ConfigSnapshot> {
    info!("Reading device configuration");

    let report = read_report(transport)?;

    let mut mappings = Vec::new();
    for index in 0..report.mapping_count {
        let mapping = query(
            transport,
            &format!("{} #{index}", Command::GetMapping),
            Request::GetMapping { index },
            frame::decode_mapping_reply,
        )?;
        debug!(
            index,
            target = format_args!("0x{:08x}", mapping.target_usage),
            source = format_args!("0x{:08x}", mapping.source_usage),
            "mapping decoded"
        );
        mappings.push(mapping);
    }

    let mut screens = Vec::with_capacity(NSCREENS);
    for index in 0..NSCREENS as u8 {
        let screen = query(
            transport,
            &format!("{} #{index}", Command::GetScreen),
            Request::GetScreen {
                index: u32::from(index),
            },
            |reply| frame::decode_screen_reply(reply, index),
        )?;
        screens.push(screen);
    }

    info!(mappings = mappings.len(), "Configuration read");
    Ok(ConfigSnapshot {
        report,
        mappings,
        screens,
    })
}

/// Read `count` usage runs from one of the device's usage lists.
///
/// Each query returns up to [`USAGES_PER_FRAME`] runs starting at `start`.
pub fn read_usage_runs(
    transport: &dyn FeatureTransport,
    source: UsageSource,
    count: u32,
) -> Result<Vec<UsageRun>> {
    let mut runs = Vec::new();
    let mut start = 0u32;
    while start < count {
        let request = match source {
            UsageSource::Ours => Request::GetOurUsages { start },
            UsageSource::Theirs => Request::GetTheirUsages { start },
        };
        let label = format!("{} #{start}", request.command());
        let batch = query(transport, &label, request, frame::decode_usage_reply)?;
        let wanted = (count - start).min(USAGES_PER_FRAME as u32) as usize;
        runs.extend_from_slice(&batch[..wanted]);
        start += USAGES_PER_FRAME as u32;
    }
    debug!(source = source.label(), runs = runs.len(), "usage list read");
    Ok(runs)
}

/// Reboot the device into its USB bootloader.
///
/// The device detaches immediately, so no reply is read.
pub fn reset_into_bootsel(transport: &dyn FeatureTransport) -> Result<()> {
    let label = Command::ResetIntoBootsel.name();
    let frame = Request::ResetIntoBootsel
        .encode()
        .map_err(|e| e.at_step(label))?;
    transport::send_frame(transport, &frame).map_err(|e| e.at_step(label))?;
    info!("Device rebooting into bootloader");
    Ok(())
}
