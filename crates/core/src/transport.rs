//! Feature-report transport abstraction.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! simulated devices share the same interface. Every exchange is a blocking
//! write followed by a read; timeouts belong to the implementation.

use crate::crc;
use crate::error::Result;
use crate::frame::{self, Frame, Request, FRAME_LEN, REPORT_ID_CONFIG};
use tracing::trace;

/// Abstraction over HID feature-report I/O.
pub trait FeatureTransport: Send {
    /// Send a feature report. `data[0]` is the report ID.
    fn write_feature_report(&self, data: &[u8]) -> Result<()>;

    /// Fetch a feature report of `len` bytes (report ID included) for `report_id`.
    fn read_feature_report(&self, report_id: u8, len: usize) -> Result<Vec<u8>>;
}

/// Encode a request, send it, and return the CRC-checked reply frame.
pub fn exchange(transport: &dyn FeatureTransport, request: &Request) -> Result<Frame> {
    let encoded = request.encode()?;
    exchange_frame(transport, &encoded)
}

/// Send an already-encoded request frame and return the CRC-checked reply.
pub fn exchange_frame(transport: &dyn FeatureTransport, request: &Frame) -> Result<Frame> {
    send_frame(transport, request)?;

    let raw = transport.read_feature_report(REPORT_ID_CONFIG, FRAME_LEN)?;
    let reply = frame::frame_from_slice(&raw)?;
    trace!(report_hex = format_args!("{:02X?}", reply), "config RX");

    crc::check_frame(&reply)?;
    Ok(reply)
}

/// Send a request frame without reading a reply.
///
/// Only for commands after which the device detaches.
pub fn send_frame(transport: &dyn FeatureTransport, request: &Frame) -> Result<()> {
    trace!(
        command = frame::Command::from_code(request[2])
            .map(|c| c.name())
            .unwrap_or("UNKNOWN"),
        report_hex = format_args!("{:02X?}", request),
        "config TX"
    );
    transport.write_feature_report(request)
}


#[cfg(test)]
mod tests {
    use super::mock::SimulatedDevice;
    use super::*;
    use crate::error::Error;
    use crate::frame::Command;

    #[test]
    fn exchange_writes_then_reads() {
        let device = SimulatedDevice::new();
        let reply = exchange(&device, &Request::Suspend).unwrap();
        assert_eq!(device.log(), vec![Command::Suspend]);
        assert_eq!(device.reads(), 1);
        assert!(device.is_suspended());
        assert!(crc::check_frame(&reply).is_ok());
    }

    #[test]
    fn exchange_rejects_corrupted_reply() {
        let device = SimulatedDevice::new();
        device.corrupt_reply_to(Command::GetConfig);
        let result = exchange(&device, &Request::GetConfig);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn exchange_propagates_transport_error() {
        let device = SimulatedDevice::new();
        device.fail_write_of(Command::Resume);
        let result = exchange(&device, &Request::Resume);
        assert!(matches!(result, Err(Error::Hid(_))));
        assert_eq!(device.reads(), 0);
    }

    #[test]
    fn exchange_propagates_read_error_after_accepted_write() {
        let device = SimulatedDevice::new();
        device.fail_read_after(Command::Suspend);
        let result = exchange(&device, &Request::Suspend);
        assert!(matches!(result, Err(Error::Hid(_))));
        assert_eq!(device.log(), vec![Command::Suspend]);
        assert!(device.is_suspended());
    }

    #[test]
    fn exchange_rejects_short_reply() {
        struct ShortReply;
        impl FeatureTransport for ShortReply {
            fn write_feature_report(&self, _data: &[u8]) -> Result<()> {
                Ok(())
            }
            fn read_feature_report(&self, _report_id: u8, _len: usize) -> Result<Vec<u8>> {
                Ok(vec![REPORT_ID_CONFIG; 10])
            }
        }
        assert!(matches!(
            exchange(&ShortReply, &Request::GetConfig),
            Err(Error::MalformedFrame { actual: 10, .. })
        ));
    }

    #[test]
    fn out_of_range_request_is_never_sent() {
        let device = SimulatedDevice::new();
        let result = exchange(&device, &Request::GetScreen { index: 5 });
        assert!(matches!(result, Err(Error::OutOfRange { .. })));
        assert!(device.log().is_empty());
        assert_eq!(device.reads(), 0);
    }

    #[test]
    fn simulated_device_ignores_bad_crc() {
        let device = SimulatedDevice::new();
        let mut frame = Request::Suspend.encode().unwrap();
        frame[10] ^= 0x01;
        device.write_feature_report(&frame).unwrap();
        assert_eq!(device.rejected(), 1);
        assert!(!device.is_suspended());
    }
}
