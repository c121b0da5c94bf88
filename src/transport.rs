//! Request/reply HID transport.

use std::fmt::Write;

use hidapi::{HidApi, HidDevice};
use tracing::debug;

use crate::amd_wraith_prism::{CMD_SIZE, INTERFACE, PRODUCT_ID, REPLY_SIZE, VENDOR_ID};
use crate::error::Error;

/// Blocking byte-level access to an opened HID device.
pub trait HidEndpoint {
    /// Write one report, returning the number of bytes accepted.
    fn write(&self, data: &[u8]) -> Result<usize, Error>;

    /// Read one report into `buf`, returning the number of bytes received.
    fn read(&self, buf: &mut [u8]) -> Result<usize, Error>;
}

/// Opened lighting endpoint.
pub struct Device {
    handle: HidDevice,
    timeout_ms: i32,
}

impl HidEndpoint for Device {
    fn write(&self, data: &[u8]) -> Result<usize, Error> {
        self.handle.write(data).map_err(|err| Error::WriteFailure(err.to_string()))
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        self.handle
            .read_timeout(buf, self.timeout_ms)
            .map_err(|err| Error::ReadFailure(err.to_string()))
    }
}

/// Locate and open the cooler's lighting interface.
///
/// The controller exposes several HID interfaces; lighting commands are only
/// accepted on interface 1. A negative `timeout_ms` blocks indefinitely.
pub fn open_device(api: &HidApi, timeout_ms: i32) -> Result<Device, Error> {
    let info = api
        .device_list()
        .find(|info| {
            info.vendor_id() == VENDOR_ID
                && info.product_id() == PRODUCT_ID
                && info.interface_number() == INTERFACE
        })
        .ok_or(Error::DeviceNotFound)?;

    let handle = info.open_device(api).map_err(|err| Error::Hid(err.to_string()))?;

    Ok(Device { handle, timeout_ms })
}

/// Perform one write/read transaction.
///
/// Replies have a fixed size; anything other than exactly [`REPLY_SIZE`]
/// bytes is an error, not a partial result.
pub fn transact<D: HidEndpoint>(device: &D, frame: &[u8]) -> Result<[u8; REPLY_SIZE], Error> {
    debug_assert_eq!(frame.len(), CMD_SIZE);
    debug!("sending:\n{}", hex_lines(frame));

    let written = device.write(frame)?;
    if written < CMD_SIZE {
        return Err(Error::WriteFailure(format!("only {written} of {CMD_SIZE} bytes sent")));
    }

    let mut reply = [0; REPLY_SIZE];
    let received = device.read(&mut reply)?;
    debug!("received:\n{}", hex_lines(&reply[..received.min(REPLY_SIZE)]));

    if received != REPLY_SIZE {
        return Err(Error::ShortReply(received));
    }

    Ok(reply)
}

/// Format a buffer as rows of eight hex bytes.
pub fn hex_lines(buffer: &[u8]) -> String {
    let mut out = String::with_capacity(buffer.len() * 6);

    for (i, byte) in buffer.iter().enumerate() {
        if i > 0 {
            out.push_str(if i % 8 == 0 { "\n" } else { ", " });
        }
        let _ = write!(out, "0x{byte:02x}");
    }

    out
}
