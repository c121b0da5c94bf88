//! Error types.

use thiserror::Error;

/// Failures surfaced by command validation and device communication.
///
/// None of these are retried; each one terminates the operation it occurred
/// in.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no matching device found")]
    DeviceNotFound,

    #[error("HID error: {0}")]
    Hid(String),

    #[error("device write failed: {0}")]
    WriteFailure(String),

    #[error("device read failed: {0}")]
    ReadFailure(String),

    #[error("short reply of {0} bytes")]
    ShortReply(usize),
}

impl From<hidapi::HidError> for Error {
    fn from(err: hidapi::HidError) -> Self {
        Error::Hid(err.to_string())
    }
}
