//! Fixed-size frame layouts exchanged with the sensor.
//!
//! Command frame (host to sensor, 19 bytes):
//!
//! ```text
//! AA B4 | payload[13] | id_lo id_hi | checksum | AB
//! ```
//!
//! Response frame (sensor to host, 10 bytes):
//!
//! ```text
//! AA kind | payload[4] | id_lo id_hi | checksum | AB
//! ```
//!
//! In both layouts the checksum is the low byte of the sum of every byte between the
//! kind byte and the checksum itself. It is a modular sum, so two compensating errors
//! in different bytes go unnoticed; a single corrupted bit never does.

use crate::config::{DeviceId, Operation};
use crate::constants::*;
use crate::error::Error;

const PAYLOAD_START: usize = 2;
const COMMAND_DEVICE_OFFSET: usize = COMMAND_FRAME_LEN - 4;
const COMMAND_CHECKSUM_OFFSET: usize = COMMAND_FRAME_LEN - 2;
const RESPONSE_DEVICE_OFFSET: usize = RESPONSE_FRAME_LEN - 4;
const RESPONSE_CHECKSUM_OFFSET: usize = RESPONSE_FRAME_LEN - 2;

/// Sums `span` in a 16-bit accumulator and keeps the low byte.
pub fn checksum(span: &[u8]) -> u8 {
    let accum = span
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
    (accum & 0xFF) as u8
}

/// A complete, checksummed frame ready to be written to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_FRAME_LEN],
}

impl CommandFrame {
    /// Lays out a command frame and stores its checksum.
    pub fn build(command_id: u8, payload: [u8; COMMAND_PAYLOAD_LEN], target: DeviceId) -> Self {
        let mut bytes = [0u8; COMMAND_FRAME_LEN];
        bytes[0] = HEAD;
        bytes[1] = command_id;
        bytes[PAYLOAD_START..COMMAND_DEVICE_OFFSET].copy_from_slice(&payload);
        bytes[COMMAND_DEVICE_OFFSET..COMMAND_CHECKSUM_OFFSET].copy_from_slice(&target.to_bytes());
        bytes[COMMAND_CHECKSUM_OFFSET] = checksum(&bytes[PAYLOAD_START..COMMAND_CHECKSUM_OFFSET]);
        bytes[COMMAND_FRAME_LEN - 1] = TAIL;
        CommandFrame { bytes }
    }

    /// Builds a host command carrying `payload`.
    pub fn command(payload: [u8; COMMAND_PAYLOAD_LEN], target: DeviceId) -> Self {
        Self::build(COMMAND_ID, payload, target)
    }

    /// Decodes raw bytes back into a command frame, checking markers and checksum.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; COMMAND_FRAME_LEN] = bytes.try_into().map_err(|_| Error::InvalidFrame)?;
        if bytes[0] != HEAD || bytes[COMMAND_FRAME_LEN - 1] != TAIL {
            return Err(Error::InvalidFrame);
        }
        let frame = CommandFrame { bytes };
        if !frame.is_checksum_valid() {
            return Err(Error::ChecksumMismatch);
        }
        Ok(frame)
    }

    pub fn command_id(&self) -> u8 {
        self.bytes[1]
    }

    pub fn payload(&self) -> [u8; COMMAND_PAYLOAD_LEN] {
        let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
        payload.copy_from_slice(&self.bytes[PAYLOAD_START..COMMAND_DEVICE_OFFSET]);
        payload
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId::from_bytes(
            self.bytes[COMMAND_DEVICE_OFFSET],
            self.bytes[COMMAND_DEVICE_OFFSET + 1],
        )
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[COMMAND_CHECKSUM_OFFSET]
    }

    pub fn is_checksum_valid(&self) -> bool {
        checksum(&self.bytes[PAYLOAD_START..COMMAND_CHECKSUM_OFFSET]) == self.checksum()
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_FRAME_LEN] {
        &self.bytes
    }
}

/// A frame as read from the sensor. Nothing in it is trusted until [`validate`] passes.
///
/// [`validate`]: ResponseFrame::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    bytes: [u8; RESPONSE_FRAME_LEN],
}

impl ResponseFrame {
    pub fn from_bytes(bytes: [u8; RESPONSE_FRAME_LEN]) -> Self {
        ResponseFrame { bytes }
    }

    /// Checks the head and tail markers, then the checksum.
    pub fn validate(&self) -> Result<(), Error> {
        if self.bytes[0] != HEAD || self.bytes[RESPONSE_FRAME_LEN - 1] != TAIL {
            return Err(Error::InvalidFrame);
        }
        if !self.is_checksum_valid() {
            return Err(Error::ChecksumMismatch);
        }
        Ok(())
    }

    pub fn is_checksum_valid(&self) -> bool {
        checksum(&self.bytes[PAYLOAD_START..RESPONSE_CHECKSUM_OFFSET]) == self.checksum()
    }

    /// `REPLY_ID` for settings and firmware replies, `DATA_REPORT_ID` for measurements.
    pub fn response_id(&self) -> u8 {
        self.bytes[1]
    }

    pub fn payload(&self) -> [u8; RESPONSE_PAYLOAD_LEN] {
        let mut payload = [0u8; RESPONSE_PAYLOAD_LEN];
        payload.copy_from_slice(&self.bytes[PAYLOAD_START..RESPONSE_DEVICE_OFFSET]);
        payload
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId::from_bytes(
            self.bytes[RESPONSE_DEVICE_OFFSET],
            self.bytes[RESPONSE_DEVICE_OFFSET + 1],
        )
    }

    pub fn checksum(&self) -> u8 {
        self.bytes[RESPONSE_CHECKSUM_OFFSET]
    }

    pub fn as_bytes(&self) -> &[u8; RESPONSE_FRAME_LEN] {
        &self.bytes
    }

    pub fn settings(&self) -> SettingsPayload {
        SettingsPayload::decode(&self.payload())
    }

    pub fn query(&self) -> QueryPayload {
        QueryPayload::decode(&self.payload())
    }

    pub fn device_info(&self) -> DeviceInfoPayload {
        DeviceInfoPayload::decode(&self.payload())
    }
}

/// Payload shared by settings commands and their replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsPayload {
    /// One of the [`CommandKind`] settings.
    pub command: u8,
    pub operation: Operation,
    pub value: u8,
}

impl SettingsPayload {
    pub fn new(command: CommandKind, operation: Operation, value: u8) -> Self {
        SettingsPayload {
            command: command.as_raw(),
            operation,
            value,
        }
    }

    pub fn encode(&self) -> [u8; COMMAND_PAYLOAD_LEN] {
        let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
        payload[0] = self.command;
        payload[1] = self.operation.to_raw();
        payload[2] = self.value;
        payload
    }

    pub fn decode(payload: &[u8; RESPONSE_PAYLOAD_LEN]) -> Self {
        SettingsPayload {
            command: payload[0],
            operation: Operation::from_raw(payload[1]),
            value: payload[2],
        }
    }
}

/// Raw measurement carried by a data report, in units of 0.1 µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPayload {
    pub pm2_5_raw: u16,
    pub pm10_raw: u16,
}

impl QueryPayload {
    pub fn decode(payload: &[u8; RESPONSE_PAYLOAD_LEN]) -> Self {
        QueryPayload {
            pm2_5_raw: u16::from_le_bytes([payload[0], payload[1]]),
            pm10_raw: u16::from_le_bytes([payload[2], payload[3]]),
        }
    }
}

/// Firmware date carried by a firmware version reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfoPayload {
    pub command: u8,
    pub year: u8,
    pub month: u8,
    pub day: u8,
}

impl DeviceInfoPayload {
    pub fn decode(payload: &[u8; RESPONSE_PAYLOAD_LEN]) -> Self {
        DeviceInfoPayload {
            command: payload[0],
            year: payload[1],
            month: payload[2],
            day: payload[3],
        }
    }
}
