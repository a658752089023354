// HEAD is the byte that marks the beginning of any frame (command or data).
pub const HEAD: u8 = 0xAA;

// TAIL is the byte that marks the end of any frame (command or data).
pub const TAIL: u8 = 0xAB;

// COMMAND_ID is the byte that identifies a command frame sent to the sensor.
pub const COMMAND_ID: u8 = 0xB4;

// DATA_REPORT_ID is the byte that identifies a data report frame received from the sensor.
// This is pushed in active reporting mode and sent as the reply to a query command.
pub const DATA_REPORT_ID: u8 = 0xC0;

// REPLY_ID is the byte that identifies a reply frame received from the sensor
// in response to a settings or firmware command.
pub const REPLY_ID: u8 = 0xC5;

/// Size in bytes of every frame sent to the sensor.
pub const COMMAND_FRAME_LEN: usize = 19;

/// Size in bytes of every frame received from the sensor.
pub const RESPONSE_FRAME_LEN: usize = 10;

/// Size in bytes of the operation-specific part of a command frame.
pub const COMMAND_PAYLOAD_LEN: usize = 13;

/// Size in bytes of the operation-specific part of a response frame.
pub const RESPONSE_PAYLOAD_LEN: usize = 4;

/// Largest accepted working period, in minutes.
pub const MAX_WORKING_PERIOD: u8 = 30;

/// Timeout applied to every exchange unless configured otherwise.
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

/// Pause between two attempts of a poll loop. A 10-byte reply takes about 10 ms at 9600 baud.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 5;

/// First byte of a command payload, selecting what the sensor should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandKind {
    DataReporting = 0x02,
    QueryData = 0x04,
    SetDeviceId = 0x05,
    SleepWork = 0x06,
    FirmwareVersion = 0x07,
    WorkingPeriod = 0x08,
}

impl CommandKind {
    pub const fn as_raw(self) -> u8 {
        self as u8
    }
}
