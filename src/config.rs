use crate::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};

/// Represents the reporting mode of the SDS011 sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ReportingMode {
    /// In Active mode, the sensor automatically pushes data.
    Active,
    /// In Query mode, the sensor only reports data when queried.
    Query,
}

impl ReportingMode {
    pub(crate) fn to_raw(self) -> u8 {
        match self {
            ReportingMode::Active => 0x00,
            ReportingMode::Query => 0x01,
        }
    }

    pub(crate) fn from_raw(value: u8) -> Self {
        if value == 0x00 {
            ReportingMode::Active
        } else {
            ReportingMode::Query
        }
    }
}

/// Represents the operational state of the sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum SleepMode {
    /// Fan and laser off.
    Sleep,
    /// Sensor is actively taking measurements.
    Work,
}

impl SleepMode {
    pub(crate) fn to_raw(self) -> u8 {
        match self {
            SleepMode::Sleep => 0x00,
            SleepMode::Work => 0x01,
        }
    }

    pub(crate) fn from_raw(value: u8) -> Self {
        if value == 0x01 {
            SleepMode::Work
        } else {
            SleepMode::Sleep
        }
    }
}

/// Whether a settings command reads or writes the setting.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Operation {
    Query,
    Set,
}

impl Operation {
    pub(crate) fn to_raw(self) -> u8 {
        match self {
            Operation::Query => 0x00,
            Operation::Set => 0x01,
        }
    }

    pub(crate) fn from_raw(value: u8) -> Self {
        if value == 0x01 {
            Operation::Set
        } else {
            Operation::Query
        }
    }
}

/// Represents the unique identifier of the SDS011 sensor.
///
/// On the wire the id is little-endian, so the value is byte-swapped compared to the
/// datasheet notation.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub struct DeviceId(pub u16);

impl DeviceId {
    /// Addresses whichever sensor is on the line.
    pub const ANY: DeviceId = DeviceId(0xFFFF);

    /// Builds an id from its two wire bytes, in transmission order.
    pub const fn from_bytes(id1: u8, id2: u8) -> Self {
        DeviceId(u16::from_le_bytes([id1, id2]))
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::ANY.0
    }
}

impl Default for DeviceId {
    /// Returns the broadcast id.
    fn default() -> DeviceId {
        DeviceId::ANY
    }
}

impl From<u16> for DeviceId {
    fn from(id: u16) -> Self {
        DeviceId(id)
    }
}

/// Configuration settings for the SDS011 driver.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The device ID addressed by `init` and `read_sample`.
    pub id: DeviceId,
    /// The reporting mode applied by `init`.
    pub mode: ReportingMode,
    /// The working period (minutes, 0 = continuous) applied by `init`.
    pub working_period: u8,
    /// How long a single exchange may take, in milliseconds.
    pub timeout_ms: u32,
    /// How long to wait between two attempts while polling the stream, in milliseconds.
    /// `0` only yields to the executor.
    pub poll_interval_ms: u32,
}

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `id` - The `DeviceId` for the sensor.
    /// * `mode` - The `ReportingMode` for the sensor.
    ///
    /// # Returns
    ///
    /// A new `Config` instance with the specified ID and mode and default timings.
    pub fn new(id: DeviceId, mode: ReportingMode) -> Config {
        Config {
            id,
            mode,
            ..Config::default()
        }
    }
    /// Sets the device ID for the configuration.
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = id;
        self
    }
    /// Sets the reporting mode for the configuration.
    pub fn mode(mut self, mode: ReportingMode) -> Self {
        self.mode = mode;
        self
    }
    /// Sets the working period for the configuration.
    ///
    /// The value is range-checked when `init` sends it, not here.
    pub fn working_period(mut self, minutes: u8) -> Self {
        self.working_period = minutes;
        self
    }
    /// Sets the exchange timeout for the configuration.
    pub fn timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
    /// Sets the pause between two poll attempts.
    pub fn poll_interval_ms(mut self, poll_interval_ms: u32) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }
}

/// Provides default configuration values for the SDS011 sensor.
impl Default for Config {
    /// Returns the default configuration.
    ///
    /// The default configuration addresses `0xFFFF`, uses `Active` mode with continuous
    /// working period, a timeout of one second and a 5 ms poll interval.
    fn default() -> Config {
        Config {
            id: DeviceId::default(),
            mode: ReportingMode::Active,
            working_period: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}
