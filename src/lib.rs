#![cfg_attr(not(test), no_std)]

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, warn};

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

pub mod frame;
use frame::{CommandFrame, ResponseFrame, SettingsPayload};

mod stream;
pub use stream::*;

mod buffered;
pub use buffered::BufferedSerial;

mod transport;

/// Represents an SDS011 air quality sensor.
///
/// Every operation is one command/response exchange bounded by the configured timeout.
/// Retrying a failed exchange is left to the caller. The driver is not reentrant: one
/// operation at a time per instance, one instance per physical sensor.
///
/// # Type Parameters
///
/// * `S`: The [`Stream`] used to talk to the sensor, owned or borrowed (`&mut T`).
/// * `C`: The monotonic [`Clock`] deadlines are measured against.
/// * `D`: The `embedded_hal_async` delay used to pause between poll attempts.
pub struct Sds011<S, C, D> {
    stream: S,
    clock: C,
    delay: D,
    config: Config,
}

/// A single measurement read from the SDS011 sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmReading {
    /// PM2.5 concentration in µg/m³.
    pub pm2_5: f32,
    /// PM10 concentration in µg/m³.
    pub pm10: f32,
    /// The sensor that reported it.
    pub device_id: DeviceId,
}

/// Firmware date and identity reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Two-digit year.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub device_id: DeviceId,
}

impl<S, C, D> Sds011<S, C, D>
where
    S: Stream,
    C: Clock,
    D: DelayNs,
{
    /// Creates a new `Sds011` sensor instance.
    ///
    /// Nothing is sent to the sensor; see [`init`](Self::init).
    pub fn new(stream: S, clock: C, delay: D, config: Config) -> Self {
        Self {
            stream,
            clock,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Changes the timeout applied to subsequent exchanges.
    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.config.timeout_ms = timeout_ms;
    }

    /// Gives back the stream, the clock and the delay.
    pub fn release(self) -> (S, C, D) {
        (self.stream, self.clock, self.delay)
    }

    /// Runs the startup handshake against the configured device id.
    ///
    /// This involves:
    /// - Reading the firmware date, which fails fast if the sensor is absent.
    /// - Setting the configured working period.
    /// - Setting the configured reporting mode.
    /// - Waking the sensor up.
    ///
    /// The first failing step aborts the sequence.
    pub async fn init(&mut self) -> Result<DeviceInfo, Error> {
        let id = self.config.id;

        let info = self.get_device_info(id).await.map_err(|e| {
            error!("Failed to retrieve SDS011 device info during init: {:?}", e);
            e
        })?;

        let period = self.config.working_period;
        self.set_working_period(period, id).await.map_err(|e| {
            error!(
                "Failed to set working period to {} during init: {:?}",
                period, e
            );
            e
        })?;

        let mode = self.config.mode;
        self.set_reporting_mode(mode, id).await.map_err(|e| {
            error!(
                "Failed to set reporting mode to {:?} during init: {:?}",
                mode, e
            );
            e
        })?;

        self.set_sleep_mode(SleepMode::Work, id)
            .await
            .map_err(|e| {
                error!("Failed to wake sensor during init: {:?}", e);
                e
            })?;

        debug!(
            "SDS011 init sequence complete, firmware {}-{}-{}, id {:04X}",
            info.year, info.month, info.day, info.device_id.0
        );
        Ok(info)
    }

    /// Reads one measurement the way the configured reporting mode expects.
    ///
    /// In Query mode a query command is sent to the configured id; in Active mode the
    /// next pushed report is picked up if one is already waiting.
    pub async fn read_sample(&mut self) -> Result<PmReading, Error> {
        match self.config.mode {
            ReportingMode::Query => self.query(self.config.id).await,
            ReportingMode::Active => self.read().await,
        }
    }

    /// Sets the sensor's reporting mode (Active or Query).
    pub async fn set_reporting_mode(
        &mut self,
        mode: ReportingMode,
        id: DeviceId,
    ) -> Result<(), Error> {
        debug!("Setting reporting mode to: {:?}", mode);
        self.get_set_setting(
            CommandKind::DataReporting,
            Operation::Set,
            mode.to_raw(),
            id,
        )
        .await?;
        self.config.mode = mode;
        Ok(())
    }

    /// Queries the sensor's current reporting mode.
    pub async fn get_reporting_mode(&mut self, id: DeviceId) -> Result<ReportingMode, Error> {
        let reply = self
            .get_set_setting(CommandKind::DataReporting, Operation::Query, 0, id)
            .await?;
        let mode = ReportingMode::from_raw(reply.value);
        debug!("Queried reporting mode: {:?}", mode);
        Ok(mode)
    }

    /// Puts the sensor to sleep or wakes it up.
    pub async fn set_sleep_mode(&mut self, mode: SleepMode, id: DeviceId) -> Result<(), Error> {
        debug!("Setting sleep mode to: {:?}", mode);
        self.get_set_setting(CommandKind::SleepWork, Operation::Set, mode.to_raw(), id)
            .await?;
        Ok(())
    }

    /// Queries whether the sensor is sleeping or working.
    pub async fn get_sleep_mode(&mut self, id: DeviceId) -> Result<SleepMode, Error> {
        let reply = self
            .get_set_setting(CommandKind::SleepWork, Operation::Query, 0, id)
            .await?;
        let mode = SleepMode::from_raw(reply.value);
        debug!("Queried sleep mode: {:?}", mode);
        Ok(mode)
    }

    /// Sets the sensor's working period.
    ///
    /// - A value of `0` sets the sensor to continuous working mode.
    /// - Values from `1` to `30` make the sensor work for 30 seconds, then sleep for the rest
    ///   of the `period` minutes, reporting data once per period.
    ///
    /// # Returns
    ///
    /// * `Err(Error::InvalidArgument)` if `period` is greater than 30; nothing is sent.
    pub async fn set_working_period(&mut self, period: u8, id: DeviceId) -> Result<(), Error> {
        if period > MAX_WORKING_PERIOD {
            error!(
                "Working period {} out of range (0-{})",
                period, MAX_WORKING_PERIOD
            );
            return Err(Error::InvalidArgument);
        }
        debug!("Setting working period to: {} minutes", period);
        self.get_set_setting(CommandKind::WorkingPeriod, Operation::Set, period, id)
            .await?;
        Ok(())
    }

    /// Queries the sensor's current working period, in minutes (0 = continuous).
    pub async fn get_working_period(&mut self, id: DeviceId) -> Result<u8, Error> {
        let reply = self
            .get_set_setting(CommandKind::WorkingPeriod, Operation::Query, 0, id)
            .await?;
        debug!("Queried working period: {} minutes", reply.value);
        Ok(reply.value)
    }

    /// Changes the id of the sensor addressed by `id`.
    ///
    /// The sensor confirms by replying from its new id. If `id` is the configured id,
    /// the configuration follows the change.
    pub async fn set_device_id(&mut self, new_id: DeviceId, id: DeviceId) -> Result<(), Error> {
        debug!("Setting device ID to: {:04X}", new_id.0);
        let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
        payload[0] = CommandKind::SetDeviceId.as_raw();
        payload[COMMAND_PAYLOAD_LEN - 2..].copy_from_slice(&new_id.to_bytes());

        let response = self.exchange(payload, id).await?;
        expect_kind(&response, REPLY_ID)?;
        if response.payload()[0] != CommandKind::SetDeviceId.as_raw()
            || response.device_id() != new_id
        {
            warn!(
                "Failed to set device ID, unexpected reply: {:02X?}",
                response.as_bytes()
            );
            return Err(Error::ResponseCorrelationMismatch);
        }

        if id == self.config.id {
            self.config.id = new_id;
        }
        Ok(())
    }

    /// Retrieves the firmware date and the id of the sensor.
    ///
    /// Meant as a startup liveness check.
    pub async fn get_device_info(&mut self, id: DeviceId) -> Result<DeviceInfo, Error> {
        debug!("Getting firmware version (CMD 0x07)");
        let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
        payload[0] = CommandKind::FirmwareVersion.as_raw();

        let response = self.exchange(payload, id).await?;
        expect_kind(&response, REPLY_ID)?;
        let version = response.device_info();
        if version.command != CommandKind::FirmwareVersion.as_raw() {
            warn!(
                "get_device_info: Unexpected reply structure: {:02X?}",
                response.as_bytes()
            );
            return Err(Error::ResponseCorrelationMismatch);
        }

        let info = DeviceInfo {
            year: version.year,
            month: version.month,
            day: version.day,
            device_id: response.device_id(),
        };
        debug!(
            "Firmware version: 20{}-{}-{}, id {:04X}",
            info.year, info.month, info.day, info.device_id.0
        );
        Ok(info)
    }

    /// Asks the sensor for a measurement and waits for it.
    pub async fn query(&mut self, id: DeviceId) -> Result<PmReading, Error> {
        debug!("Querying sensor data (CMD 0x04)");
        let mut payload = [0u8; COMMAND_PAYLOAD_LEN];
        payload[0] = CommandKind::QueryData.as_raw();

        let response = self.exchange(payload, id).await?;
        pm_reading(&response)
    }

    /// Picks up a report the sensor pushed on its own, without sending anything.
    ///
    /// Makes exactly one receive attempt; use [`read_with_timeout`](Self::read_with_timeout)
    /// to wait for the next report.
    pub async fn read(&mut self) -> Result<PmReading, Error> {
        self.read_with_timeout(0).await
    }

    /// Waits up to `timeout_ms` for a report the sensor pushed on its own.
    pub async fn read_with_timeout(&mut self, timeout_ms: u32) -> Result<PmReading, Error> {
        let deadline = Deadline::after(&self.clock, timeout_ms);
        let response = self.receive_frame(deadline).await?;
        validate(&response)?;
        pm_reading(&response)
    }

    // Sends a settings command and checks that the reply is about the same setting and
    // operation and, for a set, carries the value that was sent.
    async fn get_set_setting(
        &mut self,
        kind: CommandKind,
        operation: Operation,
        value: u8,
        id: DeviceId,
    ) -> Result<SettingsPayload, Error> {
        let request = SettingsPayload::new(kind, operation, value);
        let response = self.exchange(request.encode(), id).await?;
        expect_kind(&response, REPLY_ID)?;

        let reply = response.settings();
        if reply.command != request.command
            || reply.operation != request.operation
            || (operation == Operation::Set && reply.value != request.value)
        {
            warn!(
                "Reply does not match {:?} {:?} {}: {:02X?}",
                operation,
                kind,
                value,
                response.as_bytes()
            );
            return Err(Error::ResponseCorrelationMismatch);
        }

        // The reply's id is not checked against `id`.
        if !id.is_broadcast() && response.device_id() != id {
            debug!(
                "Reply came from {:04X} while addressing {:04X}",
                response.device_id().0,
                id.0
            );
        }
        Ok(reply)
    }

    // One command/response exchange; send and receive share a single deadline.
    async fn exchange(
        &mut self,
        payload: [u8; COMMAND_PAYLOAD_LEN],
        id: DeviceId,
    ) -> Result<ResponseFrame, Error> {
        let command = CommandFrame::command(payload, id);
        let deadline = Deadline::after(&self.clock, self.config.timeout_ms);
        self.send_frame(&command, deadline).await?;
        let response = self.receive_frame(deadline).await?;
        validate(&response)?;
        Ok(response)
    }
}

fn validate(response: &ResponseFrame) -> Result<(), Error> {
    response.validate().map_err(|e| {
        warn!(
            "Dropping invalid frame ({:?}): {:02X?}",
            e,
            response.as_bytes()
        );
        e
    })
}

fn expect_kind(response: &ResponseFrame, kind: u8) -> Result<(), Error> {
    if response.response_id() == kind {
        Ok(())
    } else {
        warn!(
            "Frame has unexpected command ID: {:02X} (Expected {:02X})",
            response.response_id(),
            kind
        );
        Err(Error::UnexpectedReply)
    }
}

fn pm_reading(response: &ResponseFrame) -> Result<PmReading, Error> {
    expect_kind(response, DATA_REPORT_ID)?;
    let raw = response.query();
    let reading = PmReading {
        pm2_5: f32::from(raw.pm2_5_raw) / 10.0,
        pm10: f32::from(raw.pm10_raw) / 10.0,
        device_id: response.device_id(),
    };
    debug!(
        "Processed frame - PM2.5: {}, PM10: {}",
        reading.pm2_5, reading.pm10
    );
    Ok(reading)
}
