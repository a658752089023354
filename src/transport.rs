use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};

use crate::constants::{HEAD, RESPONSE_FRAME_LEN};
use crate::error::Error;
use crate::frame::{CommandFrame, ResponseFrame};
use crate::stream::{Clock, Deadline, Stream};
use crate::Sds011;

impl<S, C, D> Sds011<S, C, D>
where
    S: Stream,
    C: Clock,
    D: DelayNs,
{
    /// Writes `frame` to the stream.
    ///
    /// A stream that accepts nothing is retried every poll interval until `deadline`.
    /// At least one attempt is made even if the deadline has already passed.
    pub async fn send_frame(
        &mut self,
        frame: &CommandFrame,
        deadline: Deadline,
    ) -> Result<(), Error> {
        let bytes = frame.as_bytes();
        let mut written = 0;

        loop {
            let n = self.stream.write(&bytes[written..]).await.map_err(|e| {
                warn!("Serial write error: {:?}", e);
                Error::WriteFailure
            })?;
            written += n;

            if written == bytes.len() {
                self.stream.flush().await.map_err(|e| {
                    warn!("Serial flush error: {:?}", e);
                    Error::WriteFailure
                })?;
                debug!("SDS011 send: {:02X?}", bytes);
                return Ok(());
            }

            if n == 0 {
                if deadline.is_expired(&self.clock) {
                    break;
                }
                self.wait_poll_interval().await;
            }
        }

        warn!(
            "Failed to send command, {} of {} bytes written before deadline",
            written,
            bytes.len()
        );
        Err(Error::TransportWriteTimeout)
    }

    /// Discards buffered bytes up to the next frame head.
    ///
    /// Returns `true` when a head byte is left peekable, `false` when the stream ran dry.
    /// Discarded bytes are line noise or leftovers of frames nobody asked for and are
    /// never reported as an error.
    pub async fn seek_frame_start(&mut self) -> Result<bool, Error> {
        let mut discarded = 0usize;
        let found = loop {
            match self.stream.peek().await.map_err(read_failure)? {
                Some(HEAD) => break true,
                Some(_) => {
                    self.stream.read_byte().await.map_err(read_failure)?;
                    discarded += 1;
                }
                None => break false,
            }
        };

        if discarded > 0 {
            debug!("Discarded {} byte(s) before frame head", discarded);
        }
        Ok(found)
    }

    /// Waits for a frame head followed by a full response frame and reads it.
    ///
    /// The frame is returned as read; checking its markers and checksum is up to the
    /// caller. Attempts are one poll interval apart, and the last one happens at or after
    /// `deadline`, so a deadline that is already due turns this into a single poll.
    pub async fn receive_frame(&mut self, deadline: Deadline) -> Result<ResponseFrame, Error> {
        loop {
            if self.seek_frame_start().await?
                && self.stream.available().await.map_err(read_failure)? >= RESPONSE_FRAME_LEN
            {
                let mut bytes = [0u8; RESPONSE_FRAME_LEN];
                let n = self
                    .stream
                    .read_bytes(&mut bytes)
                    .await
                    .map_err(read_failure)?;
                if n != RESPONSE_FRAME_LEN {
                    warn!("Short read: {} of {} bytes", n, RESPONSE_FRAME_LEN);
                    return Err(Error::ReadFailure);
                }
                debug!("SDS011 recv: {:02X?}", bytes);
                return Ok(ResponseFrame::from_bytes(bytes));
            }

            if deadline.is_expired(&self.clock) {
                break;
            }
            self.wait_poll_interval().await;
        }

        debug!("No response frame before deadline");
        Err(Error::TransportReadTimeout)
    }

    async fn wait_poll_interval(&mut self) {
        match self.config.poll_interval_ms {
            0 => yield_now().await,
            ms => self.delay.delay_ms(ms).await,
        }
    }
}

fn read_failure<E: core::fmt::Debug>(e: E) -> Error {
    warn!("Serial read error: {:?}", e);
    Error::ReadFailure
}
