use embedded_io_async::ErrorType;

/// Byte stream the driver talks to the sensor through.
///
/// Unlike `embedded_io_async::Read`, the receive side must expose how much is already
/// buffered and let the driver look at the next byte without consuming it; that is
/// what frame resynchronization is built on. [`BufferedSerial`](crate::BufferedSerial)
/// provides these on top of any `embedded-io-async` serial port.
///
/// None of the receive methods may wait for data to arrive.
#[allow(async_fn_in_trait)]
pub trait Stream: ErrorType {
    /// Number of bytes that can be read right now.
    async fn available(&mut self) -> Result<usize, Self::Error>;

    /// Next byte, left in the stream.
    async fn peek(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Next byte, removed from the stream.
    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Moves up to `buf.len()` buffered bytes into `buf` and returns how many were moved.
    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Writes as much of `buf` as the stream accepts; `Ok(0)` means "try again later".
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: Stream + ?Sized> Stream for &mut T {
    async fn available(&mut self) -> Result<usize, Self::Error> {
        T::available(self).await
    }

    async fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        T::peek(self).await
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        T::read_byte(self).await
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read_bytes(self, buf).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        T::write(self, buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self).await
    }
}

/// Monotonic millisecond counter used for deadlines.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<F: Fn() -> u64> Clock for F {
    fn now_ms(&self) -> u64 {
        self()
    }
}

/// Point in time after which a poll loop gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: u64,
}

impl Deadline {
    pub fn after<C: Clock>(clock: &C, timeout_ms: u32) -> Self {
        Deadline {
            at: clock.now_ms().saturating_add(u64::from(timeout_ms)),
        }
    }

    pub fn is_expired<C: Clock>(&self, clock: &C) -> bool {
        clock.now_ms() >= self.at
    }
}
