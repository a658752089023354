use embedded_io_async::{ErrorType, Read, ReadReady, Write};
use log::trace;

use crate::stream::Stream;

const BUF_LEN: usize = 32;

/// Adapts an `embedded-io-async` serial port to [`Stream`].
///
/// Bytes are pulled from the port into a small ring buffer only while the port reports
/// `read_ready()`, so `available()` and `peek()` never wait on the line. Whatever does
/// not fit in the ring stays in the port until the driver consumes buffered bytes.
pub struct BufferedSerial<S> {
    serial: S,
    buf: [u8; BUF_LEN],
    start: usize,
    len: usize,
}

impl<S> BufferedSerial<S>
where
    S: Read + Write + ReadReady,
{
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            buf: [0; BUF_LEN],
            start: 0,
            len: 0,
        }
    }

    /// Gives the port back. Buffered bytes are dropped.
    pub fn release(self) -> S {
        self.serial
    }

    async fn fill(&mut self) -> Result<(), S::Error> {
        while self.len < BUF_LEN && self.serial.read_ready()? {
            if self.len == 0 {
                self.start = 0;
            }
            let end = (self.start + self.len) % BUF_LEN;
            let free_end = if end >= self.start { BUF_LEN } else { self.start };
            let n = self.serial.read(&mut self.buf[end..free_end]).await?;
            if n == 0 {
                break;
            }
            trace!("Buffered {} byte(s) from serial", n);
            self.len += n;
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.start];
        self.start = (self.start + 1) % BUF_LEN;
        self.len -= 1;
        Some(byte)
    }
}

impl<S: ErrorType> ErrorType for BufferedSerial<S> {
    type Error = S::Error;
}

impl<S> Stream for BufferedSerial<S>
where
    S: Read + Write + ReadReady,
{
    async fn available(&mut self) -> Result<usize, Self::Error> {
        self.fill().await?;
        Ok(self.len)
    }

    async fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        self.fill().await?;
        Ok((self.len > 0).then(|| self.buf[self.start]))
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        self.fill().await?;
        Ok(self.pop())
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        while count < buf.len() {
            if self.len == 0 {
                self.fill().await?;
            }
            match self.pop() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.serial.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.serial.flush().await
    }
}
