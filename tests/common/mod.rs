#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorType, Read, ReadReady, Write};
use sds011_nostd_rs::frame::checksum;
use sds011_nostd_rs::{Stream, DATA_REPORT_ID, HEAD, REPLY_ID, TAIL};

/// In-memory stream that records what the driver does with it.
///
/// Each complete write pops the next queued reply into the receive side, the way the
/// sensor answers a command.
#[derive(Default)]
pub struct MockStream {
    pub rx: VecDeque<u8>,
    pub replies: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub write_calls: usize,
    pub peek_calls: usize,
    /// Number of upcoming writes that accept nothing.
    pub stalled_writes: usize,
    /// Total number of bytes the port takes before it stops accepting writes.
    pub write_capacity: Option<usize>,
}

impl MockStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rx(bytes: &[u8]) -> Self {
        let mut stream = Self::default();
        stream.rx.extend(bytes);
        stream
    }

    pub fn reply(mut self, frame: Vec<u8>) -> Self {
        self.replies.push_back(frame);
        self
    }

    /// The commands written so far, split into frames.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.written.chunks(19).map(|c| c.to_vec()).collect()
    }
}

impl ErrorType for MockStream {
    type Error = Infallible;
}

impl Stream for MockStream {
    async fn available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.rx.len())
    }

    async fn peek(&mut self) -> Result<Option<u8>, Self::Error> {
        self.peek_calls += 1;
        Ok(self.rx.front().copied())
    }

    async fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.rx.pop_front())
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.write_calls += 1;
        if self.stalled_writes > 0 {
            self.stalled_writes -= 1;
            return Ok(0);
        }
        let n = match self.write_capacity {
            Some(capacity) => buf.len().min(capacity.saturating_sub(self.written.len())),
            None => buf.len(),
        };
        self.written.extend_from_slice(&buf[..n]);
        if n == buf.len() {
            if let Some(reply) = self.replies.pop_front() {
                self.rx.extend(reply);
            }
        }
        Ok(n)
    }
}

/// Clock that moves forward by `step` ms every time it is read.
///
/// The returned cell shows the current time without advancing it.
pub fn stepping_clock(step: u64) -> (Rc<Cell<u64>>, impl Fn() -> u64) {
    let now = Rc::new(Cell::new(0));
    let handle = now.clone();
    let clock = move || {
        let t = now.get();
        now.set(t + step);
        t
    };
    (handle, clock)
}

/// Delay that moves the shared clock forward instead of sleeping, and counts its calls.
pub struct MockDelay {
    now: Rc<Cell<u64>>,
    calls: Rc<Cell<usize>>,
}

impl MockDelay {
    pub fn new(now: &Rc<Cell<u64>>) -> Self {
        Self {
            now: now.clone(),
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Call counter that stays readable after the delay moved into the driver.
    pub fn calls(&self) -> Rc<Cell<usize>> {
        self.calls.clone()
    }

    fn advance(&mut self, ms: u64) {
        self.calls.set(self.calls.get() + 1);
        self.now.set(self.now.get() + ms);
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.advance(u64::from(ns).div_ceil(1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

/// `embedded-io-async` serial port whose replies arrive a few bytes at a time.
///
/// After each write the next queued reply is cut into `chunk`-byte pieces, the n-th
/// piece becoming readable `n * gap_ms` after the write on the shared clock.
pub struct TricklingSerial {
    now: Rc<Cell<u64>>,
    chunk: usize,
    gap_ms: u64,
    replies: VecDeque<Vec<u8>>,
    in_flight: VecDeque<(u64, u8)>,
    rx: VecDeque<u8>,
    pub written: Vec<u8>,
}

impl TricklingSerial {
    pub fn new(now: &Rc<Cell<u64>>, chunk: usize, gap_ms: u64) -> Self {
        Self {
            now: now.clone(),
            chunk,
            gap_ms,
            replies: VecDeque::new(),
            in_flight: VecDeque::new(),
            rx: VecDeque::new(),
            written: Vec::new(),
        }
    }

    pub fn reply(mut self, frame: Vec<u8>) -> Self {
        self.replies.push_back(frame);
        self
    }
}

impl ErrorType for TricklingSerial {
    type Error = Infallible;
}

impl ReadReady for TricklingSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let now = self.now.get();
        while let Some(&(at, byte)) = self.in_flight.front() {
            if at > now {
                break;
            }
            self.rx.push_back(byte);
            self.in_flight.pop_front();
        }
        Ok(!self.rx.is_empty())
    }
}

impl Read for TricklingSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for TricklingSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        if let Some(reply) = self.replies.pop_front() {
            let sent_at = self.now.get();
            for (i, piece) in reply.chunks(self.chunk).enumerate() {
                let at = sent_at + (i as u64 + 1) * self.gap_ms;
                self.in_flight.extend(piece.iter().map(|&b| (at, b)));
            }
        }
        Ok(buf.len())
    }
}

pub fn response(kind: u8, payload: [u8; 4], id: [u8; 2]) -> Vec<u8> {
    let mut bytes = vec![HEAD, kind];
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&id);
    bytes.push(checksum(&bytes[2..8]));
    bytes.push(TAIL);
    bytes
}

pub fn settings_reply(command: u8, operation: u8, value: u8) -> Vec<u8> {
    response(REPLY_ID, [command, operation, value, 0x00], [0xA1, 0x60])
}

pub fn data_report(pm2_5: [u8; 2], pm10: [u8; 2]) -> Vec<u8> {
    response(
        DATA_REPORT_ID,
        [pm2_5[0], pm2_5[1], pm10[0], pm10[1]],
        [0xA1, 0x60],
    )
}
