use core::fmt;

/// Every way an exchange with the sensor can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The full command could not be written before the deadline.
    TransportWriteTimeout,
    /// No complete response frame arrived before the deadline.
    TransportReadTimeout,
    /// The received frame's checksum does not match its contents.
    ChecksumMismatch,
    /// The sensor answered, but not with the setting or id that was requested.
    ResponseCorrelationMismatch,
    /// An argument was rejected before anything was sent.
    InvalidArgument,
    /// The received frame does not end with the tail marker.
    InvalidFrame,
    /// The received frame is of a kind that does not carry the requested data.
    UnexpectedReply,
    /// The underlying stream reported an error while writing.
    WriteFailure,
    /// The underlying stream reported an error or a short read while reading.
    ReadFailure,
}

impl Error {
    /// Whether the failure only means that the sensor stayed silent.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::TransportWriteTimeout | Error::TransportReadTimeout
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::TransportWriteTimeout => "timed out writing command frame",
            Error::TransportReadTimeout => "timed out waiting for response frame",
            Error::ChecksumMismatch => "response frame checksum mismatch",
            Error::ResponseCorrelationMismatch => "response does not match the request",
            Error::InvalidArgument => "invalid argument",
            Error::InvalidFrame => "malformed frame",
            Error::UnexpectedReply => "unexpected reply kind",
            Error::WriteFailure => "serial write failure",
            Error::ReadFailure => "serial read failure",
        };
        f.write_str(msg)
    }
}
