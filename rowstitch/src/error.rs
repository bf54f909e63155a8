//! `rowstitch` error types.
use std::{backtrace::Backtrace, borrow::Cow, fmt};

use crate::{
    common::unit_error,
    retry::Status,
    row::DecodeError,
};

/// A specialized [`Result`] type for `rowstitch` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `rowstitch` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the remote call status if this error came from the remote call.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Status(status) => Some(status),
            _ => None,
        }
    }

    pub(crate) fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub(crate) fn protocol(reason: impl Into<Cow<'static, str>>) -> Self {
        ProtocolError { reason: reason.into() }.into()
    }
}

/// All possible error kind from `rowstitch` library.
pub enum ErrorKind {
    /// The remote call failed and was not retried.
    Status(Status),
    /// The remote call returned a malformed result.
    Protocol(ProtocolError),
    /// The consumer did not accept data in time.
    Backpressure(BackpressureError),
    /// A row could not be converted.
    Decode(DecodeError),
    /// The receiving side was dropped.
    Closed(ClosedError),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<Status>e => ErrorKind::Status(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<BackpressureError>e => ErrorKind::Backpressure(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<ClosedError>e => ErrorKind::Closed(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(e) => fmt::Display::fmt(e, f),
            Self::Protocol(e) => fmt::Display::fmt(e, f),
            Self::Backpressure(e) => fmt::Display::fmt(e, f),
            Self::Decode(e) => fmt::Display::fmt(e, f),
            Self::Closed(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// The remote call returned a result that cannot be assembled into rows.
pub struct ProtocolError {
    pub(crate) reason: Cow<'static,str>,
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed partial result: {}", self.reason)
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// The consumer stayed full for every probe.
pub struct BackpressureError {
    pub(crate) retries: u32,
}

impl std::error::Error for BackpressureError { }

impl fmt::Display for BackpressureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer not ready after {} resume attempts", self.retries)
    }
}

impl fmt::Debug for BackpressureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

unit_error! {
    /// The receiving side of a forwarded stream was dropped.
    pub struct ClosedError("receiver closed");
}
