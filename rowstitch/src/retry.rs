//! Remote call status and retry classification.
use std::{borrow::Cow, fmt};

/// gRPC status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the remote call.
#[derive(Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    message: Cow<'static,str>,
}

impl Status {
    pub fn new(code: Code, message: impl Into<Cow<'static,str>>) -> Self {
        Self { code, message: message.into() }
    }

    pub const fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for Status { }

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// `INTERNAL` messages produced by a broken transport rather than the server.
const RETRYABLE_INTERNAL: [&str; 4] = [
    "Received unexpected EOS on DATA frame from server",
    "RST_STREAM",
    "HTTP/2 error code: INTERNAL_ERROR",
    "Connection closed with unknown cause",
];

/// Decide whether a failed remote call can be reissued.
///
/// The distance from the last checkpoint is not part of the policy, the
/// stream checks it separately.
#[derive(Clone)]
pub struct RetryPolicy {
    codes: Vec<Code>,
    internal: fn(&Status) -> bool,
}

impl RetryPolicy {
    /// A policy with no retryable codes and no internal predicate.
    pub fn never() -> Self {
        Self { codes: vec![], internal: |_| false }
    }

    /// Set the codes that are always retryable.
    pub fn codes(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.codes = codes.into_iter().collect();
        self
    }

    /// Set the predicate for retryable errors outside of [`codes`][RetryPolicy::codes].
    pub fn internal(mut self, predicate: fn(&Status) -> bool) -> Self {
        self.internal = predicate;
        self
    }

    pub fn is_retryable(&self, status: &Status) -> bool {
        self.codes.contains(&status.code) || (self.internal)(status)
    }
}

/// Transport-level `INTERNAL` errors are safe to retry.
pub fn is_retryable_internal(status: &Status) -> bool {
    status.code == Code::Internal
        && RETRYABLE_INTERNAL.iter().any(|msg| status.message.contains(msg))
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            codes: vec![Code::Unavailable],
            internal: is_retryable_internal,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy").field("codes", &self.codes).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::{Code, RetryPolicy, Status};

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&Status::new(Code::Unavailable, "try again")));
        assert!(policy.is_retryable(&Status::new(
            Code::Internal,
            "Received RST_STREAM with code 2",
        )));
        assert!(!policy.is_retryable(&Status::new(Code::Internal, "assertion failed")));
        assert!(!policy.is_retryable(&Status::new(Code::InvalidArgument, "bad sql")));
        assert!(!policy.is_retryable(&Status::new(Code::Unknown, "RST_STREAM")));
    }

    #[test]
    fn custom_policy() {
        let policy = RetryPolicy::never().codes([Code::Aborted]);
        assert!(policy.is_retryable(&Status::new(Code::Aborted, "")));
        assert!(!policy.is_retryable(&Status::new(Code::Unavailable, "")));
        assert!(!policy.is_retryable(&Status::new(Code::Internal, "RST_STREAM")));
    }
}
