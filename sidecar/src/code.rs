/// Numeric call outcome carried in the `grpc-status` trailer.
///
/// Values mirror the gRPC status code space so peers agree on meaning by
/// convention. `Unmapped` is the maximum sentinel used when a received status
/// cannot be parsed; it is never written by this crate's server.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::FromRepr,
)]
#[strum(serialize_all = "snake_case")]
#[repr(i32)]
pub enum Code {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
    Unmapped = 17,
}

impl Code {
    /// Maps a wire value onto the enumeration; anything outside it becomes `Unmapped`.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unmapped)
    }

    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "the operation completed successfully",
            Self::Cancelled => "the operation was cancelled",
            Self::Unknown => "unknown error",
            Self::InvalidArgument => "client specified an invalid argument",
            Self::DeadlineExceeded => "deadline expired before operation could complete",
            Self::NotFound => "some requested entity was not found",
            Self::AlreadyExists => "some entity that we attempted to create already exists",
            Self::PermissionDenied => {
                "the caller does not have permission to execute the specified operation"
            }
            Self::ResourceExhausted => "some resource has been exhausted",
            Self::FailedPrecondition => {
                "the system is not in a state required for the operation's execution"
            }
            Self::Aborted => "the operation was aborted",
            Self::OutOfRange => "operation was attempted past the valid range",
            Self::Unimplemented => "operation is not implemented or not supported",
            Self::Internal => "internal error",
            Self::Unavailable => "the service is currently unavailable",
            Self::DataLoss => "unrecoverable data loss or corruption",
            Self::Unauthenticated => "the request does not have valid authentication credentials",
            Self::Unmapped => "status code could not be mapped",
        }
    }

    /// Code for a non-200 HTTP response that carried no `grpc-status`.
    #[must_use]
    pub fn from_http_status(status: http::StatusCode) -> Self {
        match status.as_u16() {
            200 => Self::Ok,
            400 => Self::Internal,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::Unimplemented,
            429 | 502 | 503 | 504 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}
