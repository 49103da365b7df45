use crate::{Code, Status};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidAddress,
    InvalidMethodPath,
    RequestBuild,
    Tls,
    Request,
    BodyRead,
    Io,
    Compression,
    Truncated,
    MessageTooLarge,
    Encode,
    Decode,
    MissingMessage,
    Closed,
    Cancelled,
    TaskFailed,
    Status,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid address '{0}' (expected HOST:PORT or unix:SOCKET)")]
    InvalidAddress(String),

    #[error("invalid method path '{0}' (expected /package.Service/Method)")]
    InvalidMethodPath(String),

    #[error("http request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("tls configuration failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("http request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read body: {0}")]
    BodyRead(#[from] hyper::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported compression byte {0}")]
    Compression(u8),

    #[error("truncated frame: expected {expected} payload bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("message of {0} bytes exceeds the frame length limit")]
    MessageTooLarge(usize),

    #[error("failed to encode message: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("response contained no message")]
    MissingMessage,

    #[error("stream closed")]
    Closed,

    #[error("call cancelled")]
    Cancelled,

    #[error("background request task failed: {0}")]
    TaskFailed(String),

    #[error(transparent)]
    Status(#[from] Status),
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl Error {
    /// Status code reported for this failure.
    #[must_use]
    pub fn code(&self) -> Code {
        match self {
            Self::Status(status) => status.code(),
            Self::InvalidAddress(_)
            | Self::InvalidMethodPath(_)
            | Self::RequestBuild(_)
            | Self::Compression(_)
            | Self::Truncated { .. } => Code::InvalidArgument,
            Self::Tls(_) | Self::Request(_) | Self::BodyRead(_) | Self::Io(_) | Self::Closed => {
                Code::Unavailable
            }
            Self::MessageTooLarge(_) => Code::ResourceExhausted,
            Self::Encode(_) | Self::Decode(_) | Self::MissingMessage | Self::TaskFailed(_) => {
                Code::Internal
            }
            Self::Cancelled => Code::Cancelled,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_) => ErrorKind::InvalidAddress,
            Self::InvalidMethodPath(_) => ErrorKind::InvalidMethodPath,
            Self::RequestBuild(_) => ErrorKind::RequestBuild,
            Self::Tls(_) => ErrorKind::Tls,
            Self::Request(_) => ErrorKind::Request,
            Self::BodyRead(_) => ErrorKind::BodyRead,
            Self::Io(_) => ErrorKind::Io,
            Self::Compression(_) => ErrorKind::Compression,
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::MessageTooLarge(_) => ErrorKind::MessageTooLarge,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Decode(_) => ErrorKind::Decode,
            Self::MissingMessage => ErrorKind::MissingMessage,
            Self::Closed => ErrorKind::Closed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TaskFailed(_) => ErrorKind::TaskFailed,
            Self::Status(_) => ErrorKind::Status,
        }
    }

    /// The remote status, when the failure came from a trailer.
    #[must_use]
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_faults_are_invalid_argument() {
        assert_eq!(Error::Compression(1).code(), Code::InvalidArgument);
        assert_eq!(
            Error::Truncated {
                expected: 10,
                actual: 3
            }
            .code(),
            Code::InvalidArgument
        );
    }

    #[test]
    fn remote_status_keeps_its_code() {
        let err = Error::from(Status::not_found("gone"));
        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.kind().to_string(), "status");
        assert!(err.status().is_some());
    }

    #[test]
    fn errors_never_report_ok() {
        let errs = [
            Error::Closed,
            Error::Cancelled,
            Error::MissingMessage,
            Error::MessageTooLarge(1),
            Error::InvalidAddress(String::new()),
            Error::Status(Status::new(Code::Ok, "")),
        ];
        for err in errs {
            assert_ne!(err.code(), Code::Ok, "{err}");
        }
    }
}
