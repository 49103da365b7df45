use http::header::{HeaderName, HeaderValue};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tracing::warn;

use crate::{Code, Metadata};

pub const GRPC_STATUS: &str = "grpc-status";
pub const GRPC_MESSAGE: &str = "grpc-message";

/// Everything outside printable ASCII, plus `%` itself.
const GRPC_MESSAGE_ENCODE_SET: &AsciiSet = &CONTROLS.add(b'%');

/// A failed call outcome: a non-OK code plus human-readable text.
///
/// A `Status` never carries `Code::Ok`; constructing one with it yields
/// `Code::Unknown` instead, so "error" and "non-OK code" always coincide.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
    metadata: Metadata,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        let code = if code.is_ok() { Code::Unknown } else { code };
        Self {
            code,
            message: message.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(Code::FailedPrecondition, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, message)
    }

    /// Maps an arbitrary error onto a status.
    ///
    /// Errors that already carry a code (`Status`, `crate::Error`) keep it;
    /// everything else becomes `Internal`.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(status) = err.downcast_ref::<Status>() {
            return status.clone();
        }
        if let Some(err) = err.downcast_ref::<crate::Error>() {
            return Self::new(err.code(), err.to_string());
        }
        Self::internal(err.to_string())
    }

    /// Attaches extra trailer metadata that is written alongside the status.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn code(&self) -> Code {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl From<crate::Error> for Status {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Status(status) => status,
            other => Self::new(other.code(), other.to_string()),
        }
    }
}

/// Reads the call outcome code.
///
/// Only an absent header or the literal `0` means `Ok`. Any other integer
/// goes through [`Code::from_i32`]; anything else, including other spellings
/// of zero such as `00` or `+0`, maps to the `Unmapped` sentinel.
#[must_use]
pub fn code_from_metadata(md: &Metadata) -> Code {
    let Some(value) = md.get(GRPC_STATUS) else {
        return Code::Ok;
    };
    if value.as_bytes() == b"0" {
        return Code::Ok;
    }

    match value.to_str().ok().and_then(|v| v.parse::<i32>().ok()) {
        Some(0) | None => Code::Unmapped,
        Some(n) => Code::from_i32(n),
    }
}

/// Turns trailer metadata into a failure, or `None` when the call succeeded.
#[must_use]
pub fn error_for_trailer(md: &Metadata) -> Option<Status> {
    let code = code_from_metadata(md);
    if code.is_ok() {
        return None;
    }

    let message = md
        .get(GRPC_MESSAGE)
        .map(|v| percent_decode(v.as_bytes()))
        .unwrap_or_default();

    let mut extra = md.clone();
    extra.remove(GRPC_STATUS);
    extra.remove(GRPC_MESSAGE);

    Some(Status::new(code, message).with_metadata(extra))
}

/// Writes the call outcome into `md`. This is the only place an application
/// error becomes wire-visible status.
pub fn write_trailer(md: &mut Metadata, status: Option<&Status>) {
    let Some(status) = status else {
        md.insert(HeaderName::from_static(GRPC_STATUS), HeaderValue::from_static("0"));
        return;
    };

    for (key, value) in status.metadata() {
        if is_reserved(key) {
            continue;
        }
        md.append(key.clone(), value.clone());
    }

    md.insert(
        HeaderName::from_static(GRPC_STATUS),
        HeaderValue::from(status.code().as_i32()),
    );

    let encoded = percent_encode(status.message());
    match HeaderValue::from_str(&encoded) {
        Ok(v) => {
            md.insert(HeaderName::from_static(GRPC_MESSAGE), v);
        }
        Err(err) => {
            warn!(code = %status.code(), "dropping unencodable grpc-message: {err}");
        }
    }
}

/// Merges caller-supplied trailer entries, leaving the reserved keys to
/// `write_trailer`.
pub(crate) fn merge_metadata(dst: &mut Metadata, src: &Metadata) {
    for (key, value) in src {
        if !is_reserved(key) {
            dst.append(key.clone(), value.clone());
        }
    }
}

fn is_reserved(key: &HeaderName) -> bool {
    key.as_str() == GRPC_STATUS || key.as_str() == GRPC_MESSAGE
}

fn percent_encode(message: &str) -> String {
    utf8_percent_encode(message, GRPC_MESSAGE_ENCODE_SET).to_string()
}

fn percent_decode(raw: &[u8]) -> String {
    percent_encoding::percent_decode(raw)
        .decode_utf8_lossy()
        .into_owned()
}
