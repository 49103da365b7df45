use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum CommandError {
    InvalidInput(anyhow::Error),
    Rpc(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl CommandError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Rpc(_) => ExitCode::RpcFailed,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::Rpc(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<sidecar::Error> for CommandError {
    fn from(err: sidecar::Error) -> Self {
        use sidecar::ErrorKind;

        match err.kind() {
            ErrorKind::Status => Self::Rpc(err.into()),
            ErrorKind::InvalidAddress | ErrorKind::InvalidMethodPath => {
                Self::InvalidInput(err.into())
            }
            _ => Self::RuntimeError(err.into()),
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_status_maps_to_rpc_failure() {
        let err = CommandError::from(sidecar::Error::from(sidecar::Status::not_found("x")));
        assert_eq!(err.exit_code(), ExitCode::RpcFailed);
    }

    #[test]
    fn bad_address_is_invalid_input() {
        let err = CommandError::from(sidecar::Error::InvalidAddress(String::new()));
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
    }

    #[test]
    fn transport_faults_are_runtime_errors() {
        let err = CommandError::from(sidecar::Error::Closed);
        assert_eq!(err.exit_code(), ExitCode::RuntimeError);
        assert_eq!(err.to_string(), "stream closed");
    }
}
