#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI options (bad flags, malformed address or method path).
    InvalidInput = 30,

    /// Transport or IO failure (unreachable server, bind failure, broken stream).
    RuntimeError = 40,

    /// The server answered with a non-OK status.
    RpcFailed = 50,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
