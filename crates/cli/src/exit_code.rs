// Consistent exit codes for the gitcache CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = node not reachable
//   13 = network timeout

use std::process;

use crate::client::NodeUnavailable;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NodeDown = 10,
    Network = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(unavailable) = cause.downcast_ref::<NodeUnavailable>() {
                return if unavailable.is_timeout() { Self::Network } else { Self::NodeDown };
            }
            if cause.downcast_ref::<url::ParseError>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
