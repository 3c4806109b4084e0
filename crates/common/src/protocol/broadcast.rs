// Clone announcement forwarded to the chain broadcast endpoint.

use serde::{Deserialize, Serialize};

const CLONE_COMMAND_PREFIX: &str = "git clone ";

/// Message handed to the broadcast endpoint. The endpoint signs and
/// relays it; this side only fills in the addressing keys and payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloneBroadcast {
    pub private_key: String,
    pub public_key: String,
    pub msg: String,
}

impl CloneBroadcast {
    pub fn new(private_key: &str, public_key: &str, repository: &str) -> Self {
        Self {
            private_key: private_key.to_string(),
            public_key: public_key.to_string(),
            msg: format!("{CLONE_COMMAND_PREFIX}{repository}"),
        }
    }

    /// Repository named by the message, if it is a clone command.
    pub fn repository(&self) -> Option<&str> {
        self.msg.strip_prefix(CLONE_COMMAND_PREFIX)
    }
}

/// Request body for announcing a clone through a node's HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub repository: String,
}
