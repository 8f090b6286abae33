use serde::{Deserialize, Serialize};

/// What the session does with a frame that cannot be marshalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarshalPolicy {
    /// Log and skip the frame, keep decoding the stream.
    #[default]
    Drop,
    /// Abort the current call with the marshalling error.
    Propagate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub marshal_policy: MarshalPolicy,
    pub max_frame_bytes: usize,
    pub max_access_unit_bytes: usize,
    pub reuse_buffers: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            marshal_policy: MarshalPolicy::Drop,
            max_frame_bytes: 64 * 1024 * 1024,
            max_access_unit_bytes: 16 * 1024 * 1024,
            reuse_buffers: false,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // Building functions
    pub fn marshal_policy(mut self, policy: MarshalPolicy) -> Self {
        self.marshal_policy = policy;
        self
    }

    pub fn max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    pub fn max_access_unit_bytes(mut self, limit: usize) -> Self {
        self.max_access_unit_bytes = limit;
        self
    }

    pub fn reuse_buffers(mut self) -> Self {
        self.reuse_buffers = true;
        self
    }
}
