use log::info;
use serde::{Deserialize, Serialize};

/// Counters accumulated over the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub chunks: u64,
    pub bytes_in: u64,
    pub packets: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub flushes: u64,
}

impl SessionStats {
    pub fn log_summary(&self) {
        info!(
            "Decoded {} bytes in {} chunks, {} packets",
            self.bytes_in, self.chunks, self.packets
        );

        if self.frames_dropped == 0 {
            info!("Delivered frames: {}", self.frames_delivered);
        } else {
            info!(
                "Delivered frames: {}, dropped frames: {}",
                self.frames_delivered, self.frames_dropped
            );
        }
    }
}
