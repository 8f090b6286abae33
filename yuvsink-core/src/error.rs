use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the codec engine. Callers across the C ABI only see
/// them as one undifferentiated engine error.
#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No decoder available for the requested codec")]
    DecoderNotFound,

    #[error("Unable to initialize the stream parser")]
    ParserUnavailable,

    #[error("Unable to allocate the decoding context")]
    ContextAllocation,

    #[error("Unable to open the decoding context: {0}")]
    Open(String),

    #[error("Parser error: {0}")]
    Parse(String),

    #[error("Send packet error: {0}")]
    SendPacket(String),

    #[error("Receive frame error: {0}")]
    ReceiveFrame(String),

    #[error("Unable to reset the decoder: {0}")]
    Reset(String),
}

/// Reasons a decoded frame could not be turned into a packed buffer.
#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Invalid frame geometry {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    #[error("Frame of {size} bytes exceeds the {limit} bytes limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Plane {plane} holds {available} bytes, {needed} needed")]
    PlaneTooShort {
        plane: usize,
        needed: usize,
        available: usize,
    },

    #[error("Plane {plane} stride {stride} is smaller than its {row_bytes} bytes rows")]
    InvalidStride {
        plane: usize,
        stride: usize,
        row_bytes: usize,
    },

    #[error("Frame rejected by the sink: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum DecoderError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Marshalling error: {0}")]
    Marshal(#[from] MarshalError),

    #[error("Decoder already initialized")]
    AlreadyInitialized,

    #[error("Decoder not initialized")]
    NotInitialized,

    #[error("Decoder busy")]
    Busy,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Status codes exchanged with the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoderResult {
    Ok = 0,
    EngineError = 1,
    AlreadyInitialized = 2,
    NotInitialized = 3,
    Busy = 4,
    InvalidArgument = 5,
}

impl DecoderError {
    pub fn status(&self) -> DecoderResult {
        match self {
            // A frame failing under the propagate policy still aborts the call
            // the same way an engine failure does.
            DecoderError::Engine(_) | DecoderError::Marshal(_) => DecoderResult::EngineError,
            DecoderError::AlreadyInitialized => DecoderResult::AlreadyInitialized,
            DecoderError::NotInitialized => DecoderResult::NotInitialized,
            DecoderError::Busy => DecoderResult::Busy,
            DecoderError::InvalidArgument(_) => DecoderResult::InvalidArgument,
        }
    }
}

impl<T> From<Result<T, DecoderError>> for DecoderResult {
    fn from(result: Result<T, DecoderError>) -> Self {
        match result {
            Ok(_) => DecoderResult::Ok,
            Err(error) => error.status(),
        }
    }
}
