use yuvsink_core::{CodecEngine, EngineError, SessionConfig};

/// Builds the engine of every session opened through the C ABI.
pub type EngineFactory = fn(&SessionConfig) -> Result<Box<dyn CodecEngine>, EngineError>;

/// The libavcodec HEVC engine when built with the `ffmpeg` feature.
#[cfg(feature = "ffmpeg")]
pub fn default_engine(config: &SessionConfig) -> Result<Box<dyn CodecEngine>, EngineError> {
    let engine = yuvsink_ffmpeg_codecs::HevcEngine::open(config)?;
    Ok(Box::new(engine))
}

/// Without the `ffmpeg` feature there is no HEVC decoder to open.
#[cfg(not(feature = "ffmpeg"))]
pub fn default_engine(_config: &SessionConfig) -> Result<Box<dyn CodecEngine>, EngineError> {
    log::error!("Built without an HEVC decoder, enable the `ffmpeg` feature");
    Err(EngineError::DecoderNotFound)
}
