//! Decoding session and frame marshalling for yuvsink.
//!
//! The heavy lifting of H.265 decoding belongs to a [`traits::CodecEngine`].
//! This crate owns what sits around it: the session state machine that pumps
//! Annex-B chunks through the engine, and the marshaller that packs every
//! decoded frame into one contiguous planar buffer for the host.

pub mod config;
pub mod error;
pub mod frame;
pub mod marshal;
pub mod session;
pub mod stats;
pub mod traits;

pub use config::{MarshalPolicy, SessionConfig};
pub use error::{DecoderError, DecoderResult, EngineError, MarshalError};
pub use frame::{FrameView, ImageLayout, PixelFormat, PlaneLayout, PlaneView};
pub use session::DecoderSession;
pub use stats::SessionStats;
pub use traits::{CodecEngine, FrameDecoder, FrameSink, ParseProgress, Receive};

#[cfg(test)]
mod tests;
