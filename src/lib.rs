//! yuvsink decodes an H.265 Annex-B elementary stream, fed in chunks of any
//! size, into packed planar YUV frames handed to a host callback.
//!
//! The crate is meant to be built as a `cdylib` (typically for wasm32) and
//! driven through the functions in [`exports`]. Rust users can skip the C ABI
//! and drive a [`DecoderSession`] directly.

pub use yuvsink_core::*;

pub mod engine;
pub mod exports;

pub mod annexb {
    pub use yuvsink_annexb::*;
}

pub mod buffers {
    pub use yuvsink_buffer_utils::*;
}

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg {
    pub use yuvsink_ffmpeg_codecs::*;
}
