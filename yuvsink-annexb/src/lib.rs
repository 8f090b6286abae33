//! Annex-B handling done on the Rust side: NAL classification, access unit
//! splitting, and [`ParsedEngine`] which plugs both in front of any packet
//! level decoder.

pub mod engine;
pub mod nal;
pub mod splitter;

pub use engine::ParsedEngine;
pub use splitter::AccessUnitSplitter;
