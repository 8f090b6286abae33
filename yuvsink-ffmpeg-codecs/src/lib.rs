//! libavcodec engines, through `rsmpeg`.

pub mod decoders;

pub use decoders::hevc::HevcEngine;
