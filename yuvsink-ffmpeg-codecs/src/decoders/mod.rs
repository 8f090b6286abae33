pub mod hevc;

pub(crate) mod utils;
