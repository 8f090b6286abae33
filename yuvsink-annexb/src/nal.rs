//! H.265 NAL unit header classification.
//!
//! ```text
//! +---+----------+-----------+-----+
//! | F | Type (6) | Layer (6) | TID |
//! +---+----------+-----------+-----+
//! ```

pub const HEADER_SIZE: usize = 2;

pub const VPS_NUT: u8 = 32;
pub const SPS_NUT: u8 = 33;
pub const PPS_NUT: u8 = 34;
pub const AUD_NUT: u8 = 35;
pub const EOS_NUT: u8 = 36;
pub const EOB_NUT: u8 = 37;
pub const FD_NUT: u8 = 38;
pub const PREFIX_SEI_NUT: u8 = 39;
pub const SUFFIX_SEI_NUT: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    pub nal_type: u8,
    pub layer_id: u8,
    pub temporal_id_plus1: u8,
}

impl NalHeader {
    pub fn parse(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            nal_type: (bytes[0] >> 1) & 0x3f,
            layer_id: ((bytes[0] & 0x01) << 5) | (bytes[1] >> 3),
            temporal_id_plus1: bytes[1] & 0x07,
        }
    }

    pub fn is_vcl(&self) -> bool {
        self.nal_type < 32
    }

    /// Non-VCL units that, when found after the pictures of an access unit,
    /// start the next one.
    pub fn is_access_unit_prefix(&self) -> bool {
        matches!(
            self.nal_type,
            VPS_NUT | SPS_NUT | PPS_NUT | AUD_NUT | PREFIX_SEI_NUT | 41..=44 | 48..=55
        )
    }
}

/// `first_slice_segment_in_pic_flag` is the first bit after a slice header's
/// NAL header.
pub fn first_slice_segment_in_pic(first_payload_byte: u8) -> bool {
    first_payload_byte & 0x80 != 0
}
