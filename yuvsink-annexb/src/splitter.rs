use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};
use yuvsink_core::EngineError;

use crate::nal::{first_slice_segment_in_pic, NalHeader, HEADER_SIZE};

#[derive(Debug, Clone, Copy)]
struct PendingNal {
    /// Offset of the first start code byte.
    start: usize,
    /// Offset of the NAL header.
    payload: usize,
}

/// Cuts an Annex-B byte stream into access units, one picture each.
///
/// Input may be split anywhere, start codes included: the splitter keeps
/// whatever it has not emitted yet and resumes where the previous call left.
/// An access unit is only known to be complete when the first NAL of the next
/// one shows up, so the last unit of a stream has to be taken out with
/// [`AccessUnitSplitter::drain`].
pub struct AccessUnitSplitter {
    buffer: BytesMut,
    max_access_unit_bytes: usize,

    zeros: usize,
    synced: bool,
    pending: Option<PendingNal>,
    has_vcl: bool,
}

impl AccessUnitSplitter {
    pub fn new(max_access_unit_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_access_unit_bytes,
            zeros: 0,
            synced: false,
            pending: None,
            has_vcl: false,
        }
    }

    /// Consumes a prefix of `input`, stopping right after the byte that
    /// completed an access unit.
    ///
    /// Returns the consumed length and the completed unit, if any. Bytes
    /// before the first start code must be zeros.
    pub fn parse(&mut self, input: &[u8]) -> Result<(usize, Option<Bytes>), EngineError> {
        for (index, &byte) in input.iter().enumerate() {
            if !self.synced {
                self.sync(byte)?;
                continue;
            }

            self.buffer.put_u8(byte);

            if byte == 0 {
                self.zeros += 1;
            } else if byte == 1 && self.zeros >= 2 {
                self.start_nal();
                continue;
            } else {
                self.zeros = 0;
            }

            if let Some(boundary) = self.classify_pending() {
                let unit = self.buffer.split_to(boundary).freeze();
                debug!("Access unit of {} bytes", unit.len());
                return Ok((index + 1, Some(unit)));
            }

            if self.buffer.len() > self.max_access_unit_bytes {
                let buffered = self.buffer.len();
                self.reset();
                return Err(EngineError::Parse(format!(
                    "access unit exceeds {} bytes ({} buffered)",
                    self.max_access_unit_bytes, buffered
                )));
            }
        }

        Ok((input.len(), None))
    }

    /// Returns whatever access unit is still buffered and rewinds to the
    /// state of a fresh stream.
    pub fn drain(&mut self) -> Option<Bytes> {
        let holds_nal = match self.pending {
            Some(nal) => self.has_vcl || nal.start > 0,
            None => true,
        };

        let unit = if self.synced && holds_nal && !self.buffer.is_empty() {
            Some(self.buffer.split().freeze())
        } else {
            None
        };

        self.reset();
        unit
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.zeros = 0;
        self.synced = false;
        self.pending = None;
        self.has_vcl = false;
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn sync(&mut self, byte: u8) -> Result<(), EngineError> {
        match byte {
            0 => {
                self.zeros += 1;
                Ok(())
            }
            1 if self.zeros >= 2 => {
                let start_code: &[u8] = if self.zeros >= 3 {
                    &[0, 0, 0, 1]
                } else {
                    &[0, 0, 1]
                };
                trace!("Synchronized after {} zero bytes", self.zeros);

                self.buffer.extend_from_slice(start_code);
                self.synced = true;
                self.start_nal();
                Ok(())
            }
            _ => {
                self.reset();
                Err(EngineError::Parse(
                    "stream does not begin with a start code".to_string(),
                ))
            }
        }
    }

    /// Called with the last byte of a start code at the end of the buffer.
    fn start_nal(&mut self) {
        let prefix = if self.zeros >= 3 { 4 } else { 3 };
        self.pending = Some(PendingNal {
            start: self.buffer.len() - prefix,
            payload: self.buffer.len(),
        });
        self.zeros = 0;
    }

    /// Looks at the newest NAL once enough of it is buffered and returns the
    /// offset where the current access unit ends, if this NAL opens a new one.
    fn classify_pending(&mut self) -> Option<usize> {
        let nal = self.pending?;
        let available = self.buffer.len() - nal.payload;
        if available < HEADER_SIZE {
            return None;
        }

        let header = NalHeader::parse([self.buffer[nal.payload], self.buffer[nal.payload + 1]]);

        let opens_unit = if header.is_vcl() {
            if available < HEADER_SIZE + 1 {
                return None;
            }
            first_slice_segment_in_pic(self.buffer[nal.payload + HEADER_SIZE])
        } else {
            header.is_access_unit_prefix()
        };

        trace!("NAL type {} at offset {}", header.nal_type, nal.start);
        self.pending = None;

        let boundary = if opens_unit && header.layer_id == 0 && self.has_vcl && nal.start > 0 {
            self.has_vcl = false;
            Some(nal.start)
        } else {
            None
        };

        if header.is_vcl() {
            self.has_vcl = true;
        }

        boundary
    }
}
