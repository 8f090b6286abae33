use bytes::Bytes;
use log::debug;
use yuvsink_core::{CodecEngine, EngineError, FrameDecoder, ParseProgress, Receive, SessionConfig};

use crate::splitter::AccessUnitSplitter;

/// A [`CodecEngine`] made of the Rust access unit splitter and a packet level
/// [`FrameDecoder`].
pub struct ParsedEngine<D> {
    splitter: AccessUnitSplitter,
    decoder: D,
    packet: Option<Bytes>,
}

impl<D: FrameDecoder> ParsedEngine<D> {
    pub fn new(decoder: D, config: &SessionConfig) -> Self {
        Self {
            splitter: AccessUnitSplitter::new(config.max_access_unit_bytes),
            decoder,
            packet: None,
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<D: FrameDecoder> CodecEngine for ParsedEngine<D> {
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, EngineError> {
        let (consumed, unit) = self.splitter.parse(input)?;
        let packet_ready = unit.is_some();
        if packet_ready {
            self.packet = unit;
        }

        Ok(ParseProgress {
            consumed,
            packet_ready,
        })
    }

    fn drain_parser(&mut self) -> Result<bool, EngineError> {
        self.packet = self.splitter.drain();
        Ok(self.packet.is_some())
    }

    fn send_packet(&mut self) -> Result<(), EngineError> {
        let packet = self
            .packet
            .take()
            .ok_or_else(|| EngineError::SendPacket("no packet assembled".to_string()))?;

        debug!("Sending {} bytes access unit", packet.len());
        self.decoder.send_packet(Some(&packet))
    }

    fn send_flush(&mut self) -> Result<(), EngineError> {
        self.decoder.send_packet(None)
    }

    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError> {
        self.decoder.receive_frame()
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.splitter.reset();
        self.packet = None;
        self.decoder.reset()
    }
}
