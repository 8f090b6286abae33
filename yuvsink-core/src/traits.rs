use crate::{
    error::{EngineError, MarshalError},
    frame::FrameView,
};

/// Outcome of one pull from the engine's output queue.
pub enum Receive<'a> {
    Frame(FrameView<'a>),
    /// Nothing to output until more input is sent.
    Again,
    /// Every frame has been returned after a flush.
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProgress {
    pub consumed: usize,
    pub packet_ready: bool,
}

/// The codec engine the session drives: a streaming parser paired with a
/// packet decoder.
///
/// Resources are acquired when the engine is built and released when it is
/// dropped.
pub trait CodecEngine {
    /// Feeds a prefix of `input` to the stream parser.
    ///
    /// When `packet_ready` is set, the assembled packet is held by the engine
    /// until the next [`CodecEngine::send_packet`].
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, EngineError>;

    /// Asks the parser to give up the packet it is still accumulating.
    /// Returns whether a packet is now ready.
    fn drain_parser(&mut self) -> Result<bool, EngineError>;

    fn send_packet(&mut self) -> Result<(), EngineError>;

    /// Signals end of stream so that every buffered frame gets output.
    fn send_flush(&mut self) -> Result<(), EngineError>;

    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError>;

    /// Brings a flushed engine back to a state where it accepts packets.
    fn reset(&mut self) -> Result<(), EngineError>;
}

impl<E: CodecEngine + ?Sized> CodecEngine for Box<E> {
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, EngineError> {
        (**self).parse(input)
    }

    fn drain_parser(&mut self) -> Result<bool, EngineError> {
        (**self).drain_parser()
    }

    fn send_packet(&mut self) -> Result<(), EngineError> {
        (**self).send_packet()
    }

    fn send_flush(&mut self) -> Result<(), EngineError> {
        (**self).send_flush()
    }

    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError> {
        (**self).receive_frame()
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        (**self).reset()
    }
}

/// Packet level decoder, for engines whose parsing is done on the Rust side.
pub trait FrameDecoder {
    /// `None` is the end of stream marker.
    fn send_packet(&mut self, packet: Option<&[u8]>) -> Result<(), EngineError>;
    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError>;
    fn reset(&mut self) -> Result<(), EngineError>;
}

/// Receives every marshalled frame. `buffer` is only valid during the call.
///
/// A sink that cannot take a frame returns [`MarshalError::Rejected`], and the
/// session handles it like any other frame that failed to marshal.
pub trait FrameSink {
    fn deliver(&mut self, buffer: &[u8], width: u32, height: u32) -> Result<(), MarshalError>;
}

impl<F> FrameSink for F
where
    F: FnMut(&[u8], u32, u32),
{
    fn deliver(&mut self, buffer: &[u8], width: u32, height: u32) -> Result<(), MarshalError> {
        self(buffer, width, height);
        Ok(())
    }
}
