use log::debug;
use rsmpeg::{
    avcodec::{AVCodec, AVCodecContext, AVCodecParserContext, AVPacket},
    avutil::AVFrame,
    error::RsmpegError,
    ffi,
};

use cstr::cstr;

use yuvsink_core::{CodecEngine, EngineError, ParseProgress, Receive, SessionConfig};

use super::utils::frame_view;

/// H.265 engine backed by libavcodec's `hevc` decoder and parser.
///
/// `frame` keeps the last received picture alive while the session borrows
/// its planes; it is empty until the first frame comes out. Fields drop in
/// declaration order: parser, decoding context, last frame, pending packet.
pub struct HevcEngine {
    parser_context: AVCodecParserContext,
    decode_context: AVCodecContext,
    frame: Option<AVFrame>,
    packet: AVPacket,
}

impl HevcEngine {
    pub fn new() -> Result<Self, EngineError> {
        let decoder =
            AVCodec::find_decoder_by_name(cstr!("hevc")).ok_or(EngineError::DecoderNotFound)?;

        let parser_context =
            AVCodecParserContext::find(decoder.id).ok_or(EngineError::ParserUnavailable)?;

        let mut decode_context = AVCodecContext::new(&decoder);
        decode_context
            .open(None)
            .map_err(|e| EngineError::Open(e.to_string()))?;

        debug!("Opened libavcodec '{}' decoder", decoder.name().to_string_lossy());

        Ok(Self {
            parser_context,
            decode_context,
            frame: None,
            packet: AVPacket::new(),
        })
    }

    pub fn open(_config: &SessionConfig) -> Result<Self, EngineError> {
        Self::new()
    }
}

impl CodecEngine for HevcEngine {
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, EngineError> {
        let (packet_ready, consumed) = self
            .parser_context
            .parse_packet(&mut self.decode_context, &mut self.packet, input)
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        Ok(ParseProgress {
            consumed,
            packet_ready,
        })
    }

    fn drain_parser(&mut self) -> Result<bool, EngineError> {
        // An empty input tells the parser the stream is over.
        let (packet_ready, _) = self
            .parser_context
            .parse_packet(&mut self.decode_context, &mut self.packet, &[])
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        Ok(packet_ready)
    }

    fn send_packet(&mut self) -> Result<(), EngineError> {
        let result = self.decode_context.send_packet(Some(&self.packet));
        self.packet = AVPacket::new();

        result.map_err(|e| {
            debug!("Error on send packet: {}", e);
            EngineError::SendPacket(e.to_string())
        })
    }

    fn send_flush(&mut self) -> Result<(), EngineError> {
        self.decode_context
            .send_packet(None)
            .map_err(|e| EngineError::SendPacket(e.to_string()))
    }

    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError> {
        let avframe = match self.decode_context.receive_frame() {
            Ok(frame) => frame,
            Err(RsmpegError::DecoderDrainError) => return Ok(Receive::Again),
            Err(RsmpegError::DecoderFlushedError) => return Ok(Receive::EndOfStream),
            Err(e) => return Err(EngineError::ReceiveFrame(e.to_string())),
        };

        let avframe = self.frame.insert(avframe);
        Ok(Receive::Frame(frame_view(avframe)))
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.frame = None;
        self.packet = AVPacket::new();
        unsafe { ffi::avcodec_flush_buffers(self.decode_context.as_mut_ptr()) };
        Ok(())
    }
}
