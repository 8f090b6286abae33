use log::{debug, info, warn};

use crate::{
    config::{MarshalPolicy, SessionConfig},
    error::{DecoderError, EngineError},
    marshal::FrameMarshaller,
    stats::SessionStats,
    traits::{CodecEngine, FrameSink, Receive},
};

/// A decoding session: one engine, one sink.
///
/// Every frame is delivered synchronously, from inside the
/// [`DecoderSession::decode_chunk`] or [`DecoderSession::flush`] call that
/// made it available.
pub struct DecoderSession<E, S> {
    engine: E,
    marshaller: FrameMarshaller,
    sink: S,
    config: SessionConfig,
    stats: SessionStats,
    drained: bool,
}

impl<E, S> DecoderSession<E, S>
where
    E: CodecEngine,
    S: FrameSink,
{
    pub fn new(engine: E, sink: S, config: SessionConfig) -> Self {
        Self {
            engine,
            marshaller: FrameMarshaller::from_config(&config),
            sink,
            config,
            stats: SessionStats::default(),
            drained: false,
        }
    }

    /// Builds the engine with `open_engine` and starts a session on it.
    ///
    /// Whatever the engine acquired before failing is released when its
    /// constructor returns the error.
    pub fn init<F>(open_engine: F, sink: S, config: SessionConfig) -> Result<Self, DecoderError>
    where
        F: FnOnce(&SessionConfig) -> Result<E, EngineError>,
    {
        let engine = open_engine(&config)?;
        info!("Decoder session opened ({:?})", config);

        Ok(Self::new(engine, sink, config))
    }

    /// Feeds a chunk of Annex-B bytes, of any size and alignment.
    ///
    /// Packets completed by this chunk are decoded right away. An error stops
    /// processing of the rest of the chunk; frames delivered before it are
    /// not taken back.
    pub fn decode_chunk(&mut self, chunk: &[u8]) -> Result<(), DecoderError> {
        if chunk.is_empty() {
            return Ok(());
        }

        if self.drained {
            debug!("Resetting drained engine");
            self.engine.reset()?;
            self.drained = false;
        }

        self.stats.chunks += 1;
        self.stats.bytes_in += chunk.len() as u64;

        let mut remaining = chunk;
        while !remaining.is_empty() {
            let progress = self.engine.parse(remaining)?;

            if progress.consumed > remaining.len() {
                return Err(EngineError::Parse(format!(
                    "parser consumed {} bytes out of {}",
                    progress.consumed,
                    remaining.len()
                ))
                .into());
            }

            if progress.consumed == 0 && !progress.packet_ready {
                return Err(EngineError::Parse("parser made no progress".to_string()).into());
            }

            remaining = &remaining[progress.consumed..];

            if progress.packet_ready {
                self.decode_packet()?;
            }
        }

        Ok(())
    }

    /// Drains the parser and the engine, delivering every buffered frame.
    ///
    /// Flushing an already drained session does nothing.
    pub fn flush(&mut self) -> Result<(), DecoderError> {
        if self.drained {
            debug!("Session already drained, nothing to flush");
            return Ok(());
        }

        if self.engine.drain_parser()? {
            self.decode_packet()?;
        }

        self.engine.send_flush()?;
        self.receive_frames()?;

        self.drained = true;
        self.stats.flushes += 1;

        Ok(())
    }

    /// Ends the session. The engine releases its resources on drop.
    pub fn close(self) -> Result<(), DecoderError> {
        self.stats.log_summary();
        info!("Decoder session closed");
        Ok(())
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn decode_packet(&mut self) -> Result<(), DecoderError> {
        self.stats.packets += 1;
        debug!("Sending packet #{}", self.stats.packets);

        self.engine.send_packet()?;
        self.receive_frames()
    }

    fn receive_frames(&mut self) -> Result<(), DecoderError> {
        loop {
            match self.engine.receive_frame()? {
                Receive::Frame(frame) => match self.marshaller.deliver(&frame, &mut self.sink) {
                    Ok(()) => self.stats.frames_delivered += 1,
                    Err(error) => match self.config.marshal_policy {
                        MarshalPolicy::Drop => {
                            warn!("Dropping frame: {}", error);
                            self.stats.frames_dropped += 1;
                        }
                        MarshalPolicy::Propagate => return Err(error.into()),
                    },
                },
                Receive::Again | Receive::EndOfStream => return Ok(()),
            }
        }
    }
}
