use std::collections::VecDeque;

use rand::Rng;
use yuvsink_buffer_utils::BufferAllocator;

use crate::{
    config::{MarshalPolicy, SessionConfig},
    error::{DecoderError, DecoderResult, EngineError, MarshalError},
    frame::{FrameView, ImageLayout, PixelFormat, PlaneView},
    marshal::FrameMarshaller,
    session::DecoderSession,
    traits::{CodecEngine, FrameSink, ParseProgress, Receive},
};

const PACKET_END: u8 = 0xFF;
const REJECTED_PACKET: u8 = 0xEE;
const EMPTY_PICTURE: u8 = 0xDD;
const PADDING: u8 = 0xAA;

struct OwnedFrame {
    width: u32,
    height: u32,
    planes: Vec<(Vec<u8>, usize)>,
}

/// Packets are terminated by `PACKET_END`; every packet decodes to one
/// frame whose planes are filled with values derived from its first byte.
#[derive(Default)]
struct ScriptedEngine {
    width: u32,
    height: u32,
    stride_padding: usize,
    reorder_depth: usize,

    partial: Vec<u8>,
    ready: Option<Vec<u8>>,
    queue: VecDeque<OwnedFrame>,
    current: Option<OwnedFrame>,
    flushing: bool,
    resets: usize,
}

impl ScriptedEngine {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            stride_padding: 16,
            ..Default::default()
        }
    }

    fn reorder_depth(mut self, depth: usize) -> Self {
        self.reorder_depth = depth;
        self
    }

    fn picture(&self, tag: u8) -> OwnedFrame {
        if tag == EMPTY_PICTURE {
            return OwnedFrame {
                width: 0,
                height: 0,
                planes: Vec::new(),
            };
        }

        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);

        let plane = |width: usize, rows: usize, value: u8| {
            let stride = width + self.stride_padding;
            let mut data = vec![PADDING; stride * rows];
            data.chunks_mut(stride)
                .for_each(|row| row[..width].fill(value));
            (data, stride)
        };

        OwnedFrame {
            width: self.width,
            height: self.height,
            planes: vec![
                plane(w, h, tag),
                plane(cw, ch, tag.wrapping_add(1)),
                plane(cw, ch, tag.wrapping_add(2)),
            ],
        }
    }
}

impl CodecEngine for ScriptedEngine {
    fn parse(&mut self, input: &[u8]) -> Result<ParseProgress, EngineError> {
        match input.iter().position(|b| *b == PACKET_END) {
            Some(end) => {
                self.partial.extend_from_slice(&input[..end]);
                self.ready = Some(std::mem::take(&mut self.partial));
                Ok(ParseProgress {
                    consumed: end + 1,
                    packet_ready: true,
                })
            }
            None => {
                self.partial.extend_from_slice(input);
                Ok(ParseProgress {
                    consumed: input.len(),
                    packet_ready: false,
                })
            }
        }
    }

    fn drain_parser(&mut self) -> Result<bool, EngineError> {
        if self.partial.is_empty() {
            return Ok(false);
        }

        self.ready = Some(std::mem::take(&mut self.partial));
        Ok(true)
    }

    fn send_packet(&mut self) -> Result<(), EngineError> {
        let packet = self
            .ready
            .take()
            .ok_or_else(|| EngineError::SendPacket("no packet".to_string()))?;

        match packet.first() {
            None | Some(&REJECTED_PACKET) => Err(EngineError::SendPacket("invalid data".to_string())),
            Some(&tag) => {
                let picture = self.picture(tag);
                self.queue.push_back(picture);
                Ok(())
            }
        }
    }

    fn send_flush(&mut self) -> Result<(), EngineError> {
        self.flushing = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError> {
        if self.queue.len() > self.reorder_depth || (self.flushing && !self.queue.is_empty()) {
            self.current = self.queue.pop_front();
        } else if self.flushing {
            return Ok(Receive::EndOfStream);
        } else {
            return Ok(Receive::Again);
        }

        let frame = match &self.current {
            Some(frame) => frame,
            None => return Ok(Receive::Again),
        };

        Ok(Receive::Frame(FrameView::new(
            PixelFormat::Yuv420p,
            frame.width,
            frame.height,
            frame
                .planes
                .iter()
                .map(|(data, stride)| PlaneView {
                    data,
                    stride: *stride,
                })
                .collect(),
        )))
    }

    fn reset(&mut self) -> Result<(), EngineError> {
        self.flushing = false;
        self.resets += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Delivered {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
}

fn collect_into(frames: &mut Vec<Delivered>) -> impl FnMut(&[u8], u32, u32) + '_ {
    move |buffer, width, height| {
        frames.push(Delivered {
            buffer: buffer.to_vec(),
            width,
            height,
        })
    }
}

#[test]
fn yuv420p_layout_test() {
    let layout = ImageLayout::yuv420p(64, 64).unwrap();
    assert_eq!(layout.size(), 6144);

    let offsets: Vec<usize> = layout.planes().iter().map(|p| p.offset).collect();
    assert_eq!(offsets, vec![0, 4096, 5120]);

    let strides: Vec<usize> = layout.planes().iter().map(|p| p.stride).collect();
    assert_eq!(strides, vec![64, 32, 32]);
}

#[test]
fn odd_geometry_layout_test() {
    let layout = ImageLayout::yuv420p(65, 33).unwrap();
    assert_eq!(layout.size(), 65 * 33 + 2 * 33 * 17);

    let layout = ImageLayout::packed(PixelFormat::Yuv422p, 5, 3).unwrap();
    assert_eq!(layout.size(), 15 + 2 * 3 * 3);

    let layout = ImageLayout::packed(PixelFormat::Yuv444p, 4, 4).unwrap();
    assert_eq!(layout.size(), 48);

    let layout = ImageLayout::packed(PixelFormat::Gray8, 7, 2).unwrap();
    assert_eq!(layout.planes().len(), 1);
    assert_eq!(layout.size(), 14);

    let layout = ImageLayout::packed(PixelFormat::Yuv420p10, 4, 4).unwrap();
    assert_eq!(layout.size(), 2 * (16 + 2 * 4));
}

#[test]
fn invalid_layout_test() {
    assert_eq!(
        ImageLayout::yuv420p(0, 64),
        Err(MarshalError::InvalidGeometry {
            width: 0,
            height: 64
        })
    );
    assert!(matches!(
        ImageLayout::packed(PixelFormat::Other(99), 64, 64),
        Err(MarshalError::UnsupportedFormat(_))
    ));
}

#[test]
fn copy_strips_padding_test() {
    let engine = ScriptedEngine::new(4, 2);
    let picture = engine.picture(7);
    let view = FrameView::new(
        PixelFormat::Yuv420p,
        picture.width,
        picture.height,
        picture
            .planes
            .iter()
            .map(|(data, stride)| PlaneView {
                data,
                stride: *stride,
            })
            .collect(),
    );

    let layout = ImageLayout::yuv420p(4, 2).unwrap();
    let mut output = vec![0u8; layout.size()];
    view.copy_packed(&layout, &mut output).unwrap();

    assert_eq!(output, vec![7, 7, 7, 7, 7, 7, 7, 7, 8, 8, 9, 9]);
}

#[test]
fn short_plane_is_rejected_test() {
    let data = vec![0u8; 10];
    let view = FrameView::new(
        PixelFormat::Gray8,
        4,
        4,
        vec![PlaneView {
            data: &data,
            stride: 4,
        }],
    );

    let mut sink = |_: &[u8], _: u32, _: u32| panic!("nothing should be delivered");
    let mut marshaller = FrameMarshaller::new(Box::new(BufferAllocator::new()), usize::MAX);

    assert_eq!(
        marshaller.deliver(&view, &mut sink),
        Err(MarshalError::PlaneTooShort {
            plane: 0,
            needed: 16,
            available: 10
        })
    );
}

#[test]
fn narrow_stride_is_rejected_test() {
    let data = vec![0u8; 64];
    let view = FrameView::new(
        PixelFormat::Gray8,
        8,
        4,
        vec![PlaneView {
            data: &data,
            stride: 4,
        }],
    );

    let mut sink = |_: &[u8], _: u32, _: u32| panic!("nothing should be delivered");
    let mut marshaller = FrameMarshaller::new(Box::new(BufferAllocator::new()), usize::MAX);

    assert!(matches!(
        marshaller.deliver(&view, &mut sink),
        Err(MarshalError::InvalidStride { plane: 0, .. })
    ));
}

#[test]
fn frame_size_limit_test() {
    let data = vec![0u8; 64];
    let view = FrameView::new(
        PixelFormat::Gray8,
        8,
        8,
        vec![PlaneView {
            data: &data,
            stride: 8,
        }],
    );

    let mut sink = |_: &[u8], _: u32, _: u32| panic!("nothing should be delivered");
    let mut marshaller = FrameMarshaller::new(Box::new(BufferAllocator::new()), 63);

    assert_eq!(
        marshaller.deliver(&view, &mut sink),
        Err(MarshalError::FrameTooLarge { size: 64, limit: 63 })
    );
}

#[test]
fn empty_chunk_is_noop_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(64, 64),
        collect_into(&mut frames),
        SessionConfig::default(),
    );

    assert_eq!(session.decode_chunk(&[]), Ok(()));
    assert_eq!(session.stats().chunks, 0);
    session.close().unwrap();

    assert!(frames.is_empty());
}

#[test]
fn single_frame_end_to_end_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::init(
        |_| Ok(ScriptedEngine::new(64, 64)),
        collect_into(&mut frames),
        SessionConfig::default(),
    )
    .unwrap();

    session.decode_chunk(&[3, 1, 2]).unwrap();
    session.flush().unwrap();
    session.close().unwrap();

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].width, 64);
    assert_eq!(frames[0].height, 64);
    assert_eq!(frames[0].buffer.len(), 6144);
    assert!(frames[0].buffer[..4096].iter().all(|b| *b == 3));
    assert!(frames[0].buffer[4096..5120].iter().all(|b| *b == 4));
    assert!(frames[0].buffer[5120..].iter().all(|b| *b == 5));
}

#[test]
fn failed_init_test() {
    let mut frames = Vec::new();
    let result = DecoderSession::<ScriptedEngine, _>::init(
        |_| Err(EngineError::DecoderNotFound),
        collect_into(&mut frames),
        SessionConfig::default(),
    );

    assert_eq!(
        result.err(),
        Some(DecoderError::Engine(EngineError::DecoderNotFound))
    );
}

#[test]
fn reordered_frames_are_flushed_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(16, 16).reorder_depth(2),
        collect_into(&mut frames),
        SessionConfig::default(),
    );

    session
        .decode_chunk(&[1, PACKET_END, 2, PACKET_END, 3, PACKET_END, 4, PACKET_END])
        .unwrap();
    assert_eq!(session.stats().frames_delivered, 2);

    session.flush().unwrap();
    assert_eq!(session.stats().frames_delivered, 4);

    session.flush().unwrap();
    assert_eq!(session.stats().frames_delivered, 4);
    assert_eq!(session.stats().flushes, 1);

    session.close().unwrap();

    let tags: Vec<u8> = frames.iter().map(|f| f.buffer[0]).collect();
    assert_eq!(tags, vec![1, 2, 3, 4]);
}

#[test]
fn chunking_does_not_change_output_test() {
    let mut rng = rand::thread_rng();

    let mut stream: Vec<u8> = Vec::new();
    for _ in 0..12 {
        let len = rng.gen_range(1..40);
        for i in 0..len {
            let mut byte = rng.gen_range(0..0xDDu8);
            if i == 0 {
                byte = rng.gen_range(1..0xDDu8);
            }
            stream.push(byte);
        }
        stream.push(PACKET_END);
    }
    stream.extend_from_slice(&[9, 9, 9]);

    let decode = |chunks: Vec<&[u8]>| {
        let mut frames = Vec::new();
        let mut session = DecoderSession::new(
            ScriptedEngine::new(8, 6).reorder_depth(1),
            collect_into(&mut frames),
            SessionConfig::default(),
        );
        for chunk in chunks {
            session.decode_chunk(chunk).unwrap();
        }
        session.flush().unwrap();
        session.close().unwrap();
        frames
    };

    let whole = decode(vec![&stream[..]]);
    assert_eq!(whole.len(), 13);

    let mut chunks = Vec::new();
    let mut rest = &stream[..];
    while !rest.is_empty() {
        let (head, tail) = rest.split_at(rng.gen_range(1..=rest.len().min(7)));
        chunks.push(head);
        rest = tail;
    }
    assert_eq!(decode(chunks), whole);

    let bytewise: Vec<&[u8]> = stream.chunks(1).collect();
    assert_eq!(decode(bytewise), whole);
}

#[test]
fn engine_error_aborts_chunk_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8),
        collect_into(&mut frames),
        SessionConfig::default(),
    );

    let result = session.decode_chunk(&[1, PACKET_END, REJECTED_PACKET, PACKET_END, 2, PACKET_END]);

    assert!(matches!(
        result,
        Err(DecoderError::Engine(EngineError::SendPacket(_)))
    ));
    assert_eq!(DecoderResult::from(result), DecoderResult::EngineError);
    assert_eq!(session.stats().frames_delivered, 1);
    session.close().unwrap();

    assert_eq!(frames.len(), 1);
}

#[test]
fn broken_frame_is_dropped_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8),
        collect_into(&mut frames),
        SessionConfig::default(),
    );

    session
        .decode_chunk(&[1, PACKET_END, EMPTY_PICTURE, PACKET_END, 2, PACKET_END])
        .unwrap();
    assert_eq!(session.stats().frames_delivered, 2);
    assert_eq!(session.stats().frames_dropped, 1);
    session.close().unwrap();

    assert_eq!(frames.len(), 2);
}

#[test]
fn broken_frame_is_propagated_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8),
        collect_into(&mut frames),
        SessionConfig::new().marshal_policy(MarshalPolicy::Propagate),
    );

    let result = session.decode_chunk(&[1, PACKET_END, EMPTY_PICTURE, PACKET_END, 2, PACKET_END]);
    assert_eq!(
        result,
        Err(DecoderError::Marshal(MarshalError::InvalidGeometry {
            width: 0,
            height: 0
        }))
    );
    session.close().unwrap();

    assert_eq!(frames.len(), 1);
}

/// Takes every other frame, refusing the rest.
struct PickySink {
    taken: usize,
    refused: usize,
}

impl FrameSink for PickySink {
    fn deliver(&mut self, _: &[u8], _: u32, _: u32) -> Result<(), MarshalError> {
        if (self.taken + self.refused) % 2 == 1 {
            self.refused += 1;
            return Err(MarshalError::Rejected("odd frame".to_string()));
        }
        self.taken += 1;
        Ok(())
    }
}

#[test]
fn rejected_frame_is_counted_as_dropped_test() {
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8),
        PickySink {
            taken: 0,
            refused: 0,
        },
        SessionConfig::default(),
    );

    session
        .decode_chunk(&[1, PACKET_END, 2, PACKET_END, 3, PACKET_END])
        .unwrap();
    assert_eq!(session.stats().frames_delivered, 2);
    assert_eq!(session.stats().frames_dropped, 1);
    assert_eq!((session.sink().taken, session.sink().refused), (2, 1));
    session.close().unwrap();
}

#[test]
fn rejected_frame_is_propagated_test() {
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8),
        PickySink {
            taken: 0,
            refused: 0,
        },
        SessionConfig::new().marshal_policy(MarshalPolicy::Propagate),
    );

    let result = session.decode_chunk(&[1, PACKET_END, 2, PACKET_END, 3, PACKET_END]);
    assert_eq!(
        result,
        Err(DecoderError::Marshal(MarshalError::Rejected(
            "odd frame".to_string()
        )))
    );
    assert_eq!(session.stats().frames_delivered, 1);
    assert_eq!(session.sink().taken, 1);
    session.close().unwrap();
}

#[test]
fn decoding_resumes_after_flush_test() {
    let mut frames = Vec::new();
    let mut session = DecoderSession::new(
        ScriptedEngine::new(8, 8).reorder_depth(1),
        collect_into(&mut frames),
        SessionConfig::new().reuse_buffers(),
    );

    session.decode_chunk(&[1, PACKET_END]).unwrap();
    session.flush().unwrap();
    assert_eq!(session.engine().resets, 0);

    session.decode_chunk(&[2, PACKET_END]).unwrap();
    assert_eq!(session.engine().resets, 1);
    session.flush().unwrap();

    assert_eq!(session.stats().flushes, 2);
    session.close().unwrap();

    let tags: Vec<u8> = frames.iter().map(|f| f.buffer[0]).collect();
    assert_eq!(tags, vec![1, 2]);
}

#[test]
fn stalled_parser_is_an_error_test() {
    struct StalledEngine;

    impl CodecEngine for StalledEngine {
        fn parse(&mut self, _: &[u8]) -> Result<ParseProgress, EngineError> {
            Ok(ParseProgress {
                consumed: 0,
                packet_ready: false,
            })
        }

        fn drain_parser(&mut self) -> Result<bool, EngineError> {
            Ok(false)
        }

        fn send_packet(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn send_flush(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn receive_frame(&mut self) -> Result<Receive<'_>, EngineError> {
            Ok(Receive::EndOfStream)
        }

        fn reset(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    let mut session = DecoderSession::new(
        StalledEngine,
        |_: &[u8], _: u32, _: u32| {},
        SessionConfig::default(),
    );

    assert!(matches!(
        session.decode_chunk(&[0, 0, 1]),
        Err(DecoderError::Engine(EngineError::Parse(_)))
    ));
}
