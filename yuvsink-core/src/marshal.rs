use log::debug;
use yuvsink_buffer_utils::{BufferAllocator, BufferProvider, BufferRecycler};

use crate::{
    config::SessionConfig,
    error::MarshalError,
    frame::{FrameView, ImageLayout},
    traits::FrameSink,
};

/// Turns strided decoded frames into packed buffers and hands them to a sink.
pub struct FrameMarshaller {
    buffers: Box<dyn BufferProvider>,
    max_frame_bytes: usize,
}

impl FrameMarshaller {
    pub fn new(buffers: Box<dyn BufferProvider>, max_frame_bytes: usize) -> Self {
        Self {
            buffers,
            max_frame_bytes,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let buffers: Box<dyn BufferProvider> = if config.reuse_buffers {
            Box::new(BufferRecycler::new())
        } else {
            Box::new(BufferAllocator::new())
        };

        Self::new(buffers, config.max_frame_bytes)
    }

    /// Marshals `frame` and delivers it to `sink`.
    ///
    /// Nothing reaches the sink if marshalling fails. The buffer goes back to
    /// the provider as soon as the sink returns, whether it took the frame or
    /// not.
    pub fn deliver<S>(&mut self, frame: &FrameView<'_>, sink: &mut S) -> Result<(), MarshalError>
    where
        S: FrameSink + ?Sized,
    {
        let layout = ImageLayout::packed(frame.format, frame.width, frame.height)?;
        if layout.size() > self.max_frame_bytes {
            return Err(MarshalError::FrameTooLarge {
                size: layout.size(),
                limit: self.max_frame_bytes,
            });
        }

        let mut buffer = self.buffers.borrow_buffer(layout.size());

        if let Err(error) = frame.copy_packed(&layout, &mut buffer) {
            self.buffers.redeem_buffer(buffer);
            return Err(error);
        }

        debug!(
            "Delivering {}x{} {:?} frame ({} bytes)",
            frame.width,
            frame.height,
            frame.format,
            buffer.len()
        );
        let delivered = sink.deliver(&buffer, frame.width, frame.height);

        self.buffers.redeem_buffer(buffer);

        delivered
    }
}
