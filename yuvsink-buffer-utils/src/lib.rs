//! Buffer providers used by the frame marshaller.
//!
//! A provider lends a zeroed `BytesMut` of an exact size and gets it back once
//! the consumer is done with it. What happens on redemption is the provider's
//! business: [`BufferAllocator`] releases the memory, [`BufferRecycler`] keeps
//! it around for the next frame.

pub use bytes::*;


pub trait BufferProvider {
    fn borrow_buffer(&mut self, size: usize) -> BytesMut;
    fn redeem_buffer(&mut self, buffer: BytesMut);
}

impl<P: BufferProvider + ?Sized> BufferProvider for Box<P> {
    fn borrow_buffer(&mut self, size: usize) -> BytesMut {
        (**self).borrow_buffer(size)
    }

    fn redeem_buffer(&mut self, buffer: BytesMut) {
        (**self).redeem_buffer(buffer)
    }
}

/// Hands out a fresh buffer for every borrow and frees it on redemption.
#[derive(Default)]
pub struct BufferAllocator {
    allocated: usize,
}

impl BufferAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

impl BufferProvider for BufferAllocator {
    fn borrow_buffer(&mut self, size: usize) -> BytesMut {
        self.allocated += 1;
        BytesMut::zeroed(size)
    }

    fn redeem_buffer(&mut self, buffer: BytesMut) {
        log::trace!("Releasing {} bytes buffer", buffer.len());
        drop(buffer);
    }
}

/// Keeps a single buffer alive across borrows.
///
/// The buffer is cleared on redemption, so nothing written by a previous
/// frame is observable through the next borrow.
#[derive(Default)]
pub struct BufferRecycler {
    slot: Option<BytesMut>,
    allocated: usize,
}

impl BufferRecycler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }
}

impl BufferProvider for BufferRecycler {
    fn borrow_buffer(&mut self, size: usize) -> BytesMut {
        match self.slot.take() {
            Some(mut buffer) => {
                if buffer.capacity() < size {
                    log::debug!(
                        "Growing recycled buffer from {} to {} bytes",
                        buffer.capacity(),
                        size
                    );
                    self.allocated += 1;
                }
                buffer.resize(size, 0);
                buffer
            }
            None => {
                self.allocated += 1;
                BytesMut::zeroed(size)
            }
        }
    }

    fn redeem_buffer(&mut self, mut buffer: BytesMut) {
        buffer.clear();
        self.slot = Some(buffer);
    }
}
