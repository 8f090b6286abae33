//! C ABI of the decoder, the surface a WebAssembly host links against.
//!
//! There is one session per thread (on wasm32, one session). Every frame is
//! passed to the registered callback before the call that decoded it returns.

use std::{
    alloc::Layout,
    cell::{Cell, RefCell},
    ptr,
};

use log::error;
use yuvsink_core::{
    CodecEngine, DecoderError, DecoderResult, DecoderSession, FrameSink, MarshalError,
    SessionConfig,
};

use crate::engine::{default_engine, EngineFactory};

/// Receives one packed YUV frame: Y, then U, then V, without padding.
///
/// `yuv_buffer` stays valid only until the callback returns; the host must
/// copy out whatever it wants to keep.
pub type Yuv420pBufferCallback =
    extern "C" fn(yuv_buffer: *mut u8, buffer_size: i32, width: i32, height: i32);

pub(crate) struct HostCallback(pub(crate) Yuv420pBufferCallback);

impl FrameSink for HostCallback {
    fn deliver(&mut self, buffer: &[u8], width: u32, height: u32) -> Result<(), MarshalError> {
        let (Ok(size), Ok(c_width), Ok(c_height)) = (
            i32::try_from(buffer.len()),
            i32::try_from(width),
            i32::try_from(height),
        ) else {
            return Err(MarshalError::Rejected(format!(
                "{}x{} frame of {} bytes does not fit the callback signature",
                width,
                height,
                buffer.len()
            )));
        };

        // The pointer is mutable for the host's convenience only, the buffer
        // is handed back to the allocator right after the call.
        (self.0)(buffer.as_ptr() as *mut u8, size, c_width, c_height);
        Ok(())
    }
}

type HostSession = DecoderSession<Box<dyn CodecEngine>, HostCallback>;

thread_local! {
    static SESSION: RefCell<Option<HostSession>> = RefCell::new(None);
    static ENGINE_FACTORY: Cell<EngineFactory> = Cell::new(default_engine);
    static CONFIG: RefCell<SessionConfig> = RefCell::new(SessionConfig::default());
}

/// Replaces the engine used by the next [`init_decoder`] on this thread.
pub fn set_engine_factory(factory: EngineFactory) {
    ENGINE_FACTORY.with(|slot| slot.set(factory));
}

/// Replaces the configuration used by the next [`init_decoder`] on this thread.
pub fn set_session_config(config: SessionConfig) {
    CONFIG.with(|slot| *slot.borrow_mut() = config);
}

pub fn open_session(callback: Option<Yuv420pBufferCallback>) -> Result<(), DecoderError> {
    let callback =
        callback.ok_or_else(|| DecoderError::InvalidArgument("null callback".to_string()))?;

    SESSION.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| DecoderError::Busy)?;
        if slot.is_some() {
            return Err(DecoderError::AlreadyInitialized);
        }

        let factory = ENGINE_FACTORY.with(Cell::get);
        let config = CONFIG.with(|config| config.borrow().clone());

        *slot = Some(DecoderSession::init(factory, HostCallback(callback), config)?);
        Ok(())
    })
}

pub fn decode_chunk(chunk: &[u8]) -> Result<(), DecoderError> {
    with_session(|session| session.decode_chunk(chunk))
}

pub fn flush_session() -> Result<(), DecoderError> {
    with_session(|session| session.flush())
}

/// Closes the session, if any. Closing twice is fine.
pub fn close_session() -> Result<(), DecoderError> {
    let session = SESSION.with(|slot| {
        slot.try_borrow_mut()
            .map(|mut slot| slot.take())
            .map_err(|_| DecoderError::Busy)
    })?;

    match session {
        Some(session) => session.close(),
        None => Ok(()),
    }
}

fn with_session<T, F>(f: F) -> Result<T, DecoderError>
where
    F: FnOnce(&mut HostSession) -> Result<T, DecoderError>,
{
    SESSION.with(|slot| {
        let mut slot = slot.try_borrow_mut().map_err(|_| DecoderError::Busy)?;
        let session = slot.as_mut().ok_or(DecoderError::NotInitialized)?;
        f(session)
    })
}

fn report(operation: &str, result: Result<(), DecoderError>) -> DecoderResult {
    if let Err(e) = &result {
        error!("{} failed: {}", operation, e);
    }
    result.into()
}

/// Opens the decoder and registers the frame callback.
///
/// Fails with `AlreadyInitialized` while a session is open and with
/// `EngineError` if the codec engine cannot be set up.
#[no_mangle]
pub extern "C" fn init_decoder(callback: Option<Yuv420pBufferCallback>) -> DecoderResult {
    let _ = env_logger::try_init();
    report("init_decoder", open_session(callback))
}

/// Feeds `buffer_size` bytes of Annex-B data.
///
/// The bytes are only read during the call. Frames completed by them are
/// delivered to the callback before this returns.
///
/// # Safety
///
/// `buffer` must point to at least `buffer_size` readable bytes. It may be
/// NULL when `buffer_size` is 0.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn decode_AnnexB_buffer(buffer: *const u8, buffer_size: usize) -> DecoderResult {
    let chunk: &[u8] = if buffer_size == 0 {
        &[]
    } else if buffer.is_null() {
        return report(
            "decode_AnnexB_buffer",
            Err(DecoderError::InvalidArgument("null buffer".to_string())),
        );
    } else {
        std::slice::from_raw_parts(buffer, buffer_size)
    };

    report("decode_AnnexB_buffer", decode_chunk(chunk))
}

/// Delivers every frame still buffered in the decoder.
#[no_mangle]
pub extern "C" fn flush_decoder() -> DecoderResult {
    report("flush_decoder", flush_session())
}

/// Releases the decoder. Succeeds even when no session is open.
#[no_mangle]
pub extern "C" fn close_decoder() -> DecoderResult {
    report("close_decoder", close_session())
}

/// Allocates `size` bytes in the module's memory, for the host to write
/// input into. Returns NULL on failure or when `size` is 0.
#[no_mangle]
pub extern "C" fn decoder_malloc(size: usize) -> *mut u8 {
    if size == 0 {
        return ptr::null_mut();
    }

    match Layout::array::<u8>(size) {
        Ok(layout) => unsafe { std::alloc::alloc(layout) },
        Err(_) => ptr::null_mut(),
    }
}

/// Releases memory obtained from [`decoder_malloc`].
///
/// # Safety
///
/// `buffer` must come from `decoder_malloc(size)` with the same `size`, and
/// must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn decoder_free(buffer: *mut u8, size: usize) {
    if buffer.is_null() || size == 0 {
        return;
    }

    if let Ok(layout) = Layout::array::<u8>(size) {
        std::alloc::dealloc(buffer, layout);
    }
}
