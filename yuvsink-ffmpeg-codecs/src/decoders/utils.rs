use log::debug;
use rsmpeg::{avutil::AVFrame, ffi};
use yuvsink_core::{FrameView, ImageLayout, PixelFormat, PlaneView};

pub fn pixel_format(native: i32) -> PixelFormat {
    match native {
        f if f == ffi::AVPixelFormat_AV_PIX_FMT_YUV420P || f == ffi::AVPixelFormat_AV_PIX_FMT_YUVJ420P => {
            PixelFormat::Yuv420p
        }
        f if f == ffi::AVPixelFormat_AV_PIX_FMT_YUV422P || f == ffi::AVPixelFormat_AV_PIX_FMT_YUVJ422P => {
            PixelFormat::Yuv422p
        }
        f if f == ffi::AVPixelFormat_AV_PIX_FMT_YUV444P || f == ffi::AVPixelFormat_AV_PIX_FMT_YUVJ444P => {
            PixelFormat::Yuv444p
        }
        f if f == ffi::AVPixelFormat_AV_PIX_FMT_GRAY8 => PixelFormat::Gray8,
        f if f == ffi::AVPixelFormat_AV_PIX_FMT_YUV420P10LE => PixelFormat::Yuv420p10,
        other => PixelFormat::Other(other),
    }
}

/// Borrows the planes of a decoded `AVFrame`.
///
/// Only the bytes the packed layout will read are covered by the slices.
/// Planes are left out when the frame cannot be packed (unknown format, bad
/// geometry, bottom-up lines), so the marshaller rejects it like any other
/// broken frame.
pub fn frame_view(avframe: &AVFrame) -> FrameView<'_> {
    let format = pixel_format(avframe.format);
    let width = u32::try_from(avframe.width).unwrap_or(0);
    let height = u32::try_from(avframe.height).unwrap_or(0);

    let layout = match ImageLayout::packed(format, width, height) {
        Ok(layout) => layout,
        Err(_) => return FrameView::new(format, width, height, Vec::new()),
    };

    let mut planes = Vec::with_capacity(layout.planes().len());
    for (index, plane) in layout.planes().iter().enumerate() {
        let data = avframe.data[index];
        let linesize = avframe.linesize[index];
        if data.is_null() || linesize <= 0 {
            debug!("Plane {} has linesize {}", index, linesize);
            break;
        }

        let stride = linesize as usize;
        if stride < plane.stride {
            debug!("Plane {} has linesize {} below its row size", index, linesize);
            break;
        }

        let length = stride * (plane.rows - 1) + plane.stride;
        // The frame buffers stay alive for as long as `avframe` is borrowed.
        let data = unsafe { std::slice::from_raw_parts(data as *const u8, length) };
        planes.push(PlaneView { data, stride });
    }

    FrameView::new(format, width, height, planes)
}
