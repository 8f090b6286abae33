use serde::{Deserialize, Serialize};

use crate::error::MarshalError;

/// Pixel formats a decoded frame may come out in.
///
/// `Other` carries the engine's native format id so that it can be logged
/// when a frame is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
    Gray8,
    /// 10 bit 4:2:0, little endian, one sample per 2 bytes
    Yuv420p10,
    Other(i32),
}

impl PixelFormat {
    fn bytes_per_sample(&self) -> usize {
        match self {
            PixelFormat::Yuv420p10 => 2,
            _ => 1,
        }
    }

    /// Horizontal and vertical chroma subsampling shifts, `None` if the
    /// format has no chroma planes.
    fn chroma_shift(&self) -> Option<(u32, u32)> {
        match self {
            PixelFormat::Yuv420p | PixelFormat::Yuv420p10 => Some((1, 1)),
            PixelFormat::Yuv422p => Some((1, 0)),
            PixelFormat::Yuv444p => Some((0, 0)),
            PixelFormat::Gray8 | PixelFormat::Other(_) => None,
        }
    }

    pub fn planes_count(&self) -> usize {
        match self.chroma_shift() {
            Some(_) => 3,
            None => 1,
        }
    }
}

/// Placement of one plane inside a tightly packed image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneLayout {
    pub offset: usize,
    /// Row width in bytes. Packed layouts have no padding, so this is also
    /// the distance between rows.
    pub stride: usize,
    pub rows: usize,
}

impl PlaneLayout {
    pub fn size(&self) -> usize {
        self.stride * self.rows
    }
}

/// Layout of a padding-free planar image: Y, then U, then V.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayout {
    planes: Vec<PlaneLayout>,
    size: usize,
}

impl ImageLayout {
    /// Computes the packed layout of a `width`x`height` image.
    ///
    /// Chroma dimensions round up, so odd sizes still cover every luma
    /// sample: 4:2:0 content takes `w*h + 2*ceil(w/2)*ceil(h/2)` bytes.
    pub fn packed(format: PixelFormat, width: u32, height: u32) -> Result<Self, MarshalError> {
        if width == 0 || height == 0 {
            return Err(MarshalError::InvalidGeometry { width, height });
        }

        let overflow = || MarshalError::InvalidGeometry { width, height };

        let sample = format.bytes_per_sample();
        let mut dimensions = vec![(width as usize, height as usize)];

        match (format, format.chroma_shift()) {
            (PixelFormat::Other(id), _) => {
                return Err(MarshalError::UnsupportedFormat(format!("native format {}", id)))
            }
            (_, Some((shift_w, shift_h))) => {
                let chroma_w = ((width as usize) + (1 << shift_w) - 1) >> shift_w;
                let chroma_h = ((height as usize) + (1 << shift_h) - 1) >> shift_h;
                dimensions.push((chroma_w, chroma_h));
                dimensions.push((chroma_w, chroma_h));
            }
            (_, None) => {}
        }

        let mut planes = Vec::with_capacity(dimensions.len());
        let mut offset: usize = 0;
        for (w, rows) in dimensions {
            let stride = w.checked_mul(sample).ok_or_else(overflow)?;
            let plane = PlaneLayout {
                offset,
                stride,
                rows,
            };
            offset = stride
                .checked_mul(rows)
                .and_then(|size| offset.checked_add(size))
                .ok_or_else(overflow)?;
            planes.push(plane);
        }

        Ok(Self {
            planes,
            size: offset,
        })
    }

    /// Layout of an 8 bit 4:2:0 image, the shape every HEVC Main profile
    /// frame is delivered in.
    pub fn yuv420p(width: u32, height: u32) -> Result<Self, MarshalError> {
        Self::packed(PixelFormat::Yuv420p, width, height)
    }

    pub fn planes(&self) -> &[PlaneLayout] {
        &self.planes
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// One plane of a decoded frame as the engine stores it.
///
/// `stride` may exceed the row width; the extra bytes at the end of each row
/// are padding. The last row does not need to be padded.
#[derive(Debug, Clone, Copy)]
pub struct PlaneView<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

/// A decoded frame borrowed from the engine for the duration of one pump step.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub planes: Vec<PlaneView<'a>>,
}

impl<'a> FrameView<'a> {
    pub fn new(format: PixelFormat, width: u32, height: u32, planes: Vec<PlaneView<'a>>) -> Self {
        Self {
            format,
            width,
            height,
            planes,
        }
    }

    /// Copies every plane into `output`, dropping the stride padding.
    ///
    /// `output` must be exactly `layout.size()` bytes long.
    pub fn copy_packed(&self, layout: &ImageLayout, output: &mut [u8]) -> Result<(), MarshalError> {
        if self.planes.len() < layout.planes().len() {
            return Err(MarshalError::PlaneTooShort {
                plane: self.planes.len(),
                needed: layout.planes()[self.planes.len()].size(),
                available: 0,
            });
        }

        for (index, (source, target)) in self.planes.iter().zip(layout.planes()).enumerate() {
            let row_bytes = target.stride;
            if source.stride < row_bytes {
                return Err(MarshalError::InvalidStride {
                    plane: index,
                    stride: source.stride,
                    row_bytes,
                });
            }

            let needed = source.stride * (target.rows - 1) + row_bytes;
            if source.data.len() < needed {
                return Err(MarshalError::PlaneTooShort {
                    plane: index,
                    needed,
                    available: source.data.len(),
                });
            }

            let destination = &mut output[target.offset..target.offset + target.size()];
            destination
                .chunks_exact_mut(row_bytes)
                .zip(source.data.chunks(source.stride))
                .for_each(|(dst_row, src_row)| dst_row.copy_from_slice(&src_row[..row_bytes]));
        }

        Ok(())
    }
}
