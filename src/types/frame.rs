//! Frame types flowing through the capture pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// One byte of luma per pixel
    Grayscale,

    /// Two bytes per pixel, little-endian 5/6/5 red/green/blue
    Rgb565,
}

impl PixelFormat {
    /// Bytes used to store one pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb565 => 2,
        }
    }
}

/// Negotiated frame geometry and pixel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl FrameFormat {
    /// Grayscale QVGA, the reference capture configuration
    pub const QVGA_GRAYSCALE: FrameFormat =
        FrameFormat { width: 320, height: 240, pixel_format: PixelFormat::Grayscale };

    pub fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self { width, height, pixel_format }
    }

    /// Number of pixels in one frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Expected buffer length in bytes
    pub fn buffer_len(&self) -> usize {
        self.pixel_count() * self.pixel_format.bytes_per_pixel()
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.pixel_format)
    }
}

/// One captured image buffer.
///
/// A `Frame` has exactly one owner at a time and is deliberately not `Clone`.
/// It moves from the [`FrameSource`](crate::FrameSource) through the capture loop,
/// the channel slot and the decode loop, and must be handed back with
/// [`FrameSource::release`](crate::FrameSource::release) exactly once.
#[derive(Debug)]
#[must_use = "frames must be released back to their source"]
pub struct Frame {
    /// Pixel data laid out according to `format`
    pub data: Box<[u8]>,

    /// Geometry and pixel layout
    pub format: FrameFormat,

    /// Source-assigned sequence number, unique per acquisition
    pub seq: u64,
}

impl Frame {
    pub fn new(data: impl Into<Box<[u8]>>, format: FrameFormat, seq: u64) -> Self {
        Self { data: data.into(), format, seq }
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the buffer length agrees with the declared format
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.format.buffer_len()
    }
}
