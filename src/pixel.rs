//! Pixel conversion helpers
//!
//! The decoder consumes one byte of luma per pixel. Sources that deliver RGB565
//! are converted here before the image is loaded.

use std::borrow::Cow;

use crate::types::{Frame, PixelFormat};

/// Integer-weighted luma: `(299 R + 587 G + 114 B) / 1000`
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// Luma of one RGB565 pixel (red in the high 5 bits, blue in the low 5 bits)
///
/// Channels are widened to 8 bits before weighting so that white maps to 255.
pub fn rgb565_to_luma(pixel: u16) -> u8 {
    let r5 = ((pixel >> 11) & 0x1f) as u8;
    let g6 = ((pixel >> 5) & 0x3f) as u8;
    let b5 = (pixel & 0x1f) as u8;
    luma((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
}

/// Grayscale view of a frame's pixels.
///
/// Grayscale frames are borrowed as-is; RGB565 frames (little-endian) are converted
/// into a new buffer.
pub fn to_grayscale(frame: &Frame) -> Cow<'_, [u8]> {
    match frame.format.pixel_format {
        PixelFormat::Grayscale => Cow::Borrowed(&frame.data),
        PixelFormat::Rgb565 => Cow::Owned(
            frame
                .data
                .chunks_exact(2)
                .map(|px| rgb565_to_luma(u16::from_le_bytes([px[0], px[1]])))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameFormat;

    #[test]
    fn luma_extremes() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(rgb565_to_luma(0x0000), 0);
        assert_eq!(rgb565_to_luma(0xffff), 255);
    }

    #[test]
    fn green_dominates_luma() {
        let red = rgb565_to_luma(0xf800);
        let green = rgb565_to_luma(0x07e0);
        let blue = rgb565_to_luma(0x001f);
        assert_eq!(red, 76);
        assert_eq!(green, 149);
        assert_eq!(blue, 29);
    }

    #[test]
    fn grayscale_frames_are_borrowed() {
        let frame = Frame::new(vec![1, 2, 3, 4], FrameFormat::new(2, 2, PixelFormat::Grayscale), 0);
        assert!(matches!(to_grayscale(&frame), Cow::Borrowed(_)));
    }

    #[test]
    fn rgb565_frames_are_converted() {
        let white = 0xffffu16.to_le_bytes();
        let black = 0x0000u16.to_le_bytes();
        let data = [white, black].concat();
        let frame = Frame::new(data, FrameFormat::new(2, 1, PixelFormat::Rgb565), 0);

        assert_eq!(to_grayscale(&frame).as_ref(), &[255, 0]);
    }
}
