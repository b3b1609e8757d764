use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use image::ImageFormat;

use crate::surface::FramePixels;

/// Channel values at or below this read as black.
const BLACK_CHANNEL_MAX: u8 = 10;

/// Stride of the sparse sample, in pixels. Checking every pixel of every
/// sampled frame is wasted work when one bright pixel anywhere settles
/// the question.
const SAMPLE_STRIDE_PIXELS: usize = 100;

/// Coarse brightness check over a sparse pixel sample. DRM-protected and
/// genuinely black frames carry no usable signal, so the detection cycle
/// skips classification for them entirely.
pub(crate) fn is_effectively_black(frame: &FramePixels) -> bool {
    let data = &frame.rgba;
    let mut offset = 0;

    while offset + 2 < data.len() {
        if data[offset] > BLACK_CHANNEL_MAX
            || data[offset + 1] > BLACK_CHANNEL_MAX
            || data[offset + 2] > BLACK_CHANNEL_MAX
        {
            return false;
        }
        offset += SAMPLE_STRIDE_PIXELS * 4;
    }

    true
}

/// Encode the sampled frame for the trip across the evaluator boundary.
pub(crate) fn encode_frame_jpeg(frame: &FramePixels) -> Result<Vec<u8>> {
    let buffer = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
        .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;

    // JPEG carries no alpha channel.
    let rgb = image::DynamicImage::ImageRgba8(buffer).to_rgb8();
    let mut encoded = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .context("failed to encode sampled frame")?;

    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, value: u8) -> FramePixels {
        FramePixels {
            rgba: vec![value; (width * height * 4) as usize],
            width,
            height,
        }
    }

    #[test]
    fn dark_frame_reads_as_black() {
        assert!(is_effectively_black(&solid_frame(64, 64, 0)));
        // At the threshold still counts as black.
        assert!(is_effectively_black(&solid_frame(64, 64, BLACK_CHANNEL_MAX)));
    }

    #[test]
    fn bright_frame_does_not() {
        assert!(!is_effectively_black(&solid_frame(64, 64, 200)));
    }

    #[test]
    fn bright_pixel_on_the_sample_stride_is_seen() {
        let mut frame = solid_frame(64, 64, 0);
        let offset = SAMPLE_STRIDE_PIXELS * 4 * 3;
        frame.rgba[offset + 1] = 180;
        assert!(!is_effectively_black(&frame));
    }

    #[test]
    fn empty_frame_is_treated_as_black() {
        let frame = FramePixels {
            rgba: Vec::new(),
            width: 0,
            height: 0,
        };
        assert!(is_effectively_black(&frame));
    }

    #[test]
    fn encoded_frame_decodes_to_same_dimensions() {
        let frame = solid_frame(32, 16, 150);
        let encoded = encode_frame_jpeg(&frame).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 16);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let frame = FramePixels {
            rgba: vec![0; 10],
            width: 8,
            height: 8,
        };
        assert!(encode_frame_jpeg(&frame).is_err());
    }
}
