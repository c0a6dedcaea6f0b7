//! JPEG frame encoder
//!
//! Frames larger than the target bounding box are downscaled to fit inside it
//! with their aspect ratio kept. Smaller frames are never upscaled.

use crate::error::{MediaError, MediaResult};
use crate::frame::{EncodeTarget, EncodedImage, Frame};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageBuffer, Rgb};
use moonbot_core::Resolution;

const CODEC: &str = "jpeg";

/// Largest size with the source aspect ratio that fits inside `bound`
pub fn fit_within(source: Resolution, bound: Resolution) -> Resolution {
    if source.width <= bound.width && source.height <= bound.height {
        return source;
    }
    let scale = f64::min(
        bound.width as f64 / source.width as f64,
        bound.height as f64 / source.height as f64,
    );
    Resolution::new(
        ((source.width as f64 * scale).round() as u32).clamp(1, bound.width),
        ((source.height as f64 * scale).round() as u32).clamp(1, bound.height),
    )
}

/// Encode a frame to JPEG within the target bounds
pub fn encode(frame: &Frame, target: EncodeTarget) -> MediaResult<EncodedImage> {
    if !(1..=100).contains(&target.quality) {
        return Err(MediaError::EncodingFailed {
            codec: CODEC.to_string(),
            reason: format!("quality {} outside 1-100", target.quality),
        });
    }
    if target.resolution.is_empty() {
        return Err(MediaError::EncodingFailed {
            codec: CODEC.to_string(),
            reason: format!("empty target resolution {}", target.resolution),
        });
    }

    let source: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or(
            MediaError::InvalidFrameData {
                expected: frame.width as usize * frame.height as usize * Frame::BYTES_PER_PIXEL,
                actual: frame.data.len(),
            },
        )?;

    let size = fit_within(frame.resolution(), target.resolution);
    let scaled = (size != frame.resolution())
        .then(|| imageops::resize(&source, size.width, size.height, FilterType::Triangle));
    let pixels: &[u8] = match &scaled {
        Some(scaled) => scaled.as_raw().as_slice(),
        None => *source.as_raw(),
    };

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, target.quality)
        .encode(pixels, size.width, size.height, ExtendedColorType::Rgb8)
        .map_err(|e| MediaError::EncodingFailed {
            codec: CODEC.to_string(),
            reason: e.to_string(),
        })?;

    Ok(EncodedImage {
        data,
        width: size.width,
        height: size.height,
        quality: target.quality,
    })
}

/// Encode on the blocking pool so async workers stay free
pub async fn encode_blocking(frame: Frame, target: EncodeTarget) -> MediaResult<EncodedImage> {
    tokio::task::spawn_blocking(move || encode(&frame, target))
        .await
        .map_err(|e| MediaError::EncodingFailed {
            codec: CODEC.to_string(),
            reason: format!("encode task failed: {e}"),
        })?
}
