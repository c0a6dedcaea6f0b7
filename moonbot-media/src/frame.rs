//! Frame types

use crate::error::{MediaError, MediaResult};
use chrono::{DateTime, Local};
use moonbot_core::Resolution;

/// Raw RGB24 frame from the camera, one capture instant
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Packed RGB, 3 bytes per pixel, row-major
    pub data: Vec<u8>,
    /// Wall-clock capture time
    pub captured_at: DateTime<Local>,
}

impl Frame {
    /// Bytes per RGB24 pixel
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Build a frame, checking the buffer against the dimensions
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MediaResult<Self> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if data.len() != expected || expected == 0 {
            return Err(MediaError::InvalidFrameData {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            captured_at: Local::now(),
        })
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

/// Compressed JPEG derived from a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Encoded width
    pub width: u32,
    /// Encoded height
    pub height: u32,
    /// JPEG quality used (1-100)
    pub quality: u8,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Bounding box and quality for one encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeTarget {
    pub resolution: Resolution,
    pub quality: u8,
}

impl EncodeTarget {
    pub fn new(resolution: Resolution, quality: u8) -> Self {
        Self {
            resolution,
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_checked() {
        assert!(Frame::new(4, 2, vec![0; 24]).is_ok());
        assert!(matches!(
            Frame::new(4, 2, vec![0; 23]),
            Err(MediaError::InvalidFrameData {
                expected: 24,
                actual: 23
            })
        ));
        assert!(Frame::new(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_frame_resolution() {
        let frame = Frame::new(2, 1, vec![255; 6]).unwrap();
        assert_eq!(frame.resolution(), Resolution::new(2, 1));
    }
}
