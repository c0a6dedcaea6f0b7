//! # MoonBot Media
//!
//! Camera access and image handling for MoonBot. The [`CaptureGateway`] is
//! the only path to the camera device; still captures and every live stream
//! viewer acquire frames through it. Frames are encoded to JPEG by the
//! [`encoder`] and delivered to viewers as `multipart/x-mixed-replace` parts
//! by the [`StreamProducer`].

#![warn(clippy::all)]

pub mod device;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod stream;

#[cfg(feature = "native-camera")]
pub mod native;

// Re-export main types
pub use device::{open_camera, CameraDevice, TestPatternDevice};
pub use encoder::{encode, encode_blocking, fit_within};
pub use error::{MediaError, MediaResult};
pub use frame::{EncodeTarget, EncodedImage, Frame};
pub use gateway::{CaptureGateway, CaptureStats};
pub use stream::{frame_part, FrameStream, StreamProducer, BOUNDARY, CONTENT_TYPE};

#[cfg(feature = "native-camera")]
pub use native::NokhwaDevice;
