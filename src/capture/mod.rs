//! Device discovery and ownership of captured camera/microphone streams.

pub mod devices;
pub mod manager;
pub mod media;

pub use devices::{DeviceEnumerator, DeviceOption};
pub use manager::{CapturedStreams, MediaCaptureManager};
pub use media::{
    AudioConstraints, DeviceKind, MediaConstraints, MediaDeviceInfo, MediaError, MediaHost,
    MediaStream, MediaTrack, TrackKind, VideoConstraints, VideoFrame,
};
