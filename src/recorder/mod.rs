//! Recording lifecycle: prepare, start, pause/resume, stop, cancel.

pub mod encoder;
pub mod machine;
pub mod slot;
pub mod state;

pub use encoder::{EncoderError, EncoderEvent, EncoderFactory, StreamEncoder};
pub use machine::{FinishedRecording, Recorder, RecorderDeps, RecorderError};
pub use slot::RecorderSlot;
pub use state::{
    DurationClock, RecordingOptions, RecordingState, RecordingStateHandle, RecordingStatus,
};
