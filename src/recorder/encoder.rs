//! Chunked stream encoder provided by the host.
//!
//! Encoding itself is out of scope for this crate; the recorder only drives
//! the encoder's lifecycle and collects the chunks it emits.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::MediaStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// Encoded data covering roughly one timeslice.
    Chunk(Vec<u8>),
    Error(String),
    /// Emitted once after `stop`, following the last chunk.
    Stopped,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Encoder failed to start: {0}")]
    Start(String),
}

pub trait StreamEncoder: Send {
    fn mime_type(&self) -> String;

    /// Begin encoding `stream`, emitting a chunk every `timeslice`.
    fn start(
        &mut self,
        stream: &MediaStream,
        timeslice: Duration,
        events: mpsc::UnboundedSender<EncoderEvent>,
    ) -> Result<(), EncoderError>;

    /// Suspend without discarding buffered data.
    fn pause(&mut self);

    fn resume(&mut self);

    /// Flush remaining data then emit `EncoderEvent::Stopped`.
    fn stop(&mut self);
}

/// Makes a fresh encoder for every recording session.
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn StreamEncoder>;
}

impl<F> EncoderFactory for F
where
    F: Fn() -> Box<dyn StreamEncoder> + Send + Sync,
{
    fn create(&self) -> Box<dyn StreamEncoder> {
        self()
    }
}
