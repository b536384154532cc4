pub(crate) mod config;
pub(crate) mod decoder;
pub(crate) mod duration;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod file;
pub(crate) mod info;
pub(crate) mod playhead;
pub mod reader;
pub mod tempo;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ConfigError, DecodeConfig};
pub use decoder::{decode, probe, Container};
pub use duration::{estimate, Duration};
pub use error::{ContainerError, Error, HeaderError, InvalidData, Result};
pub use event::{Event, EventKind, Tempo, Tick};
pub use file::{MidiFile, Track};
pub use info::FileInfo;
pub use playhead::Playhead;
pub use tempo::{TempoClock, Timing, DEFAULT_TEMPO};
