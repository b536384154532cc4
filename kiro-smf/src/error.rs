use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
  #[error("Malformed container: {0}")]
  MalformedContainer(ContainerError),

  #[error("Malformed header: {0}")]
  MalformedHeader(HeaderError),

  #[error("Type {0} format is not supported")]
  UnsupportedFormat(u16),

  #[error("Unexpected end of data (offset {offset:#x})")]
  TruncatedStream { offset: usize },

  #[error("Invalid MIDI data (offset {offset:#x}): {reason}")]
  InvalidEvent { offset: usize, reason: InvalidData },
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ContainerError {
  #[error("not a Standard MIDI File")]
  UnknownMagic,

  #[error("RIFF file type is not RMID")]
  NotRmid,

  #[error("RIFF data chunk does not contain SMF data")]
  MissingHeader,

  #[error("invalid chunk length {0}")]
  ChunkLength(u32),
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum HeaderError {
  #[error("header length {0} is too short")]
  Length(u32),

  #[error("invalid number of tracks ({0})")]
  TrackCount(u16),

  #[error("invalid time division ({0})")]
  TimeDivision(u16),
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InvalidData {
  #[error("running status without a previous channel message")]
  MissingRunningStatus,

  #[error("variable-length quantity is longer than 4 bytes")]
  VarLenOverflow,

  #[error("unknown status byte {0:#04x}")]
  Status(u8),

  #[error("meta event {meta:#04x} is too short ({length} bytes)")]
  MetaLength { meta: u8, length: u32 },

  #[error("invalid number of SMPTE frames per second ({0})")]
  SmpteFps(u8),

  #[error("track ended without an end-of-track event")]
  MissingEndOfTrack,
}

impl Error {
  pub(crate) fn invalid(offset: usize, reason: InvalidData) -> Self {
    Error::InvalidEvent { offset, reason }
  }
}
