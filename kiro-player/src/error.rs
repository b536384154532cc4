use thiserror::Error;

pub type Result<T> = core::result::Result<T, PlayerError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
  #[error("Command buffer is full")]
  BufferFull,

  #[error("Backend is not ready: {0}")]
  NotReady(String),

  #[error("Audio generation failed: {0}")]
  Audio(String),
}

#[derive(Debug, Error)]
pub enum PlayerError {
  #[error("Decode: {0}")]
  Decode(#[from] kiro_smf::Error),

  #[error("Config: {0}")]
  Config(#[from] kiro_smf::ConfigError),

  #[error("Backend: {0}")]
  Backend(#[from] BackendError),

  #[error("Failed to spawn the playback thread: {0}")]
  Spawn(#[from] std::io::Error),

  #[error("The playback thread panicked")]
  ThreadPanicked,

  #[error("The playback thread is not running")]
  NotRunning,
}
