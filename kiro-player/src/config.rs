use kiro_smf::DecodeConfig;

use crate::audio::AudioFormat;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
  /// Capacity of the ring buffer used to forward backend commands.
  pub command_buffer_size: usize,
  /// Sleep for the duration of the generated audio.
  pub realtime: bool,
  pub audio: AudioFormat,
}

impl PlayerConfig {
  pub const DEFAULT_COMMAND_BUFFER_SIZE: usize = 4096;
}

impl Default for PlayerConfig {
  fn default() -> Self {
    Self {
      command_buffer_size: Self::DEFAULT_COMMAND_BUFFER_SIZE,
      realtime: false,
      audio: AudioFormat::default(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
  pub decode: DecodeConfig,
  pub player: PlayerConfig,
}
