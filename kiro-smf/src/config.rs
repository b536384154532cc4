use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
  #[error("Invalid value for '{key}': {value}")]
  InvalidValue { key: String, value: String },
}

/// Options applied while decoding, they permanently alter the decoded data.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
  /// Semitones added to every note outside of the drum channel.
  pub transpose: i32,
  /// Offset added to drum channel notes, wrapping around above 127.
  pub drum_shift: u8,
  /// Number of output ports, port meta events are taken modulo this value.
  pub port_count: u8,
  /// Start playback at the first note instead of at tick 0.
  pub skip_leading: bool,
  /// End playback at the last channel event instead of at the end of track.
  pub skip_trailing: bool,
}

impl DecodeConfig {
  pub const DEFAULT_TRANSPOSE: i32 = 0;
  pub const DEFAULT_DRUM_SHIFT: u8 = 0;
  pub const DEFAULT_PORT_COUNT: u8 = 1;

  pub const DRUM_CHANNEL: u8 = 9;

  /// Builds a configuration from key/value pairs, as kept by an external
  /// settings store. Unknown keys are ignored.
  pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (&'a str, &'a str)>,
  {
    let mut config = Self::default();
    for (key, value) in pairs {
      let value = value.trim();
      match key {
        "transpose" => config.transpose = parse(key, value)?,
        "drum_shift" => config.drum_shift = parse(key, value)?,
        "port_count" => {
          config.port_count = parse(key, value)?;
          if config.port_count == 0 {
            return Err(invalid(key, value));
          }
        }
        "skip_leading" => config.skip_leading = parse_bool(key, value)?,
        "skip_trailing" => config.skip_trailing = parse_bool(key, value)?,
        _ => log::debug!("Ignoring unknown decode option '{}'", key),
      }
    }
    Ok(config)
  }

  pub(crate) fn transpose_note(&self, note: u8) -> u8 {
    (i32::from(note) + self.transpose).clamp(0, 127) as u8
  }

  /// The wrap subtracts 127 rather than 128, matching the behaviour players
  /// of these files have always relied on.
  pub(crate) fn shift_drum_note(&self, note: u8) -> u8 {
    let shifted = u16::from(note) + u16::from(self.drum_shift);
    if shifted > 127 {
      (shifted - 127).min(127) as u8
    } else {
      shifted as u8
    }
  }
}

impl Default for DecodeConfig {
  fn default() -> Self {
    Self {
      transpose: Self::DEFAULT_TRANSPOSE,
      drum_shift: Self::DEFAULT_DRUM_SHIFT,
      port_count: Self::DEFAULT_PORT_COUNT,
      skip_leading: false,
      skip_trailing: false,
    }
  }
}

fn invalid(key: &str, value: &str) -> ConfigError {
  ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" => Ok(true),
    "false" | "0" | "no" => Ok(false),
    _ => Err(invalid(key, value)),
  }
}
