use std::time::Duration;

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Format of the audio produced by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
  pub channels: u16,
  pub bit_depth: u16,
  pub sample_rate: u32,
}

impl AudioFormat {
  pub const DEFAULT_CHANNELS: u16 = 2;
  pub const DEFAULT_BIT_DEPTH: u16 = 16;
  pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

  /// Number of frames written to the output at once, a quarter of a second.
  pub fn chunk_frames(&self) -> u64 {
    (u64::from(self.sample_rate) / 4).max(1)
  }

  pub fn frame_bytes(&self) -> usize {
    usize::from(self.channels) * usize::from(self.bit_depth / 8)
  }

  pub fn frames_to_duration(&self, frames: u64) -> Duration {
    if self.sample_rate == 0 {
      return Duration::ZERO;
    }
    Duration::from_micros(frames * MICROS_PER_SECOND / u64::from(self.sample_rate))
  }
}

impl Default for AudioFormat {
  fn default() -> Self {
    Self {
      channels: Self::DEFAULT_CHANNELS,
      bit_depth: Self::DEFAULT_BIT_DEPTH,
      sample_rate: Self::DEFAULT_SAMPLE_RATE,
    }
  }
}

/// Turns spans of microseconds into whole frames.
///
/// The sub-frame remainder of every span is carried over to the next one,
/// so the frames of consecutive spans add up to the frames of their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameClock {
  format: AudioFormat,
  remainder: u64,
}

impl FrameClock {
  pub fn new(format: AudioFormat) -> Self {
    Self {
      format,
      remainder: 0,
    }
  }

  pub fn format(&self) -> &AudioFormat {
    &self.format
  }

  pub fn advance(&mut self, micros: u64) -> u64 {
    let scaled = micros * u64::from(self.format.sample_rate) + self.remainder;
    self.remainder = scaled % MICROS_PER_SECOND;
    scaled / MICROS_PER_SECOND
  }

  pub fn reset(&mut self) {
    self.remainder = 0;
  }

  /// Splits a number of frames into output sized chunks.
  pub fn chunks(&self, frames: u64) -> impl Iterator<Item = u64> {
    let size = self.format.chunk_frames();
    let mut left = frames;
    std::iter::from_fn(move || {
      (left > 0).then(|| {
        let chunk = left.min(size);
        left -= chunk;
        chunk
      })
    })
  }
}
