use crate::error::InvalidData;
use crate::event::{Tempo, Tick};

pub const DEFAULT_TEMPO: Tempo = 500_000;

const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Time base of a file derived from the header's time division field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
  pub ppq: u32,
  pub initial_tempo: Tempo,
  pub smpte: bool,
}

impl Timing {
  pub fn is_smpte(time_division: u16) -> bool {
    time_division & 0x8000 != 0
  }

  /// SMPTE divisions are turned into an equivalent quarter-note based
  /// timing with a fixed tempo.
  pub fn from_division(time_division: u16) -> Result<Self, InvalidData> {
    if !Self::is_smpte(time_division) {
      return Ok(Self {
        ppq: u32::from(time_division),
        initial_tempo: DEFAULT_TEMPO,
        smpte: false,
      });
    }

    // the upper byte is the negative number of frames per second
    let fps = 0x80 - ((time_division >> 8) & 0x7f) as u8;
    let ticks_per_frame = u32::from(time_division & 0xff);

    let (ppq, initial_tempo) = match fps {
      24 => (12 * ticks_per_frame, 500_000),
      25 => (10 * ticks_per_frame, 400_000),
      // 30 drop-frame
      29 => (2997 * ticks_per_frame, 100_000_000),
      30 => (15 * ticks_per_frame, 500_000),
      _ => return Err(InvalidData::SmpteFps(fps)),
    };

    Ok(Self {
      ppq,
      initial_tempo,
      smpte: true,
    })
  }
}

pub fn ticks_to_micros(ticks: Tick, tempo: Tempo, ppq: u32) -> u64 {
  if ppq == 0 {
    return 0;
  }
  u64::from(ticks) * u64::from(tempo) / u64::from(ppq)
}

pub fn tempo_to_bpm(tempo: u64) -> u32 {
  if tempo == 0 {
    0
  } else {
    (MICROS_PER_MINUTE / tempo) as u32
  }
}

/// Integrates a piecewise-constant tempo over ticks.
///
/// Elapsed time is always measured from the last tempo change, so the
/// rounding of every segment happens once and any sum of consecutive spans
/// adds up to the same total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoClock {
  ppq: u32,
  tempo: Tempo,
  anchor_tick: Tick,
  anchor_micros: u64,
}

impl TempoClock {
  pub fn new(ppq: u32, tempo: Tempo, tick: Tick) -> Self {
    Self::anchored(ppq, tempo, tick, 0)
  }

  pub fn anchored(ppq: u32, tempo: Tempo, tick: Tick, micros: u64) -> Self {
    Self {
      ppq,
      tempo,
      anchor_tick: tick,
      anchor_micros: micros,
    }
  }

  pub fn tempo(&self) -> Tempo {
    self.tempo
  }

  pub fn ppq(&self) -> u32 {
    self.ppq
  }

  /// Only valid for ticks at or after the last tempo change.
  pub fn micros_at(&self, tick: Tick) -> u64 {
    debug_assert!(tick >= self.anchor_tick, "tempo clock queried in the past");
    let ticks = tick.saturating_sub(self.anchor_tick);
    self.anchor_micros + ticks_to_micros(ticks, self.tempo, self.ppq)
  }

  pub fn span_micros(&self, from: Tick, to: Tick) -> u64 {
    self.micros_at(to).saturating_sub(self.micros_at(from))
  }

  pub fn set_tempo(&mut self, tick: Tick, tempo: Tempo) {
    self.anchor_micros = self.micros_at(tick);
    self.anchor_tick = tick;
    self.tempo = tempo;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metrical_division() {
    let timing = Timing::from_division(480);

    assert_eq!(
      timing,
      Ok(Timing {
        ppq: 480,
        initial_tempo: 500_000,
        smpte: false,
      })
    );
  }

  #[test]
  fn smpte_divisions() {
    let division = |fps: u8, tpf: u8| u16::from_be_bytes([(-(fps as i8)) as u8, tpf]);

    assert_eq!(
      Timing::from_division(division(24, 4)),
      Ok(Timing {
        ppq: 48,
        initial_tempo: 500_000,
        smpte: true
      })
    );
    assert_eq!(
      Timing::from_division(division(25, 40)),
      Ok(Timing {
        ppq: 400,
        initial_tempo: 400_000,
        smpte: true
      })
    );
    assert_eq!(
      Timing::from_division(division(29, 2)),
      Ok(Timing {
        ppq: 5994,
        initial_tempo: 100_000_000,
        smpte: true
      })
    );
    assert_eq!(
      Timing::from_division(division(30, 80)),
      Ok(Timing {
        ppq: 1200,
        initial_tempo: 500_000,
        smpte: true
      })
    );
    assert_eq!(
      Timing::from_division(division(23, 10)),
      Err(InvalidData::SmpteFps(23))
    );
  }

  #[test]
  fn converts_ticks_with_the_current_tempo() {
    assert_eq!(ticks_to_micros(480, 500_000, 480), 500_000);
    assert_eq!(ticks_to_micros(240, 250_000, 480), 125_000);
    assert_eq!(ticks_to_micros(1, 500_000, 0), 0);
  }

  #[test]
  fn bpm_from_tempo() {
    assert_eq!(tempo_to_bpm(500_000), 120);
    assert_eq!(tempo_to_bpm(600_000), 100);
    assert_eq!(tempo_to_bpm(0), 0);
  }

  #[test]
  fn clock_reanchors_on_tempo_changes() {
    let mut clock = TempoClock::new(480, 500_000, 0);

    assert_eq!(clock.micros_at(240), 250_000);
    clock.set_tempo(240, 250_000);
    assert_eq!(clock.micros_at(240), 250_000);
    assert_eq!(clock.micros_at(480), 375_000);
    assert_eq!(clock.span_micros(240, 480), 125_000);
  }

  #[test]
  fn clock_spans_add_up_to_the_segment_length() {
    let clock = TempoClock::new(96, 500_001, 0);
    let total: u64 = (0..96u32)
      .map(|tick| clock.span_micros(tick, tick + 1))
      .sum();

    assert_eq!(total, clock.micros_at(96));
  }
}
