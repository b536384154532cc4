use crate::event::EventKind;
use crate::file::MidiFile;
use crate::playhead::Playhead;
use crate::tempo::{tempo_to_bpm, TempoClock};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
  /// Playback length in microseconds.
  pub length: u64,
  /// Tempo of the whole song, or `None` when it changes after the start.
  pub fixed_bpm: Option<u32>,
  /// Average of the tempo weighted by how long each one lasts, in ticks.
  pub average_bpm: u32,
}

impl Duration {
  pub fn avg_microsec_per_tick(&self, file: &MidiFile) -> f64 {
    let span = file.max_tick.saturating_sub(file.start_tick);
    if span > 0 {
      self.length as f64 / f64::from(span)
    } else {
      0.0
    }
  }
}

/// Walks the tempo events of a file, in playback order, with its own
/// playhead.
pub fn estimate(file: &MidiFile) -> Duration {
  let start_tick = file.start_tick;
  let max_tick = file.max_tick;
  let span = u64::from(max_tick.saturating_sub(start_tick));

  let mut clock = TempoClock::new(file.ppq(), file.initial_tempo(), start_tick);
  let mut last_tick = start_tick;
  let mut weighted_tempo: u64 = 0;
  let mut monotempo = true;

  let mut playhead = Playhead::new(file);
  while let Some((_, event)) = playhead.pop(file) {
    if let EventKind::Tempo(tempo) = event.kind {
      let tick = event.tick.max(start_tick);
      log::trace!("Tempo event ({}) on tick {}", tempo, tick);

      if monotempo && tick > start_tick && tick < max_tick && tempo != clock.tempo() {
        monotempo = false;
      }

      weighted_tempo += u64::from(clock.tempo()) * u64::from(tick - last_tick);
      last_tick = tick;
      clock.set_tempo(tick, tempo);
    }
  }

  let length = if max_tick > start_tick {
    clock.micros_at(max_tick.max(last_tick))
  } else {
    0
  };

  let average_tempo = if span > 0 {
    weighted_tempo += u64::from(clock.tempo()) * u64::from(max_tick.saturating_sub(last_tick));
    weighted_tempo / span
  } else {
    0
  };
  let average_bpm = tempo_to_bpm(average_tempo);

  log::debug!(
    "Length {} us, weighted average tempo {} ({} bpm)",
    length,
    average_tempo,
    average_bpm
  );

  Duration {
    length,
    fixed_bpm: monotempo.then_some(average_bpm),
    average_bpm,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::SmfBuilder;
  use crate::{decode, DecodeConfig};

  #[test]
  fn monotempo_length_matches_the_average_tick_duration() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 480)
      .track(|track| {
        track
          .tempo(0, 600_000)
          .note_on(0, 0, 60, 100)
          .note_off(1000, 0, 60)
          .end(7)
      })
      .build();
    let file = decode(&bytes, &DecodeConfig::default())?;
    let duration = estimate(&file);

    assert_eq!(file.max_tick, 1007);
    assert_eq!(duration.length, 1007 * 600_000 / 480);
    assert_eq!(duration.fixed_bpm, Some(100));
    assert_eq!(duration.average_bpm, 100);
    let span = f64::from(file.max_tick - file.start_tick);
    assert_eq!((file.avg_microsec_per_tick * span).round() as u64, duration.length);

    Ok(())
  }

  #[test]
  fn tempo_changes_make_the_bpm_variable() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(1, 480)
      .track(|track| track.tempo(0, 500_000).tempo(480, 250_000).end(480))
      .track(|track| track.note_on(0, 0, 60, 100).note_off(960, 0, 60).end(0))
      .build();
    let file = decode(&bytes, &DecodeConfig::default())?;
    let duration = estimate(&file);

    assert_eq!(duration.length, 500_000 + 250_000);
    assert_eq!(duration.fixed_bpm, None);
    // (500000 * 480 + 250000 * 480) / 960
    assert_eq!(duration.average_bpm, 160);

    Ok(())
  }

  #[test]
  fn tempo_change_at_the_end_of_the_song_keeps_the_bpm_fixed() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 480)
      .track(|track| {
        track
          .tempo(0, 500_000)
          .note_on(0, 0, 60, 100)
          .note_off(960, 0, 60)
          .tempo(0, 1_000_000)
          .end(0)
      })
      .build();
    let file = decode(&bytes, &DecodeConfig::default())?;
    let duration = estimate(&file);

    assert_eq!(duration.length, 1_000_000);
    assert_eq!(duration.fixed_bpm, Some(120));

    Ok(())
  }

  #[test]
  fn tempo_before_the_first_note_counts_from_the_start() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 480)
      .track(|track| {
        track
          .tempo(0, 500_000)
          .tempo(240, 1_000_000)
          .note_on(240, 0, 60, 100)
          .note_off(480, 0, 60)
          .end(0)
      })
      .build();
    let config = DecodeConfig {
      skip_leading: true,
      ..Default::default()
    };
    let file = decode(&bytes, &config)?;
    let duration = estimate(&file);

    assert_eq!(file.start_tick, 480);
    assert_eq!(file.max_tick, 960);
    assert_eq!(duration.length, 1_000_000);
    assert_eq!(duration.fixed_bpm, Some(60));

    Ok(())
  }

  #[test]
  fn empty_song_has_no_length() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 96).track(|track| track.end(0)).build();
    let file = decode(&bytes, &DecodeConfig::default())?;
    let duration = estimate(&file);

    assert_eq!(duration.length, 0);
    assert_eq!(duration.average_bpm, 0);
    assert_eq!(duration.avg_microsec_per_tick(&file), 0.0);

    Ok(())
  }
}
