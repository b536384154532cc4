use crate::duration::Duration;
use crate::event::{Event, Tempo, Tick};
use crate::tempo::Timing;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
  pub events: Vec<Event>,
  /// Tick of the first note-on, or 0 when leading silence is kept.
  pub start_tick: Option<Tick>,
  /// Tick of the last channel event, or of the end of track when trailing
  /// silence is kept.
  pub end_tick: Option<Tick>,
}

impl Track {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub(crate) fn push(&mut self, event: Event) {
    debug_assert!(
      self.events.last().map_or(true, |last| last.tick <= event.tick),
      "track events must be ordered by tick"
    );
    self.events.push(event);
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MidiFile {
  pub format: u16,
  pub time_division: u16,
  pub timing: Timing,
  pub tracks: Vec<Track>,
  pub start_tick: Tick,
  pub max_tick: Tick,
  /// Playback length in microseconds, from `start_tick` to `max_tick`.
  pub length: u64,
  pub avg_microsec_per_tick: f64,
  /// Tempo of the whole song, `None` when it changes while playing.
  pub fixed_bpm: Option<u32>,
  /// Tempo averaged over the playable range, weighted by ticks.
  pub average_bpm: u32,
}

impl MidiFile {
  pub fn ppq(&self) -> u32 {
    self.timing.ppq
  }

  pub fn initial_tempo(&self) -> Tempo {
    self.timing.initial_tempo
  }

  pub fn smpte_timing(&self) -> bool {
    self.timing.smpte
  }

  pub fn length_millis(&self) -> u64 {
    self.length / 1000
  }

  /// Length and tempo figures computed when the file was decoded.
  pub fn duration(&self) -> Duration {
    Duration {
      length: self.length,
      fixed_bpm: self.fixed_bpm,
      average_bpm: self.average_bpm,
    }
  }

  pub(crate) fn set_duration(&mut self, duration: Duration) {
    self.length = duration.length;
    self.avg_microsec_per_tick = duration.avg_microsec_per_tick(self);
    self.fixed_bpm = duration.fixed_bpm;
    self.average_bpm = duration.average_bpm;
  }

  /// Approximates the tick for a playback offset using the average tempo,
  /// clamped to the playable range.
  pub fn tick_at_micros(&self, micros: u64) -> Tick {
    let offset = if self.avg_microsec_per_tick > 0.0 {
      (micros as f64 / self.avg_microsec_per_tick) as u64
    } else {
      0
    };
    let tick = u64::from(self.start_tick).saturating_add(offset);
    self.clamp_seek_tick(tick.min(u64::from(Tick::MAX)) as Tick)
  }

  /// Approximates the playback offset of a tick using the average tempo.
  pub fn micros_at_tick(&self, tick: Tick) -> u64 {
    let ticks = tick.saturating_sub(self.start_tick);
    (f64::from(ticks) * self.avg_microsec_per_tick).round() as u64
  }

  pub fn clamp_seek_tick(&self, tick: Tick) -> Tick {
    let last = self.max_tick.saturating_sub(1).max(self.start_tick);
    tick.clamp(self.start_tick, last)
  }

  pub(crate) fn from_tracks(
    format: u16,
    time_division: u16,
    timing: Timing,
    tracks: Vec<Track>,
  ) -> Self {
    let start_tick = tracks
      .iter()
      .filter_map(|track| track.start_tick)
      .min()
      .unwrap_or(0);
    let max_tick = tracks
      .iter()
      .filter_map(|track| track.end_tick)
      .max()
      .unwrap_or(0);

    Self {
      format,
      time_division,
      timing,
      tracks,
      start_tick,
      max_tick,
      length: 0,
      avg_microsec_per_tick: 0.0,
      fixed_bpm: None,
      average_bpm: 0,
    }
  }
}
