use crate::event::{Event, Tick};
use crate::file::{MidiFile, Track};

/// One read position per track, merged into a single stream ordered by
/// `(tick, track index)`.
///
/// Every component walking a file owns its own playhead, so estimating the
/// length never disturbs the position used for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Playhead {
  positions: Vec<usize>,
}

impl Playhead {
  pub fn new(file: &MidiFile) -> Self {
    Self {
      positions: vec![0; file.tracks.len()],
    }
  }

  /// Moves every track back to its first event.
  pub fn rewind(&mut self) {
    self.positions.iter_mut().for_each(|position| *position = 0);
  }

  pub fn position(&self, track: usize) -> Option<usize> {
    self.positions.get(track).copied()
  }

  /// Earliest pending event that is not past the end of the song. On equal
  /// ticks the lowest track index wins.
  pub fn next_event<'a>(&self, file: &'a MidiFile) -> Option<(usize, &'a Event)> {
    self.next_until(&file.tracks, file.max_tick)
  }

  /// Like [`Playhead::next_event`] but also returns events lying past the end
  /// of the song, such as trailing meta events.
  pub fn next_event_unbounded<'a>(&self, file: &'a MidiFile) -> Option<(usize, &'a Event)> {
    self.next_until(&file.tracks, Tick::MAX)
  }

  pub fn advance(&mut self, track: usize) {
    match self.positions.get_mut(track) {
      Some(position) => *position += 1,
      None => debug_assert!(false, "advancing unknown track {}", track),
    }
  }

  /// Returns the next event and moves past it.
  pub fn pop<'a>(&mut self, file: &'a MidiFile) -> Option<(usize, &'a Event)> {
    let next = self.next_event(file);
    if let Some((track, _)) = next {
      self.advance(track);
    }
    next
  }

  fn next_until<'a>(&self, tracks: &'a [Track], limit: Tick) -> Option<(usize, &'a Event)> {
    let mut next: Option<(usize, &'a Event)> = None;
    for (index, (track, position)) in tracks.iter().zip(self.positions.iter()).enumerate() {
      if let Some(event) = track.events.get(*position) {
        let earlier = match next {
          Some((_, current)) => event.tick < current.tick,
          None => event.tick <= limit,
        };
        if earlier {
          next = Some((index, event));
        }
      }
    }
    next
  }
}
