/// Absolute position in MIDI ticks.
pub type Tick = u32;

/// Microseconds per quarter note.
pub type Tempo = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
  pub tick: Tick,
  pub port: u8,
  pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
  NoteOn {
    channel: u8,
    note: u8,
    velocity: u8,
  },
  NoteOff {
    channel: u8,
    note: u8,
    velocity: u8,
  },
  KeyPressure {
    channel: u8,
    note: u8,
    pressure: u8,
  },
  Controller {
    channel: u8,
    controller: u8,
    value: u8,
  },
  ProgramChange {
    channel: u8,
    program: u8,
  },
  ChannelPressure {
    channel: u8,
    pressure: u8,
  },
  PitchBend {
    channel: u8,
    /// signed value centered at 0, in the range -8192..=8191
    value: i16,
  },
  SysEx(Vec<u8>),
  Tempo(Tempo),
  Text(String),
  Lyric(String),
}

impl Event {
  pub fn new(tick: Tick, port: u8, kind: EventKind) -> Self {
    Self { tick, port, kind }
  }

  pub fn is_tempo(&self) -> bool {
    matches!(self.kind, EventKind::Tempo(_))
  }
}

impl EventKind {
  /// Whether replaying this event changes sequencer state without sounding
  /// anything, so it has to be replayed when skipping to a later position.
  pub fn affects_state(&self) -> bool {
    matches!(
      self,
      EventKind::Controller { .. }
        | EventKind::ProgramChange { .. }
        | EventKind::ChannelPressure { .. }
        | EventKind::PitchBend { .. }
        | EventKind::SysEx(_)
        | EventKind::Tempo(_)
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_non_sounding_events_affect_state() {
    let sounding = [
      EventKind::NoteOn {
        channel: 0,
        note: 60,
        velocity: 100,
      },
      EventKind::NoteOff {
        channel: 0,
        note: 60,
        velocity: 0,
      },
      EventKind::KeyPressure {
        channel: 0,
        note: 60,
        pressure: 10,
      },
      EventKind::Text("intro".to_string()),
    ];
    let state = [
      EventKind::Controller {
        channel: 1,
        controller: 7,
        value: 100,
      },
      EventKind::ProgramChange {
        channel: 1,
        program: 3,
      },
      EventKind::ChannelPressure {
        channel: 1,
        pressure: 3,
      },
      EventKind::PitchBend {
        channel: 1,
        value: -8192,
      },
      EventKind::SysEx(vec![0xf0, 0x7e, 0xf7]),
      EventKind::Tempo(500_000),
    ];

    assert!(sounding.iter().all(|kind| !kind.affects_state()));
    assert!(state.iter().all(EventKind::affects_state));
  }
}
