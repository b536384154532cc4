mod command;
mod handler;

pub use command::{Command, CommandBackend};
pub use handler::CommandHandler;

use kiro_smf::{EventKind, Tempo, Tick};

use crate::audio::AudioFormat;
use crate::error::BackendError;

/// Routing information attached to every dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamp {
  pub port: u8,
  /// Tick relative to the last seek, 0 for events replayed while seeking.
  pub tick_real: Tick,
}

/// A sequencer or synthesizer able to play the events of a song.
///
/// The scheduler owns the backend for the whole session and never calls it
/// from more than one thread at a time.
pub trait Backend {
  /// Called once before the first event, e.g. to load instruments.
  fn prepare(&mut self) -> Result<(), BackendError> {
    Ok(())
  }

  /// Silences everything and clears any pending state.
  fn reset(&mut self) -> Result<(), BackendError>;

  fn note_on(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  ) -> Result<(), BackendError>;

  fn note_off(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  ) -> Result<(), BackendError>;

  fn key_pressure(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    pressure: u8,
  ) -> Result<(), BackendError>;

  fn controller(
    &mut self,
    stamp: Stamp,
    channel: u8,
    controller: u8,
    value: u8,
  ) -> Result<(), BackendError>;

  fn program_change(
    &mut self,
    stamp: Stamp,
    channel: u8,
    program: u8,
  ) -> Result<(), BackendError>;

  fn channel_pressure(
    &mut self,
    stamp: Stamp,
    channel: u8,
    pressure: u8,
  ) -> Result<(), BackendError>;

  fn pitch_bend(&mut self, stamp: Stamp, channel: u8, value: i16) -> Result<(), BackendError>;

  fn sysex(&mut self, stamp: Stamp, data: &[u8]) -> Result<(), BackendError>;

  fn tempo(&mut self, _stamp: Stamp, _tempo: Tempo) -> Result<(), BackendError> {
    Ok(())
  }

  /// Releases every sounding note, ahead of a reset.
  fn all_notes_off(&mut self) -> Result<(), BackendError> {
    Ok(())
  }

  /// Produces `micros` microseconds of audio with the events sent so far.
  fn generate_audio(&mut self, micros: u64) -> Result<(), BackendError>;

  fn audio_format(&self) -> AudioFormat {
    AudioFormat::default()
  }
}

/// Sends an event to the matching backend call. Text meta events are not
/// played.
pub fn dispatch<B: Backend + ?Sized>(
  backend: &mut B,
  stamp: Stamp,
  kind: &EventKind,
) -> Result<(), BackendError> {
  log::trace!("{:?} {:?}", stamp, kind);

  match *kind {
    EventKind::NoteOn {
      channel,
      note,
      velocity,
    } => backend.note_on(stamp, channel, note, velocity),
    EventKind::NoteOff {
      channel,
      note,
      velocity,
    } => backend.note_off(stamp, channel, note, velocity),
    EventKind::KeyPressure {
      channel,
      note,
      pressure,
    } => backend.key_pressure(stamp, channel, note, pressure),
    EventKind::Controller {
      channel,
      controller,
      value,
    } => backend.controller(stamp, channel, controller, value),
    EventKind::ProgramChange { channel, program } => backend.program_change(stamp, channel, program),
    EventKind::ChannelPressure { channel, pressure } => {
      backend.channel_pressure(stamp, channel, pressure)
    }
    EventKind::PitchBend { channel, value } => backend.pitch_bend(stamp, channel, value),
    EventKind::SysEx(ref data) => backend.sysex(stamp, data),
    EventKind::Tempo(tempo) => backend.tempo(stamp, tempo),
    EventKind::Text(_) | EventKind::Lyric(_) => Ok(()),
  }
}
