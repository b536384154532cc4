use kiro_smf::{EventKind, MidiFile, Playhead, Tempo, Tick};

use crate::backend::{dispatch, Backend, Stamp};
use crate::error::BackendError;

/// Where playback resumes after a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPoint {
  pub tick: Tick,
  /// Tempo in effect at `tick`.
  pub tempo: Tempo,
}

/// Rebuilds the state of the backend at an arbitrary tick by replaying,
/// from the start of the song and without generating any audio, every event
/// that changes that state without sounding.
#[derive(Debug, Clone, Copy)]
pub struct SeekEngine<'a> {
  file: &'a MidiFile,
}

impl<'a> SeekEngine<'a> {
  pub fn new(file: &'a MidiFile) -> Self {
    Self { file }
  }

  /// Tick for a playback offset, estimated with the average tick duration.
  pub fn target_tick(&self, micros: u64) -> Tick {
    self.file.tick_at_micros(micros)
  }

  /// Leaves `playhead` at the first event at or after `target`. Notes are not
  /// replayed. A backend failure aborts the replay, since the state it left
  /// behind is incomplete.
  pub fn replay<B>(
    &self,
    backend: &mut B,
    playhead: &mut Playhead,
    target: Tick,
  ) -> Result<SeekPoint, BackendError>
  where
    B: Backend + ?Sized,
  {
    let file = self.file;
    let mut tempo = file.initial_tempo();

    playhead.rewind();

    loop {
      let (track, event) = match playhead.next_event(file) {
        Some(next) => next,
        None => {
          log::debug!("Reached the end of the song before tick {}", target);
          break;
        }
      };

      if event.tick >= target {
        break;
      }

      playhead.advance(track);

      if event.kind.affects_state() {
        let stamp = Stamp {
          port: event.port,
          tick_real: 0,
        };
        dispatch(backend, stamp, &event.kind)?;

        if let EventKind::Tempo(value) = event.kind {
          tempo = value;
        }
      }
    }

    log::debug!("Seek reached tick {} with tempo {}", target, tempo);

    Ok(SeekPoint {
      tick: target,
      tempo,
    })
  }
}
