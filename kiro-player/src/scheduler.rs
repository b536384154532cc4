use kiro_smf::{EventKind, MidiFile, Playhead, Tempo, TempoClock, Tick};

use crate::backend::{dispatch, Backend, Stamp};
use crate::controls::{Controls, Position, Request};
use crate::error::{BackendError, Result};
use crate::seek::SeekEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  Initializing,
  Running,
  Seeking,
  Draining,
  Stopped,
}

/// How a playback session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
  pub position: Position,
  /// The song was played up to its end rather than stopped.
  pub completed: bool,
}

/// Plays a song through a backend, one event at a time.
///
/// Events are taken in `(tick, track index)` order and the audio for the
/// time between two events is generated, with the tempo in effect, before
/// the later one is dispatched.
pub struct Scheduler<'a, B> {
  file: &'a MidiFile,
  backend: B,
  playhead: Playhead,
  clock: TempoClock,
  tick: Tick,
  skip_offset: Tick,
  state: State,
}

impl<'a, B: Backend> Scheduler<'a, B> {
  pub fn new(file: &'a MidiFile, backend: B) -> Self {
    Self {
      file,
      backend,
      playhead: Playhead::new(file),
      clock: TempoClock::new(file.ppq(), file.initial_tempo(), file.start_tick),
      tick: file.start_tick,
      skip_offset: 0,
      state: State::Initializing,
    }
  }

  pub fn state(&self) -> State {
    self.state
  }

  pub fn tick(&self) -> Tick {
    self.tick
  }

  pub fn tempo(&self) -> Tempo {
    self.clock.tempo()
  }

  pub fn playhead(&self) -> &Playhead {
    &self.playhead
  }

  /// Playback offset of the current tick.
  pub fn micros(&self) -> u64 {
    self.clock.micros_at(self.tick)
  }

  pub fn position(&self) -> Position {
    Position {
      tick: self.tick,
      micros: self.micros(),
    }
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  pub fn into_backend(self) -> B {
    self.backend
  }

  pub fn initialize(&mut self) -> Result<()> {
    let file = self.file;

    self.playhead.rewind();
    self.tick = file.start_tick;
    self.skip_offset = 0;
    self.clock = TempoClock::new(file.ppq(), file.initial_tempo(), file.start_tick);

    self.backend.prepare()?;
    self.state = State::Running;
    Ok(())
  }

  /// Dispatches the next event, generating the audio that precedes it.
  /// Returns `false` once there are no events left.
  pub fn step(&mut self) -> Result<bool> {
    let file = self.file;

    let (track, event) = match self.playhead.next_event(file) {
      Some(next) => next,
      None => {
        self.state = State::Draining;
        return Ok(false);
      }
    };

    if event.tick > self.tick {
      self.generate_until(event.tick)?;
    }

    self.playhead.advance(track);

    let stamp = Stamp {
      port: event.port,
      tick_real: event.tick.saturating_sub(self.skip_offset),
    };
    dispatch(&mut self.backend, stamp, &event.kind)?;

    if let EventKind::Tempo(tempo) = event.kind {
      log::debug!("Processing tempo event with value {} on tick {}", tempo, event.tick);
      self.clock.set_tempo(self.tick, tempo);
    }

    Ok(true)
  }

  /// Moves playback to a time offset and returns the tick it resumes from.
  pub fn seek(&mut self, micros: u64) -> Result<Tick> {
    let target = SeekEngine::new(self.file).target_tick(micros);
    self.seek_to_tick(target)
  }

  pub fn seek_to_tick(&mut self, tick: Tick) -> Result<Tick> {
    let file = self.file;
    let previous = self.state;
    self.state = State::Seeking;

    self.silence()?;

    let target = file.clamp_seek_tick(tick);
    let point = SeekEngine::new(file).replay(&mut self.backend, &mut self.playhead, target)?;

    self.tick = point.tick;
    self.skip_offset = point.tick;
    self.clock = TempoClock::anchored(
      file.ppq(),
      point.tempo,
      point.tick,
      file.micros_at_tick(point.tick),
    );

    self.state = match previous {
      State::Initializing => State::Initializing,
      _ => State::Running,
    };

    Ok(self.tick)
  }

  /// Generates the audio left until the end of the song.
  pub fn drain(&mut self) -> Result<()> {
    self.state = State::Draining;
    let max_tick = self.file.max_tick;
    if max_tick > self.tick {
      self.generate_until(max_tick)?;
    }
    Ok(())
  }

  pub fn stop(&mut self) -> Result<()> {
    self.state = State::Stopped;
    self.silence()?;
    Ok(())
  }

  fn silence(&mut self) -> core::result::Result<(), BackendError> {
    self.backend.all_notes_off()?;
    self.backend.reset()
  }

  /// Runs the whole session, serving the requests found in `controls` once
  /// per event. A stop request skips the audio left until the end.
  pub fn run(&mut self, controls: &Controls) -> Result<Outcome> {
    let result = match self.run_loop(controls) {
      Ok(completed) => self.stop().map(|()| completed),
      Err(err) => {
        if let Err(stop_err) = self.stop() {
          log::warn!("Failed to silence the backend: {}", stop_err);
        }
        Err(err)
      }
    };

    match result {
      Ok(completed) => Ok(Outcome {
        position: self.position(),
        completed,
      }),
      Err(err) => {
        log::error!("Playback failed at tick {}: {}", self.tick, err);
        Err(err)
      }
    }
  }

  fn run_loop(&mut self, controls: &Controls) -> Result<bool> {
    self.initialize()?;
    controls.report(self.position());

    loop {
      match controls.poll() {
        Request::Stop => return Ok(false),
        Request::Seek(micros) => {
          let tick = self.seek(micros)?;
          log::debug!("Seek to {} us resumed at tick {}", micros, tick);
          controls.report(self.position());
          continue;
        }
        Request::Continue => {}
      }

      if !self.step()? {
        break;
      }
      controls.report(self.position());
    }

    self.drain()?;
    controls.report(self.position());
    Ok(true)
  }

  fn generate_until(&mut self, tick: Tick) -> core::result::Result<(), BackendError> {
    let micros = self.clock.span_micros(self.tick, tick);
    self.backend.generate_audio(micros)?;
    self.tick = tick;
    Ok(())
  }
}
