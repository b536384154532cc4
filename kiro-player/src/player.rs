use std::sync::Arc;
use std::thread::{self, JoinHandle};

use kiro_smf::MidiFile;

use crate::backend::Backend;
use crate::controls::{Controls, Position, Status};
use crate::error::{PlayerError, Result};
use crate::scheduler::{Outcome, Scheduler};

/// A song being played on its own thread.
///
/// Dropping the player stops playback and waits for the thread to finish.
pub struct Player {
  controls: Arc<Controls>,
  thread: Option<JoinHandle<Result<Outcome>>>,
}

impl Player {
  pub fn start<B>(file: MidiFile, backend: B) -> Result<Self>
  where
    B: Backend + Send + 'static,
  {
    let controls = Arc::new(Controls::new());
    let thread_controls = Arc::clone(&controls);

    log::info!(
      "Starting playback: {} tracks, {} ms",
      file.tracks.len(),
      file.length_millis()
    );

    let thread = thread::Builder::new()
      .name("kiro-player".to_string())
      .spawn(move || {
        let mut scheduler = Scheduler::new(&file, backend);
        let result = scheduler.run(&thread_controls);
        thread_controls.finish();
        result
      })?;

    Ok(Self {
      controls,
      thread: Some(thread),
    })
  }

  pub fn pause(&self) {
    self.controls.pause();
  }

  pub fn resume(&self) {
    self.controls.resume();
  }

  /// Moves playback to an offset in microseconds, also while paused.
  pub fn seek(&self, micros: u64) {
    self.controls.seek(micros);
  }

  pub fn stop(&self) {
    self.controls.stop();
  }

  pub fn status(&self) -> Status {
    self.controls.status()
  }

  pub fn position(&self) -> Position {
    self.controls.position()
  }

  pub fn is_finished(&self) -> bool {
    self.controls.is_finished()
  }

  /// Waits for playback to end, either at the end of the song or after a stop.
  pub fn join(mut self) -> Result<Outcome> {
    self.join_thread()
  }

  fn join_thread(&mut self) -> Result<Outcome> {
    let thread = self.thread.take().ok_or(PlayerError::NotRunning)?;
    thread.join().map_err(|_| PlayerError::ThreadPanicked)?
  }
}

impl Drop for Player {
  fn drop(&mut self) {
    if self.thread.is_some() {
      self.controls.stop();
      if let Err(err) = self.join_thread() {
        log::error!("Playback ended with an error: {}", err);
      }
    }
  }
}
