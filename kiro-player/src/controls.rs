use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use kiro_smf::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Playing,
  Paused,
  Stopped,
}

/// What the playback loop has to do before dispatching its next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
  Continue,
  Seek(u64),
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
  pub tick: Tick,
  pub micros: u64,
}

#[derive(Debug)]
struct Mailbox {
  status: Status,
  seek: Option<u64>,
}

/// State shared between the playback thread and whoever controls it.
///
/// The playback loop reads the mailbox once per event with [`Controls::poll`],
/// which is also the only place where it blocks while paused.
#[derive(Debug)]
pub struct Controls {
  mailbox: Mutex<Mailbox>,
  changed: Condvar,
  tick: AtomicU32,
  micros: AtomicU64,
  finished: AtomicBool,
}

impl Controls {
  pub fn new() -> Self {
    Self {
      mailbox: Mutex::new(Mailbox {
        status: Status::Playing,
        seek: None,
      }),
      changed: Condvar::new(),
      tick: AtomicU32::new(0),
      micros: AtomicU64::new(0),
      finished: AtomicBool::new(false),
    }
  }

  pub fn status(&self) -> Status {
    self.mailbox.lock().status
  }

  pub fn pause(&self) {
    self.set_status(Status::Paused);
  }

  pub fn resume(&self) {
    self.set_status(Status::Playing);
  }

  pub fn stop(&self) {
    self.set_status(Status::Stopped);
  }

  /// Replaces any seek that was not served yet.
  pub fn seek(&self, micros: u64) {
    let mut mailbox = self.mailbox.lock();
    mailbox.seek = Some(micros);
    self.changed.notify_all();
  }

  /// Blocks while paused unless there is a seek to serve. Stopping wins over
  /// a pending seek.
  pub fn poll(&self) -> Request {
    let mut mailbox = self.mailbox.lock();
    loop {
      if mailbox.status == Status::Stopped {
        return Request::Stop;
      }
      if let Some(micros) = mailbox.seek.take() {
        return Request::Seek(micros);
      }
      if mailbox.status == Status::Playing {
        return Request::Continue;
      }
      self.changed.wait(&mut mailbox);
    }
  }

  pub fn position(&self) -> Position {
    Position {
      tick: self.tick.load(Ordering::Relaxed),
      micros: self.micros.load(Ordering::Relaxed),
    }
  }

  pub fn is_finished(&self) -> bool {
    self.finished.load(Ordering::Acquire)
  }

  pub(crate) fn report(&self, position: Position) {
    self.tick.store(position.tick, Ordering::Relaxed);
    self.micros.store(position.micros, Ordering::Relaxed);
  }

  pub(crate) fn finish(&self) {
    self.finished.store(true, Ordering::Release);
    self.set_status(Status::Stopped);
  }

  fn set_status(&self, status: Status) {
    let mut mailbox = self.mailbox.lock();
    if mailbox.status != Status::Stopped {
      mailbox.status = status;
    }
    self.changed.notify_all();
  }
}

impl Default for Controls {
  fn default() -> Self {
    Self::new()
  }
}
