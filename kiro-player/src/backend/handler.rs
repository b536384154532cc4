use ringbuf::Producer;
use std::fmt::{Debug, Formatter};

use crate::backend::Command;
use crate::error::BackendError;

/// Destination of the commands produced by a [`CommandBackend`](crate::backend::CommandBackend).
pub enum CommandHandler {
  Callback(Box<dyn FnMut(Command) + Send + 'static>),
  RingBuffer(Producer<Command>),
}

impl CommandHandler {
  pub(crate) fn call(&mut self, command: Command) -> Result<(), BackendError> {
    self.try_call(command).map_err(|_| BackendError::BufferFull)
  }

  /// Hands the command back when the ring buffer has no room for it.
  pub(crate) fn try_call(&mut self, command: Command) -> Result<(), Command> {
    match self {
      CommandHandler::Callback(ref mut callback) => {
        (callback)(command);
        Ok(())
      }
      CommandHandler::RingBuffer(ref mut producer) => producer.push(command),
    }
  }
}

impl<F> From<F> for CommandHandler
where
  F: FnMut(Command) + Send + 'static,
{
  fn from(callback: F) -> Self {
    CommandHandler::Callback(Box::new(callback))
  }
}

impl From<Producer<Command>> for CommandHandler {
  fn from(producer: Producer<Command>) -> Self {
    CommandHandler::RingBuffer(producer)
  }
}

impl Debug for CommandHandler {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Callback(_) => write!(f, "Callback"),
      Self::RingBuffer(_) => write!(f, "RingBuffer"),
    }
  }
}
