use ringbuf::{Consumer, RingBuffer};
use std::thread;
use std::time::{Duration, Instant};

use kiro_smf::Tempo;

use crate::audio::{AudioFormat, FrameClock};
use crate::backend::{Backend, CommandHandler, Stamp};
use crate::config::PlayerConfig;
use crate::error::BackendError;

const BACKPRESSURE_POLL: Duration = Duration::from_millis(1);

/// One call made to a [`CommandBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Prepare,
  Reset,
  AllNotesOff,
  NoteOn {
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  },
  NoteOff {
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  },
  KeyPressure {
    stamp: Stamp,
    channel: u8,
    note: u8,
    pressure: u8,
  },
  Controller {
    stamp: Stamp,
    channel: u8,
    controller: u8,
    value: u8,
  },
  ProgramChange {
    stamp: Stamp,
    channel: u8,
    program: u8,
  },
  ChannelPressure {
    stamp: Stamp,
    channel: u8,
    pressure: u8,
  },
  PitchBend {
    stamp: Stamp,
    channel: u8,
    value: i16,
  },
  SysEx {
    stamp: Stamp,
    data: Vec<u8>,
  },
  Tempo {
    stamp: Stamp,
    tempo: Tempo,
  },
  Generate {
    micros: u64,
    frames: u64,
  },
}

/// Backend that forwards every call as a [`Command`] to a handler, leaving
/// the actual synthesis to whoever consumes them.
#[derive(Debug)]
pub struct CommandBackend {
  handler: CommandHandler,
  clock: FrameClock,
  realtime: bool,
  backpressure: Option<Duration>,
}

impl CommandBackend {
  pub fn new<H>(handler: H, format: AudioFormat) -> Self
  where
    H: Into<CommandHandler>,
  {
    Self {
      handler: handler.into(),
      clock: FrameClock::new(format),
      realtime: false,
      backpressure: None,
    }
  }

  pub fn from_config<H>(handler: H, config: &PlayerConfig) -> Self
  where
    H: Into<CommandHandler>,
  {
    Self::new(handler, config.audio).with_realtime(config.realtime)
  }

  /// Backend writing into a ring buffer sized from the config, along with
  /// the consumer side of it.
  pub fn with_ring_buffer(config: &PlayerConfig) -> (Self, Consumer<Command>) {
    let (producer, consumer) = RingBuffer::new(config.command_buffer_size).split();
    (Self::from_config(producer, config), consumer)
  }

  /// Sleeps for as long as the generated audio lasts.
  pub fn with_realtime(mut self, realtime: bool) -> Self {
    self.realtime = realtime;
    self
  }

  /// Waits up to `timeout` for the consumer to make room in a full ring
  /// buffer before failing with [`BackendError::BufferFull`].
  pub fn with_backpressure(mut self, timeout: Duration) -> Self {
    self.backpressure = Some(timeout);
    self
  }

  fn send(&mut self, command: Command) -> Result<(), BackendError> {
    let timeout = match self.backpressure {
      Some(timeout) => timeout,
      None => return self.handler.call(command),
    };

    let deadline = Instant::now() + timeout;
    let mut pending = command;
    loop {
      match self.handler.try_call(pending) {
        Ok(()) => return Ok(()),
        Err(command) if Instant::now() < deadline => {
          pending = command;
          thread::sleep(BACKPRESSURE_POLL);
        }
        Err(command) => {
          log::error!("Command buffer still full after {:?}: {:?}", timeout, command);
          return Err(BackendError::BufferFull);
        }
      }
    }
  }
}

impl Backend for CommandBackend {
  fn prepare(&mut self) -> Result<(), BackendError> {
    self.send(Command::Prepare)
  }

  fn reset(&mut self) -> Result<(), BackendError> {
    self.clock.reset();
    self.send(Command::Reset)
  }

  fn note_on(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::NoteOn {
      stamp,
      channel,
      note,
      velocity,
    })
  }

  fn note_off(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    velocity: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::NoteOff {
      stamp,
      channel,
      note,
      velocity,
    })
  }

  fn key_pressure(
    &mut self,
    stamp: Stamp,
    channel: u8,
    note: u8,
    pressure: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::KeyPressure {
      stamp,
      channel,
      note,
      pressure,
    })
  }

  fn controller(
    &mut self,
    stamp: Stamp,
    channel: u8,
    controller: u8,
    value: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::Controller {
      stamp,
      channel,
      controller,
      value,
    })
  }

  fn program_change(
    &mut self,
    stamp: Stamp,
    channel: u8,
    program: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::ProgramChange {
      stamp,
      channel,
      program,
    })
  }

  fn channel_pressure(
    &mut self,
    stamp: Stamp,
    channel: u8,
    pressure: u8,
  ) -> Result<(), BackendError> {
    self.send(Command::ChannelPressure {
      stamp,
      channel,
      pressure,
    })
  }

  fn pitch_bend(&mut self, stamp: Stamp, channel: u8, value: i16) -> Result<(), BackendError> {
    self.send(Command::PitchBend {
      stamp,
      channel,
      value,
    })
  }

  fn sysex(&mut self, stamp: Stamp, data: &[u8]) -> Result<(), BackendError> {
    self.send(Command::SysEx {
      stamp,
      data: data.to_vec(),
    })
  }

  fn tempo(&mut self, stamp: Stamp, tempo: Tempo) -> Result<(), BackendError> {
    self.send(Command::Tempo { stamp, tempo })
  }

  fn all_notes_off(&mut self) -> Result<(), BackendError> {
    self.send(Command::AllNotesOff)
  }

  fn generate_audio(&mut self, micros: u64) -> Result<(), BackendError> {
    let frames = self.clock.advance(micros);
    self.send(Command::Generate { micros, frames })?;

    if self.realtime {
      let format = *self.clock.format();
      for chunk in self.clock.chunks(frames) {
        thread::sleep(format.frames_to_duration(chunk));
      }
    }

    Ok(())
  }

  fn audio_format(&self) -> AudioFormat {
    *self.clock.format()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[test]
  fn forwards_calls_as_commands() -> anyhow::Result<()> {
    let commands = Arc::new(Mutex::new(Vec::new()));
    let commands_clone = commands.clone();
    let mut backend = CommandBackend::new(
      move |command: Command| commands_clone.lock().push(command),
      AudioFormat::default(),
    );
    let stamp = Stamp {
      port: 0,
      tick_real: 96,
    };

    backend.prepare()?;
    backend.note_on(stamp, 0, 60, 100)?;
    backend.generate_audio(500_000)?;
    backend.sysex(stamp, &[0xf0, 0x7e, 0xf7])?;
    backend.all_notes_off()?;
    backend.reset()?;

    assert_eq!(
      *commands.lock(),
      vec![
        Command::Prepare,
        Command::NoteOn {
          stamp,
          channel: 0,
          note: 60,
          velocity: 100
        },
        Command::Generate {
          micros: 500_000,
          frames: 22_050
        },
        Command::SysEx {
          stamp,
          data: vec![0xf0, 0x7e, 0xf7]
        },
        Command::AllNotesOff,
        Command::Reset,
      ]
    );

    Ok(())
  }

  #[test]
  fn generate_fails_when_the_buffer_is_full() {
    let (producer, _consumer) = ringbuf::RingBuffer::<Command>::new(1).split();
    let mut backend = CommandBackend::new(producer, AudioFormat::default());

    assert_eq!(backend.generate_audio(10), Ok(()));
    assert_eq!(backend.generate_audio(10), Err(BackendError::BufferFull));
  }

  #[test]
  fn ring_buffer_is_sized_from_the_config() {
    let config = PlayerConfig {
      command_buffer_size: 2,
      ..Default::default()
    };
    let (mut backend, mut consumer) = CommandBackend::with_ring_buffer(&config);

    assert_eq!(backend.reset(), Ok(()));
    assert_eq!(backend.all_notes_off(), Ok(()));
    assert_eq!(backend.reset(), Err(BackendError::BufferFull));

    assert_eq!(consumer.pop(), Some(Command::Reset));
    assert_eq!(consumer.pop(), Some(Command::AllNotesOff));
    assert_eq!(consumer.pop(), None);
  }

  #[test]
  fn backpressure_waits_for_the_consumer() -> anyhow::Result<()> {
    let config = PlayerConfig {
      command_buffer_size: 4,
      ..Default::default()
    };
    let (backend, mut consumer) = CommandBackend::with_ring_buffer(&config);
    let mut backend = backend.with_backpressure(Duration::from_secs(5));

    let reader = thread::spawn(move || {
      let mut received = Vec::new();
      while received.len() < 64 {
        match consumer.pop() {
          Some(command) => received.push(command),
          None => thread::sleep(Duration::from_millis(1)),
        }
      }
      received
    });

    let stamp = Stamp::default();
    for value in 0..64 {
      backend.controller(stamp, 0, 7, value)?;
    }

    let received = reader.join().map_err(|_| anyhow::anyhow!("reader panicked"))?;
    let values: Vec<u8> = received
      .iter()
      .filter_map(|command| match command {
        Command::Controller { value, .. } => Some(*value),
        _ => None,
      })
      .collect();
    assert_eq!(values, (0..64).collect::<Vec<u8>>());

    Ok(())
  }

  #[test]
  fn backpressure_gives_up_after_the_timeout() {
    let config = PlayerConfig {
      command_buffer_size: 1,
      ..Default::default()
    };
    let (backend, _consumer) = CommandBackend::with_ring_buffer(&config);
    let mut backend = backend.with_backpressure(Duration::from_millis(20));

    assert_eq!(backend.reset(), Ok(()));
    assert_eq!(backend.reset(), Err(BackendError::BufferFull));
  }

  #[test]
  fn takes_the_audio_format_from_the_config() {
    let config = PlayerConfig {
      audio: AudioFormat {
        channels: 1,
        bit_depth: 16,
        sample_rate: 22_050,
      },
      ..Default::default()
    };
    let backend = CommandBackend::from_config(|_: Command| {}, &config);

    assert_eq!(backend.audio_format().sample_rate, 22_050);
  }
}
