use crate::config::DecodeConfig;
use crate::duration;
use crate::error::{ContainerError, Error, HeaderError, InvalidData, Result};
use crate::event::{Event, EventKind, Tick};
use crate::file::{MidiFile, Track};
use crate::reader::ChunkReader;
use crate::tempo::Timing;

const MTHD: [u8; 4] = *b"MThd";
const MTRK: [u8; 4] = *b"MTrk";
const RIFF: [u8; 4] = *b"RIFF";
const RMID: [u8; 4] = *b"RMID";
const DATA: [u8; 4] = *b"data";

const MIN_HEADER_LEN: u32 = 6;
const MAX_TRACKS: u16 = 1000;
const MAX_CHUNK_LEN: u32 = 0x1000_0000;

const META_EVENT: u8 = 0xff;
const SYSEX_START: u8 = 0xf0;
const SYSEX_CONTINUE: u8 = 0xf7;

const META_TEXT: u8 = 0x01;
const META_LYRIC: u8 = 0x05;
const META_PORT: u8 = 0x21;
const META_END_OF_TRACK: u8 = 0x2f;
const META_TEMPO: u8 = 0x51;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Container {
  Smf,
  Rmid,
}

/// Cheap detection of the file container from its first bytes.
pub fn probe(bytes: &[u8]) -> Option<Container> {
  let mut reader = ChunkReader::new(bytes);
  match reader.read_id().ok()? {
    MTHD => Some(Container::Smf),
    RIFF => {
      reader.skip(4).ok()?;
      (reader.read_id().ok()? == RMID).then_some(Container::Rmid)
    }
    _ => None,
  }
}

/// Decodes a Standard MIDI File, optionally wrapped in a RIFF `RMID`
/// container. Any error aborts the whole file.
pub fn decode(bytes: &[u8], config: &DecodeConfig) -> Result<MidiFile> {
  let mut reader = ChunkReader::new(bytes);

  let id = reader.read_id()?;
  match id {
    RIFF => {
      log::debug!("RIFF chunk found, processing...");
      read_riff(&mut reader)?;
    }
    MTHD => log::debug!("MThd chunk found, processing..."),
    _ => return Err(Error::MalformedContainer(ContainerError::UnknownMagic)),
  }

  let mut file = SmfDecoder::new(reader, config).read_smf()?;

  file.set_duration(duration::estimate(&file));
  log::debug!("Song length calculated: {} ms", file.length_millis());

  Ok(file)
}

/// Positions the reader just after the `MThd` id inside the `data` chunk.
fn read_riff(reader: &mut ChunkReader) -> Result<()> {
  // file length
  reader.skip(4)?;

  if reader.read_id()? != RMID {
    return Err(Error::MalformedContainer(ContainerError::NotRmid));
  }

  loop {
    let id = reader.read_id()?;
    let len = reader.read_u32_le()?;
    if id == DATA {
      break;
    }
    // chunks are padded to an even length
    let padded = (u64::from(len) + 1) & !1;
    reader.skip(padded as usize)?;
  }

  match reader.read_id() {
    Ok(MTHD) => Ok(()),
    Ok(_) => Err(Error::MalformedContainer(ContainerError::MissingHeader)),
    Err(err) => Err(err),
  }
}

struct SmfDecoder<'a, 'c> {
  reader: ChunkReader<'a>,
  config: &'c DecodeConfig,
}

impl<'a, 'c> SmfDecoder<'a, 'c> {
  fn new(reader: ChunkReader<'a>, config: &'c DecodeConfig) -> Self {
    Self { reader, config }
  }

  fn read_smf(mut self) -> Result<MidiFile> {
    let header_len = self.reader.read_u32_be()?;
    if header_len < MIN_HEADER_LEN {
      return Err(Error::MalformedHeader(HeaderError::Length(header_len)));
    }

    let format = self.reader.read_u16_be()?;
    if format != 0 && format != 1 {
      return Err(Error::UnsupportedFormat(format));
    }

    let num_tracks = self.reader.read_u16_be()?;
    if !(1..=MAX_TRACKS).contains(&num_tracks) {
      return Err(Error::MalformedHeader(HeaderError::TrackCount(num_tracks)));
    }

    let division_offset = self.reader.offset();
    let time_division = self.reader.read_u16_be()?;
    if time_division == 0 {
      return Err(Error::MalformedHeader(HeaderError::TimeDivision(
        time_division,
      )));
    }
    let timing = Timing::from_division(time_division)
      .map_err(|reason| Error::invalid(division_offset, reason))?;

    log::debug!("Time division: {}", time_division);
    log::debug!("Tempo: {}", timing.initial_tempo);
    log::debug!("PPQ: {}", timing.ppq);

    self
      .reader
      .skip((header_len - MIN_HEADER_LEN) as usize)?;

    let tracks = (0..num_tracks)
      .map(|_| {
        let mut chunk = self.find_track_chunk()?;
        TrackDecoder::new(&mut chunk, self.config, timing.smpte).read_track()
      })
      .collect::<Result<Vec<Track>>>()?;

    Ok(MidiFile::from_tracks(format, time_division, timing, tracks))
  }

  /// Skips unknown chunks until an `MTrk` one is found.
  fn find_track_chunk(&mut self) -> Result<ChunkReader<'a>> {
    loop {
      let id = self.reader.read_id()?;
      let len = self.reader.read_u32_be()?;

      if len >= MAX_CHUNK_LEN {
        return Err(Error::MalformedContainer(ContainerError::ChunkLength(len)));
      }

      if id == MTRK {
        return Ok(self.reader.sub_reader(len as usize));
      }

      log::debug!(
        "Skipping unknown chunk {:?} ({} bytes)",
        String::from_utf8_lossy(&id),
        len
      );
      self.reader.skip(len as usize)?;
    }
  }
}

struct TrackDecoder<'r, 'a, 'c> {
  reader: &'r mut ChunkReader<'a>,
  config: &'c DecodeConfig,
  smpte_timing: bool,
  track: Track,
  tick: Tick,
  port: u8,
  running_status: u8,
}

impl<'r, 'a, 'c> TrackDecoder<'r, 'a, 'c> {
  fn new(reader: &'r mut ChunkReader<'a>, config: &'c DecodeConfig, smpte_timing: bool) -> Self {
    Self {
      reader,
      config,
      smpte_timing,
      track: Track::new(),
      tick: 0,
      port: 0,
      running_status: 0,
    }
  }

  fn read_track(mut self) -> Result<Track> {
    while !self.reader.is_eof() {
      let delta = self.reader.read_var()?;
      self.tick = self.tick.saturating_add(delta);

      let status_offset = self.reader.offset();
      let byte = self.reader.read_byte()?;
      let status = if byte & 0x80 != 0 {
        if byte < 0xf0 {
          self.running_status = byte;
        }
        self.read_status(byte, status_offset)?
      } else {
        if self.running_status == 0 {
          return Err(Error::invalid(
            status_offset,
            InvalidData::MissingRunningStatus,
          ));
        }
        let status = self.running_status;
        self.read_channel_message(status, Some(byte))?;
        Status::Continue
      };

      if status == Status::EndOfTrack {
        return Ok(self.track);
      }
    }

    Err(Error::invalid(
      self.reader.offset(),
      InvalidData::MissingEndOfTrack,
    ))
  }

  fn read_status(&mut self, status: u8, offset: usize) -> Result<Status> {
    match status {
      0x80..=0xef => {
        self.read_channel_message(status, None)?;
        Ok(Status::Continue)
      }
      SYSEX_START | SYSEX_CONTINUE => {
        self.read_sysex(status)?;
        Ok(Status::Continue)
      }
      META_EVENT => self.read_meta(),
      _ => Err(Error::invalid(offset, InvalidData::Status(status))),
    }
  }

  fn read_data(&mut self, first: &mut Option<u8>) -> Result<u8> {
    match first.take() {
      Some(byte) => Ok(byte & 0x7f),
      None => Ok(self.reader.read_byte()? & 0x7f),
    }
  }

  /// `first` holds the data byte already consumed when running status is used.
  fn read_channel_message(&mut self, status: u8, mut first: Option<u8>) -> Result<()> {
    let channel = status & 0x0f;
    let tick = self.tick;

    let kind = match status >> 4 {
      0x8 | 0x9 | 0xa => {
        let note = self.read_data(&mut first)?;
        let note = if channel != DecodeConfig::DRUM_CHANNEL {
          self.config.transpose_note(note)
        } else {
          self.config.shift_drum_note(note)
        };
        let value = self.read_data(&mut first)?;

        let kind = match status >> 4 {
          0x8 => EventKind::NoteOff {
            channel,
            note,
            velocity: value,
          },
          0x9 => EventKind::NoteOn {
            channel,
            note,
            velocity: value,
          },
          _ => EventKind::KeyPressure {
            channel,
            note,
            pressure: value,
          },
        };

        if matches!(kind, EventKind::NoteOn { .. }) && self.track.start_tick.is_none() {
          self.track.start_tick = Some(tick);
        }
        kind
      }
      0xb => EventKind::Controller {
        channel,
        controller: self.read_data(&mut first)?,
        value: self.read_data(&mut first)?,
      },
      0xe => {
        let lsb = i16::from(self.read_data(&mut first)?);
        let msb = i16::from(self.read_data(&mut first)?);
        EventKind::PitchBend {
          channel,
          value: ((msb << 7) | lsb) - 8192,
        }
      }
      0xc => EventKind::ProgramChange {
        channel,
        program: self.read_data(&mut first)?,
      },
      _ => EventKind::ChannelPressure {
        channel,
        pressure: self.read_data(&mut first)?,
      },
    };

    if matches!(self.track.start_tick, Some(start) if tick >= start) {
      self.track.end_tick = Some(tick);
    }

    self.push(kind);
    Ok(())
  }

  fn read_sysex(&mut self, status: u8) -> Result<()> {
    let len = self.reader.read_var()? as usize;
    let payload = self.reader.read_bytes(len)?;

    let mut data = Vec::with_capacity(len + 1);
    if status == SYSEX_START {
      data.push(SYSEX_START);
    }
    data.extend_from_slice(payload);

    self.push(EventKind::SysEx(data));
    Ok(())
  }

  fn read_meta(&mut self) -> Result<Status> {
    let meta_offset = self.reader.offset();
    let meta = self.reader.read_byte()?;
    let len = self.reader.read_var()?;

    match meta {
      META_PORT => {
        check_meta_length(meta_offset, meta, len, 1)?;
        self.port = self.reader.read_byte()? % self.config.port_count.max(1);
        self.reader.skip(len as usize - 1)?;
      }
      META_END_OF_TRACK => {
        if !self.config.skip_leading {
          self.track.start_tick = Some(0);
        }
        if !self.config.skip_trailing {
          self.track.end_tick = Some(self.tick);
        }
        // whatever follows in this chunk is ignored
        return Ok(Status::EndOfTrack);
      }
      META_TEMPO => {
        check_meta_length(meta_offset, meta, len, 3)?;
        if self.smpte_timing {
          // SMPTE timing doesn't change
          self.reader.skip(len as usize)?;
        } else {
          let tempo = self.reader.read_u24_be()?;
          self.reader.skip(len as usize - 3)?;
          self.push(EventKind::Tempo(tempo));
        }
      }
      META_TEXT => {
        let text = self.read_text(len)?;
        self.push(EventKind::Text(text));
      }
      META_LYRIC => {
        let text = self.read_text(len)?;
        self.push(EventKind::Lyric(text));
      }
      _ => self.reader.skip(len as usize)?,
    }

    Ok(Status::Continue)
  }

  /// Text that is not valid UTF-8 is taken as Latin-1.
  fn read_text(&mut self, len: u32) -> Result<String> {
    let bytes = self.reader.read_bytes(len as usize)?;
    Ok(match std::str::from_utf8(bytes) {
      Ok(text) => text.to_string(),
      Err(_) => bytes.iter().map(|byte| char::from(*byte)).collect(),
    })
  }

  fn push(&mut self, kind: EventKind) {
    self.track.push(Event::new(self.tick, self.port, kind));
  }
}

fn check_meta_length(offset: usize, meta: u8, length: u32, min: u32) -> Result<()> {
  if length < min {
    Err(Error::invalid(offset, InvalidData::MetaLength { meta, length }))
  } else {
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
  Continue,
  EndOfTrack,
}
