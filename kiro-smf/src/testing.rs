//! Builders for Standard MIDI File fixtures used by tests.

pub struct SmfBuilder {
  format: u16,
  division: u16,
  track_count: Option<u16>,
  chunks: Vec<Vec<u8>>,
}

impl SmfBuilder {
  pub fn new(format: u16, division: u16) -> Self {
    Self {
      format,
      division,
      track_count: None,
      chunks: Vec::new(),
    }
  }

  pub fn track<F>(mut self, build: F) -> Self
  where
    F: FnOnce(TrackBuilder) -> TrackBuilder,
  {
    let track = build(TrackBuilder::default());
    self.chunks.push(chunk(b"MTrk", &track.data));
    self
  }

  pub fn chunk(mut self, id: &[u8; 4], data: &[u8]) -> Self {
    self.chunks.push(chunk(id, data));
    self
  }

  pub fn track_count(mut self, count: u16) -> Self {
    self.track_count = Some(count);
    self
  }

  pub fn build(self) -> Vec<u8> {
    let track_count = self
      .track_count
      .unwrap_or_else(|| self.chunks.iter().filter(|c| &c[0..4] == b"MTrk").count() as u16);
    let mut header = Vec::new();
    header.extend_from_slice(&self.format.to_be_bytes());
    header.extend_from_slice(&track_count.to_be_bytes());
    header.extend_from_slice(&self.division.to_be_bytes());

    let mut bytes = chunk(b"MThd", &header);
    for track in self.chunks {
      bytes.extend(track);
    }
    bytes
  }

  pub fn build_rmid(self) -> Vec<u8> {
    let smf = self.build();
    let mut body = b"RMID".to_vec();
    let info = b"INFO";
    body.extend_from_slice(b"LIST");
    body.extend_from_slice(&(info.len() as u32 + 1).to_le_bytes());
    body.extend_from_slice(info);
    // pad to an even length
    body.extend_from_slice(&[0, 0]);
    body.extend_from_slice(b"data");
    body.extend_from_slice(&(smf.len() as u32).to_le_bytes());
    body.extend(smf);

    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend(body);
    bytes
  }
}

#[derive(Default)]
pub struct TrackBuilder {
  data: Vec<u8>,
}

impl TrackBuilder {
  pub fn raw(mut self, bytes: &[u8]) -> Self {
    self.data.extend_from_slice(bytes);
    self
  }

  pub fn delta(mut self, delta: u32) -> Self {
    self.data.extend(var_len(delta));
    self
  }

  pub fn event(self, delta: u32, bytes: &[u8]) -> Self {
    self.delta(delta).raw(bytes)
  }

  pub fn note_on(self, delta: u32, channel: u8, note: u8, velocity: u8) -> Self {
    self.event(delta, &[0x90 | channel, note, velocity])
  }

  pub fn note_off(self, delta: u32, channel: u8, note: u8) -> Self {
    self.event(delta, &[0x80 | channel, note, 0x40])
  }

  pub fn controller(self, delta: u32, channel: u8, controller: u8, value: u8) -> Self {
    self.event(delta, &[0xb0 | channel, controller, value])
  }

  pub fn program(self, delta: u32, channel: u8, program: u8) -> Self {
    self.event(delta, &[0xc0 | channel, program])
  }

  pub fn pitch_bend(self, delta: u32, channel: u8, lsb: u8, msb: u8) -> Self {
    self.event(delta, &[0xe0 | channel, lsb, msb])
  }

  pub fn sysex(self, delta: u32, status: u8, payload: &[u8]) -> Self {
    self
      .event(delta, &[status])
      .raw(&var_len(payload.len() as u32))
      .raw(payload)
  }

  pub fn meta(self, delta: u32, meta: u8, payload: &[u8]) -> Self {
    self
      .event(delta, &[0xff, meta])
      .raw(&var_len(payload.len() as u32))
      .raw(payload)
  }

  pub fn tempo(self, delta: u32, tempo: u32) -> Self {
    let bytes = tempo.to_be_bytes();
    self.meta(delta, 0x51, &bytes[1..4])
  }

  pub fn text(self, delta: u32, text: &str) -> Self {
    self.meta(delta, 0x01, text.as_bytes())
  }

  pub fn lyric(self, delta: u32, text: &str) -> Self {
    self.meta(delta, 0x05, text.as_bytes())
  }

  pub fn port(self, delta: u32, port: u8) -> Self {
    self.meta(delta, 0x21, &[port])
  }

  pub fn end(self, delta: u32) -> Self {
    self.meta(delta, 0x2f, &[])
  }
}

pub fn var_len(mut value: u32) -> Vec<u8> {
  let mut bytes = vec![(value & 0x7f) as u8];
  value >>= 7;
  while value > 0 {
    bytes.insert(0, 0x80 | (value & 0x7f) as u8);
    value >>= 7;
  }
  bytes
}

fn chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
  let mut bytes = id.to_vec();
  bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
  bytes.extend_from_slice(data);
  bytes
}
