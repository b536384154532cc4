use crate::error::{Error, InvalidData, Result};

/// Cursor over an in-memory chunk of a MIDI file.
///
/// Offsets reported in errors are absolute positions in the input,
/// so a reader created with [`ChunkReader::sub_reader`] keeps pointing at the
/// right place for diagnostics.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
  data: &'a [u8],
  position: usize,
  base: usize,
}

impl<'a> ChunkReader<'a> {
  const MAX_VAR_LEN_BYTES: usize = 4;

  pub fn new(data: &'a [u8]) -> Self {
    Self {
      data,
      position: 0,
      base: 0,
    }
  }

  /// Absolute offset of the next byte to be read.
  pub fn offset(&self) -> usize {
    self.base + self.position
  }

  pub fn remaining(&self) -> usize {
    self.data.len() - self.position
  }

  pub fn is_eof(&self) -> bool {
    self.position >= self.data.len()
  }

  pub fn read_byte(&mut self) -> Result<u8> {
    let byte = self
      .data
      .get(self.position)
      .copied()
      .ok_or_else(|| self.truncated())?;
    self.position += 1;
    Ok(byte)
  }

  pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
    if len > self.remaining() {
      self.position = self.data.len();
      return Err(self.truncated());
    }
    let bytes = &self.data[self.position..self.position + len];
    self.position += len;
    Ok(bytes)
  }

  pub fn skip(&mut self, len: usize) -> Result<()> {
    self.read_bytes(len).map(|_| ())
  }

  pub fn read_id(&mut self) -> Result<[u8; 4]> {
    let bytes = self.read_bytes(4)?;
    Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
  }

  pub fn read_u16_be(&mut self) -> Result<u16> {
    let bytes = self.read_bytes(2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
  }

  pub fn read_u24_be(&mut self) -> Result<u32> {
    let bytes = self.read_bytes(3)?;
    Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
  }

  pub fn read_u32_be(&mut self) -> Result<u32> {
    let bytes = self.read_bytes(4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
  }

  pub fn read_u32_le(&mut self) -> Result<u32> {
    let bytes = self.read_bytes(4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
  }

  /// Reads a MIDI variable-length quantity: up to 4 bytes of 7 bits each,
  /// most significant first, with the high bit flagging continuation.
  pub fn read_var(&mut self) -> Result<u32> {
    let start = self.offset();
    let mut value = 0u32;
    for _ in 0..Self::MAX_VAR_LEN_BYTES {
      let byte = self.read_byte()?;
      value = (value << 7) | u32::from(byte & 0x7f);
      if byte & 0x80 == 0 {
        return Ok(value);
      }
    }
    Err(Error::invalid(start, InvalidData::VarLenOverflow))
  }

  /// Splits off a reader over the next `len` bytes (or whatever is left if the
  /// data is shorter) and advances past them.
  pub fn sub_reader(&mut self, len: usize) -> ChunkReader<'a> {
    let len = len.min(self.remaining());
    let reader = ChunkReader {
      data: &self.data[self.position..self.position + len],
      position: 0,
      base: self.offset(),
    };
    self.position += len;
    reader
  }

  fn truncated(&self) -> Error {
    Error::TruncatedStream {
      offset: self.offset(),
    }
  }
}
