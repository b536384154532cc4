use std::fmt;

use crate::duration::Duration;
use crate::event::EventKind;
use crate::file::MidiFile;
use crate::playhead::Playhead;

/// Summary of a decoded file for display purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
  pub format: u16,
  pub track_count: usize,
  pub time_division: u16,
  pub ppq: u32,
  pub duration: Duration,
  /// Text meta events, concatenated in playback order.
  pub comments: String,
  /// Lyric meta events, concatenated in playback order.
  pub lyrics: String,
}

impl FileInfo {
  pub fn from_file(file: &MidiFile) -> Self {
    let mut comments = String::new();
    let mut lyrics = String::new();

    // text often lies after the last audible event
    let mut playhead = Playhead::new(file);
    while let Some((track, event)) = playhead.next_event_unbounded(file) {
      match &event.kind {
        EventKind::Text(text) => comments.push_str(text),
        EventKind::Lyric(text) => lyrics.push_str(text),
        _ => {}
      }
      playhead.advance(track);
    }

    Self {
      format: file.format,
      track_count: file.tracks.len(),
      time_division: file.time_division,
      ppq: file.ppq(),
      duration: file.duration(),
      comments,
      lyrics,
    }
  }

  pub fn length_millis(&self) -> u64 {
    self.duration.length / 1000
  }
}

impl fmt::Display for FileInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Format:      {}", self.format)?;
    writeln!(f, "Length:      {} ms", self.length_millis())?;
    writeln!(f, "Tracks:      {}", self.track_count)?;
    writeln!(f, "Division:    {} ({} ppq)", self.time_division, self.ppq)?;
    match self.duration.fixed_bpm {
      Some(bpm) => writeln!(f, "BPM:         {}", bpm)?,
      None => {
        writeln!(f, "BPM:         variable")?;
        writeln!(f, "BPM (wavg):  {}", self.duration.average_bpm)?;
      }
    }
    if !self.comments.is_empty() {
      writeln!(f, "Comments:    {}", self.comments)?;
    }
    if !self.lyrics.is_empty() {
      writeln!(f, "Lyrics:      {}", self.lyrics)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::SmfBuilder;
  use crate::{decode, DecodeConfig};

  #[test]
  fn collects_text_from_every_track_in_playback_order() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(1, 96)
      .track(|track| {
        track
          .text(0, "Title. ")
          .tempo(0, 500_000)
          .text(96, "Verse. ")
          .end(0)
      })
      .track(|track| {
        track
          .text(48, "Bass. ")
          .lyric(48, "Hel")
          .note_on(0, 0, 40, 100)
          .lyric(48, "lo")
          .note_off(0, 0, 40)
          .end(0)
      })
      .build();
    let config = DecodeConfig {
      skip_trailing: true,
      ..Default::default()
    };
    let file = decode(&bytes, &config)?;
    let info = FileInfo::from_file(&file);

    assert_eq!(info.format, 1);
    assert_eq!(info.track_count, 2);
    assert_eq!(info.ppq, 96);
    assert_eq!(info.comments, "Title. Bass. Verse. ");
    assert_eq!(info.lyrics, "Hello");
    assert_eq!(info.duration.fixed_bpm, Some(120));

    Ok(())
  }

  #[test]
  fn reuses_the_figures_computed_when_decoding() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 96)
      .track(|track| track.note_on(0, 0, 60, 100).note_off(96, 0, 60).end(0))
      .build();
    let mut file = decode(&bytes, &DecodeConfig::default())?;

    assert_eq!(FileInfo::from_file(&file).duration, file.duration());

    file.length = 1_234_000;
    file.average_bpm = 77;
    let info = FileInfo::from_file(&file);

    assert_eq!(info.length_millis(), 1234);
    assert_eq!(info.duration.average_bpm, 77);
    assert_eq!(info.duration.fixed_bpm, Some(120));

    Ok(())
  }

  #[test]
  fn displays_variable_bpm() -> anyhow::Result<()> {
    let bytes = SmfBuilder::new(0, 480)
      .track(|track| {
        track
          .tempo(0, 500_000)
          .note_on(0, 0, 60, 100)
          .tempo(480, 250_000)
          .note_off(480, 0, 60)
          .end(0)
      })
      .build();
    let file = decode(&bytes, &DecodeConfig::default())?;
    let text = FileInfo::from_file(&file).to_string();

    assert!(text.contains("Length:      750 ms"), "{}", text);
    assert!(text.contains("BPM:         variable"), "{}", text);
    assert!(text.contains("BPM (wavg):  160"), "{}", text);

    Ok(())
  }
}
