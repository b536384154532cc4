use clap::Parser;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};

use kiro_player::{Command, CommandBackend, Config, Player, PlayerConfig};
use kiro_smf::{DecodeConfig, FileInfo, MidiFile};

/// How long a realtime session waits for the command buffer to drain.
const BACKPRESSURE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(author, version, about = "Decode a MIDI file and play it", long_about = None)]
struct Cli {
  /// Path to the MIDI file
  path: PathBuf,

  /// Print the file info without playing
  #[arg(long)]
  info: bool,

  /// Start playback at this offset, in milliseconds
  #[arg(long, value_name = "MS")]
  seek: Option<u64>,

  /// Pace playback in real time
  #[arg(long)]
  realtime: bool,

  /// Semitones added to every note outside of the drum channel
  #[arg(long, default_value_t = DecodeConfig::DEFAULT_TRANSPOSE, allow_negative_numbers = true)]
  transpose: i32,

  /// Offset added to drum channel notes
  #[arg(long, default_value_t = DecodeConfig::DEFAULT_DRUM_SHIFT)]
  drum_shift: u8,

  /// Start at the first note
  #[arg(long)]
  skip_leading: bool,

  /// End at the last channel event
  #[arg(long)]
  skip_trailing: bool,

  /// Capacity of the command buffer used in realtime mode
  #[arg(long, default_value_t = PlayerConfig::DEFAULT_COMMAND_BUFFER_SIZE)]
  buffer_size: usize,
}

impl Cli {
  fn config(&self) -> Config {
    Config {
      decode: DecodeConfig {
        transpose: self.transpose,
        drum_shift: self.drum_shift,
        skip_leading: self.skip_leading,
        skip_trailing: self.skip_trailing,
        ..Default::default()
      },
      player: PlayerConfig {
        command_buffer_size: self.buffer_size,
        realtime: self.realtime,
        ..Default::default()
      },
    }
  }
}

fn load(cli: &Cli, config: &Config) -> anyhow::Result<MidiFile> {
  let bytes =
    std::fs::read(&cli.path).with_context(|| format!("Failed to read {}", cli.path.display()))?;

  match kiro_smf::probe(&bytes) {
    Some(container) => log::debug!("Detected {:?} container", container),
    None => bail!("{} is not a MIDI file", cli.path.display()),
  }

  kiro_smf::decode(&bytes, &config.decode)
    .with_context(|| format!("Failed to decode {}", cli.path.display()))
}

fn start(
  file: MidiFile,
  backend: CommandBackend,
  seek_millis: Option<u64>,
) -> anyhow::Result<Player> {
  let player = Player::start(file, backend)?;
  if let Some(ms) = seek_millis {
    player.seek(ms * 1000);
  }
  Ok(player)
}

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let cli = Cli::parse();
  let config = cli.config();
  let file = load(&cli, &config)?;

  print!("{}", FileInfo::from_file(&file));
  if cli.info {
    return Ok(());
  }

  let outcome = if config.player.realtime {
    // commands are consumed here while the player thread paces the audio
    let (backend, mut consumer) = CommandBackend::with_ring_buffer(&config.player);
    let backend = backend.with_backpressure(BACKPRESSURE_TIMEOUT);
    let player = start(file, backend, cli.seek)?;
    loop {
      let finished = player.is_finished();
      while let Some(command) = consumer.pop() {
        log::info!("{:?}", command);
      }
      if finished {
        break;
      }
      thread::sleep(Duration::from_millis(10));
    }
    player.join()?
  } else {
    let backend = CommandBackend::from_config(
      |command: Command| log::info!("{:?}", command),
      &config.player,
    );
    start(file, backend, cli.seek)?.join()?
  };

  log::info!(
    "Playback finished at tick {} ({} ms)",
    outcome.position.tick,
    outcome.position.micros / 1000
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("kiro-play").chain(args.iter().copied()))
  }

  #[test]
  fn parses_options() -> anyhow::Result<()> {
    let cli = parse(&[
      "--seek",
      "1500",
      "song.mid",
      "--transpose",
      "-2",
      "--drum-shift",
      "3",
      "--skip-leading",
      "--realtime",
    ])?;
    let config = cli.config();

    assert_eq!(cli.path, PathBuf::from("song.mid"));
    assert_eq!(cli.seek, Some(1500));
    assert!(!cli.info);
    assert_eq!(config.decode.transpose, -2);
    assert_eq!(config.decode.drum_shift, 3);
    assert!(config.decode.skip_leading);
    assert!(!config.decode.skip_trailing);
    assert!(config.player.realtime);
    assert_eq!(
      config.player.command_buffer_size,
      PlayerConfig::DEFAULT_COMMAND_BUFFER_SIZE
    );

    Ok(())
  }

  #[test]
  fn defaults_match_the_default_config() -> anyhow::Result<()> {
    let cli = parse(&["song.mid", "--info"])?;

    assert!(cli.info);
    assert_eq!(cli.config(), Config::default());

    Ok(())
  }

  #[test]
  fn rejects_bad_arguments() {
    assert!(parse(&[]).is_err());
    assert!(parse(&["song.mid", "--seek"]).is_err());
    assert!(parse(&["song.mid", "--transpose", "up"]).is_err());
    assert!(parse(&["song.mid", "--drum-shift", "300"]).is_err());
    assert!(parse(&["song.mid", "--loop"]).is_err());
  }
}
