pub mod audio;
pub mod backend;
pub mod config;
pub(crate) mod controls;
pub(crate) mod error;
pub(crate) mod player;
pub(crate) mod scheduler;
pub(crate) mod seek;

pub use audio::{AudioFormat, FrameClock};
pub use backend::{Backend, Command, CommandBackend, CommandHandler, Stamp};
pub use config::{Config, PlayerConfig};
pub use controls::{Controls, Position, Request, Status};
pub use error::{BackendError, PlayerError, Result};
pub use player::Player;
pub use scheduler::{Outcome, Scheduler, State};
pub use seek::{SeekEngine, SeekPoint};
