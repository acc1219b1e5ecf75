//! External player process management

pub mod launcher;
pub mod supervisor;

pub use launcher::{ExitCause, LaunchRequest, MpvLauncher, PlayerLauncher, PlayerProcess};
pub use supervisor::PlayerSupervisor;
