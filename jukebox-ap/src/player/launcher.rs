//! Player process launcher
//!
//! The seam between the supervisor and the operating system. The production
//! implementation spawns `mpv`; tests substitute a recording double.

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// How a player process terminated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCause {
    /// Exited on its own with a status code
    Exited(i32),
    /// Terminated by a signal, or waiting on it failed
    Abnormal(String),
    /// Killed by the supervisor
    Killed,
}

impl ExitCause {
    /// Anything other than a clean exit or an intentional kill
    pub fn is_crash(&self) -> bool {
        match self {
            ExitCause::Exited(code) => *code != 0,
            ExitCause::Abnormal(_) => true,
            ExitCause::Killed => false,
        }
    }
}

impl std::fmt::Display for ExitCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCause::Exited(code) => write!(f, "exited with code {}", code),
            ExitCause::Abnormal(reason) => write!(f, "terminated abnormally: {}", reason),
            ExitCause::Killed => write!(f, "killed"),
        }
    }
}

/// What to play and how loud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub stream: String,
    pub volume: u8,
}

/// A running player process
#[async_trait]
pub trait PlayerProcess: Send {
    /// OS process id, when known
    fn id(&self) -> Option<u32>;

    /// Wait for the terminal event
    async fn wait(&mut self) -> ExitCause;

    /// Forcibly terminate; no graceful shutdown negotiation
    async fn kill(&mut self);
}

/// Spawns player processes and sweeps orphans
#[async_trait]
pub trait PlayerLauncher: Send + Sync {
    /// Start a player bound to the fixed control socket
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn PlayerProcess>>;

    /// Forcibly terminate every process running the player executable,
    /// including ones this launcher did not start
    async fn sweep(&self);
}

/// `mpv` launcher
pub struct MpvLauncher {
    program: String,
    control_socket: PathBuf,
    audio_device: Option<String>,
}

impl MpvLauncher {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            program: config.program.clone(),
            control_socket: config.control_socket.clone(),
            audio_device: config.audio_device.clone(),
        }
    }

    /// Command-line arguments for one launch
    pub fn arguments(&self, request: &LaunchRequest) -> Vec<String> {
        let mut args = vec!["--no-video".to_string(), "--really-quiet".to_string()];
        if let Some(device) = &self.audio_device {
            args.push(format!("--audio-device={}", device));
        }
        args.push(format!(
            "--input-ipc-server={}",
            self.control_socket.display()
        ));
        args.push(format!("--volume={}", request.volume));
        args.push(request.stream.clone());
        args
    }

    /// Process name matched by the orphan sweep
    pub fn executable_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }
}

#[async_trait]
impl PlayerLauncher for MpvLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn PlayerProcess>> {
        let mut child = Command::new(&self.program)
            .args(self.arguments(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::PlayerSpawn(format!("{}: {}", self.program, e)))?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, "stderr");
        }

        debug!(pid = ?child.id(), "Spawned {}", self.program);
        Ok(Box::new(ChildProcess { child }))
    }

    #[cfg(unix)]
    async fn sweep(&self) {
        let name = self.executable_name();
        match Command::new("pkill")
            .args(["-9", "-x", &name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            // pkill exits 1 when nothing matched
            Ok(status) => debug!("Swept {} processes ({})", name, status),
            Err(e) => warn!("Orphan sweep for {} failed: {}", name, e),
        }
    }

    #[cfg(not(unix))]
    async fn sweep(&self) {
        debug!("Orphan sweep not supported on this platform");
    }
}

/// Log player output line by line; never parsed
fn forward_output<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "jukebox_ap::player::output", stream = stream, "{}", line);
        }
    });
}

/// tokio child wrapper
struct ChildProcess {
    child: Child,
}

#[async_trait]
impl PlayerProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> ExitCause {
        match self.child.wait().await {
            Ok(status) => match status.code() {
                Some(code) => ExitCause::Exited(code),
                None => ExitCause::Abnormal(status.to_string()),
            },
            Err(e) => ExitCause::Abnormal(e.to_string()),
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("Kill failed (already exited?): {}", e);
        }
    }
}
