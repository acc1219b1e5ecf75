//! Transport resolver client
//!
//! Turns a track URL into a display title and a playable stream reference by
//! invoking an external command-line resolver (`yt-dlp` by default). Every
//! call is independent and bounded by a timeout; a timeout is reported as a
//! resolution failure.

use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Resolver seam used by the engine
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Display title for `url`
    ///
    /// Failure only affects the title; the engine falls back to the URL.
    async fn resolve_title(&self, url: &str) -> Result<String>;

    /// Playable stream reference for `url`
    ///
    /// Failure means the track cannot be played.
    async fn resolve_stream(&self, url: &str) -> Result<String>;
}

/// `yt-dlp` backed resolver
pub struct YtDlpResolver {
    program: String,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: config.timeout,
        }
    }

    /// Run the resolver and return its trimmed stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Resolution(format!("Failed to run {}: {}", self.program, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Error::Resolution(format!(
                    "{} timed out after {} ms",
                    self.program,
                    self.timeout.as_millis()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Resolution(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(Error::Resolution(format!("{} returned empty output", self.program)));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve_title(&self, url: &str) -> Result<String> {
        let title = self.run(&["--no-playlist", "--print", "%(title)s", url]).await?;
        debug!(url = url, title = %title, "Resolved title");
        Ok(title)
    }

    async fn resolve_stream(&self, url: &str) -> Result<String> {
        let output = self
            .run(&[
                "-f",
                "bestaudio",
                "--no-playlist",
                "--user-agent",
                "Mozilla/5.0",
                "-g",
                url,
            ])
            .await?;

        // -g prints one URL per selected format; bestaudio selects one
        let stream = output
            .lines()
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        debug!(url = url, "Resolved stream");
        Ok(stream)
    }
}
