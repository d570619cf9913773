use crate::error::RenderError;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// The external audio side-channel: one `ffplay` process playing the
/// soundtrack while the video pipeline owns the screen. Launch failure is
/// not fatal; the video simply plays muted.
pub struct AudioPlayer {
    child: Option<Child>,
}

impl AudioPlayer {
    /// Spawns the player against a local media file, stderr suppressed.
    #[must_use]
    pub fn spawn(path: &Path) -> Self {
        let spawned = Command::new("ffplay")
            .args([
                "-nodisp",
                "-autoexit",
                "-vn",
                "-nostats",
                "-loglevel",
                "quiet",
                "-sync",
                "video",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => Self { child: Some(child) },
            Err(err) => {
                let failure = RenderError::AudioFailed(err.to_string());
                eprintln!("Warning: {failure}; playing without sound");
                Self { child: None }
            }
        }
    }

    /// A player that was never started (animated sources have no track).
    #[must_use]
    pub fn disabled() -> Self {
        Self { child: None }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Kills and reaps the subprocess. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::AudioPlayer;

    #[test]
    fn disabled_player_reports_not_running() {
        let mut player = AudioPlayer::disabled();
        assert!(!player.is_running());
        player.shutdown();
        assert!(!player.is_running());
    }
}
