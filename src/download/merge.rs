use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// Muxes separate video and audio files into one container.
/// Every failure is reported as [`Error::MergeUnavailable`].
#[async_trait]
pub trait Merger: Send + Sync {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self { program: "ffmpeg".to_string() }
    }
}

#[async_trait]
impl Merger for Ffmpeg {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(["-loglevel", "error", "-y", "-i"])
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c", "copy"])
            .arg(output);
        debug!("Running {:?}", command);

        let result = match command.output().await {
            Ok(result) => result,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MergeUnavailable(format!("{} not found", self.program)));
            }
            Err(err) => return Err(Error::MergeUnavailable(err.to_string())),
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::MergeUnavailable(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
