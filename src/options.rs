use std::path::PathBuf;

use crate::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Both,
    AudioOnly,
    VideoOnly,
}

/// Values given on the command line; `None` means "use the settings file".
#[derive(Debug, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub quality: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug)]
pub struct Options {
    pub output_dir: PathBuf,
    pub max_parallel_downloads: usize,
    pub quality: String,
    pub format: String,
    pub mode: StreamMode,
}

impl Options {
    pub fn new(settings: Settings, overrides: Overrides, mode: StreamMode) -> Self {
        Self {
            output_dir: overrides.output.unwrap_or(settings.output),
            max_parallel_downloads: overrides.threads.unwrap_or(settings.threads).max(1),
            quality: overrides.quality.unwrap_or(settings.quality),
            format: overrides.format.unwrap_or(settings.format),
            mode,
        }
    }
}
