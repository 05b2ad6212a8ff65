use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::download::merge::Merger;
use crate::download::progress::{ProgressSender, ProgressTracker, StreamKind};
use crate::download::MediaFetch;
use crate::error::{Error, Result};
use crate::options::{Options, StreamMode};
use crate::resolve::{pick_by_label, Quality, StreamVariant};

const MAX_NAME_CHARS: usize = 100;
const HOSTILE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selecting,
    Naming,
    Fetching,
    Merging,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Selecting => "selecting a stream",
            Self::Naming => "naming the output",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Title made safe for the filesystem, cut to 100 characters, with the quality suffix.
pub fn output_name(title: &str, quality: u32) -> String {
    let mut name = title
        .chars()
        .map(|c| if HOSTILE_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_NAME_CHARS)
        .collect::<String>();

    if let Some(quality) = Quality::from_id(quality) {
        name.push('_');
        name.push_str(quality.label());
    }

    name
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        debug!("Could not remove {}: {}", path.display(), err);
    }
}

/// Downloads one page or episode: picks a variant, fetches its streams and muxes them.
pub struct Retrieval<'a> {
    fetcher: &'a dyn MediaFetch,
    merger: &'a dyn Merger,
    options: &'a Options,
    permits: Semaphore,
    progress: Option<ProgressSender>,
}

impl<'a> Retrieval<'a> {
    pub fn new(
        fetcher: &'a dyn MediaFetch,
        merger: &'a dyn Merger,
        options: &'a Options,
        progress: Option<ProgressSender>,
    ) -> Self {
        Self {
            fetcher,
            merger,
            options,
            permits: Semaphore::new(options.max_parallel_downloads),
            progress,
        }
    }

    /// Returns the path of the finished file.
    pub async fn download(&self, title: &str, variants: &[StreamVariant]) -> Result<PathBuf> {
        let mut stage = Stage::Selecting;
        let result = self.run(title, variants, &mut stage).await;

        if let Err(err) = &result {
            warn!("Downloading {} failed while {}: {}", title, stage, err);
        }
        result
    }

    async fn run(&self, title: &str, variants: &[StreamVariant], stage: &mut Stage) -> Result<PathBuf> {
        let variant = pick_by_label(variants, &self.options.quality)
            .ok_or_else(|| Error::NoStreamAvailable(title.to_string()))?;
        info!(
            "Selected stream: {} {} ({})",
            variant.tier().map(Quality::label).unwrap_or("unknown quality"),
            variant.resolution,
            variant.format
        );
        debug!(
            "Codecs {}/{}, {} kbps",
            variant.video_codecs,
            variant.audio_codecs,
            variant.bandwidth / 1000
        );

        *stage = Stage::Naming;
        tokio::fs::create_dir_all(&self.options.output_dir).await?;
        let base = self.options.output_dir.join(output_name(title, variant.quality));

        *stage = Stage::Fetching;
        let output = match self.options.mode {
            StreamMode::AudioOnly => {
                if variant.is_muxed() {
                    return Err(Error::NoStreamAvailable(format!("{} has no separate audio stream", title)));
                }
                let output = with_suffix(&base, ".m4a");
                self.fetch(&variant.audio_url, &output, StreamKind::Audio).await?;
                output
            }
            StreamMode::VideoOnly => {
                let extension = if variant.is_muxed() { variant.format.as_str() } else { "mp4" };
                let output = with_suffix(&base, &format!(".{}", extension));
                self.fetch(&variant.video_url, &output, StreamKind::Video).await?;
                output
            }
            StreamMode::Both if variant.is_muxed() => {
                // legacy streams already carry their audio
                let output = with_suffix(&base, &format!(".{}", variant.format));
                self.fetch(&variant.video_url, &output, StreamKind::Video).await?;
                output
            }
            StreamMode::Both => self.fetch_and_merge(&base, variant, stage).await?,
        };

        *stage = Stage::Done;
        info!("Saved {}", output.display());
        Ok(output)
    }

    async fn fetch_and_merge(&self, base: &Path, variant: &StreamVariant, stage: &mut Stage) -> Result<PathBuf> {
        let video_path = with_suffix(base, "_video.mp4");
        let audio_path = with_suffix(base, "_audio.m4a");
        let output = with_suffix(base, &format!(".{}", self.options.format));

        let (video, audio) = tokio::join!(
            self.fetch(&variant.video_url, &video_path, StreamKind::Video),
            self.fetch(&variant.audio_url, &audio_path, StreamKind::Audio),
        );
        if let Err(err) = video.and(audio) {
            remove_quietly(&video_path).await;
            remove_quietly(&audio_path).await;
            return Err(err);
        }

        *stage = Stage::Merging;
        match self.merger.merge(&video_path, &audio_path, &output).await {
            Ok(()) => {
                remove_quietly(&video_path).await;
                remove_quietly(&audio_path).await;
            }
            Err(err) => {
                warn!("{}; saving the video stream without merged audio", err);
                tokio::fs::copy(&video_path, &output).await?;
            }
        }

        Ok(output)
    }

    async fn fetch(&self, url: &str, output: &Path, kind: StreamKind) -> Result<u64> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;

        let tracker = ProgressTracker::new(kind, self.progress.clone());
        match self.fetcher.fetch_to_file(url, output, tracker).await {
            Ok(size) => Ok(size),
            Err(err) => {
                remove_quietly(output).await;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
pub mod fake {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Writes the URL itself as file content; URLs containing `fail` error out.
    #[derive(Default)]
    pub struct FakeFetch {
        pub fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaFetch for FakeFetch {
        async fn fetch_to_file(&self, url: &str, output: &Path, mut tracker: ProgressTracker) -> Result<u64> {
            self.fetched.lock().unwrap().push(url.to_string());
            if url.contains("fail") {
                tokio::fs::write(output, b"partial").await?;
                return Err(Error::Transport(format!("{} refused", url)));
            }
            tokio::fs::write(output, url.as_bytes()).await?;
            tracker.advance(url.len() as u64);
            Ok(tracker.finish())
        }
    }

    pub struct FakeMerger {
        pub available: bool,
    }

    #[async_trait]
    impl Merger for FakeMerger {
        async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
            if !self.available {
                return Err(Error::MergeUnavailable("ffmpeg not found".to_string()));
            }
            let video = tokio::fs::read_to_string(video).await?;
            let audio = tokio::fs::read_to_string(audio).await?;
            tokio::fs::write(output, format!("{}+{}", video, audio)).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::fake::{FakeFetch, FakeMerger};
    use super::*;

    fn options_for(dir: &Path, mode: StreamMode) -> Options {
        Options {
            output_dir: dir.join("out"),
            max_parallel_downloads: 4,
            quality: "best".to_string(),
            format: "mp4".to_string(),
            mode,
        }
    }

    fn dash(quality: u32, audio_url: &str) -> StreamVariant {
        StreamVariant {
            quality,
            format: "mp4".to_string(),
            video_url: format!("https://cdn/v{}", quality),
            audio_url: audio_url.to_string(),
            video_codecs: "avc1".to_string(),
            audio_codecs: "mp4a".to_string(),
            bandwidth: 0,
            resolution: "1920x1080".to_string(),
        }
    }

    #[test]
    fn names_are_sanitized_truncated_and_suffixed() {
        let title = format!("a/b:c?{}", "x".repeat(144));
        assert_eq!(title.chars().count(), 150);

        let name = output_name(&title, 80);
        assert!(name.starts_with("a_b_c_x"));
        assert!(name.ends_with("_1080p"));
        assert_eq!(name.chars().count(), 100 + "_1080p".len());

        let file = with_suffix(Path::new("out").join(&name).as_path(), ".mp4");
        assert_eq!(file.extension().unwrap(), "mp4");
        assert_eq!(output_name("<|\"*\\>", 64), "_______720p");
        assert_eq!(output_name("clip", 120), "clip");
    }

    #[test]
    fn names_cut_on_characters_not_bytes() {
        let name = output_name(&"视".repeat(120), 16);
        assert_eq!(name.chars().count(), 100 + "_360p".len());
    }

    #[tokio::test]
    async fn both_streams_are_merged_and_temps_removed() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::Both);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let output = retrieval
            .download("Title", &[dash(64, "https://cdn/a"), dash(80, "https://cdn/a")])
            .await
            .unwrap();

        assert_eq!(output, dir.path().join("out").join("Title_1080p.mp4"));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "https://cdn/v80+https://cdn/a");
        assert!(!dir.path().join("out").join("Title_1080p_video.mp4").exists());
        assert!(!dir.path().join("out").join("Title_1080p_audio.m4a").exists());
        assert_eq!(fetcher.fetched.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_merger_keeps_video_and_temps() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::Both);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: false };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let output = retrieval.download("Title", &[dash(64, "https://cdn/a")]).await.unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "https://cdn/v64");
        assert!(dir.path().join("out").join("Title_720p_video.mp4").exists());
        assert!(dir.path().join("out").join("Title_720p_audio.m4a").exists());
    }

    #[tokio::test]
    async fn failed_half_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::Both);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let result = retrieval.download("Title", &[dash(80, "https://cdn/fail")]).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        let leftovers = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    /// Tracks how many transfers are in flight at once.
    #[derive(Default)]
    struct OverlapFetch {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MediaFetch for OverlapFetch {
        async fn fetch_to_file(&self, url: &str, output: &Path, mut tracker: ProgressTracker) -> Result<u64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tokio::fs::write(output, url.as_bytes()).await?;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            tracker.advance(url.len() as u64);
            Ok(tracker.finish())
        }
    }

    #[tokio::test]
    async fn thread_limit_bounds_overlapping_transfers() {
        for (threads, expected_peak) in [(4, 2), (2, 2), (1, 1)] {
            let dir = tempfile::tempdir().unwrap();
            let mut options = options_for(dir.path(), StreamMode::Both);
            options.max_parallel_downloads = threads;
            let fetcher = OverlapFetch::default();
            let merger = FakeMerger { available: true };
            let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

            retrieval.download("Title", &[dash(80, "https://cdn/a")]).await.unwrap();

            assert_eq!(fetcher.peak.load(Ordering::SeqCst), expected_peak, "threads = {}", threads);
        }
    }

    #[tokio::test]
    async fn audio_only_writes_m4a() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::AudioOnly);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let output = retrieval.download("Song", &[dash(32, "https://cdn/a")]).await.unwrap();

        assert_eq!(output.file_name().unwrap(), "Song_480p.m4a");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "https://cdn/a");
    }

    #[tokio::test]
    async fn video_only_writes_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = options_for(dir.path(), StreamMode::VideoOnly);
        options.format = "mkv".to_string();
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let output = retrieval.download("Clip", &[dash(16, "https://cdn/a")]).await.unwrap();

        assert_eq!(output.file_name().unwrap(), "Clip_360p.mp4");
        assert_eq!(fetcher.fetched.lock().unwrap().as_slice(), ["https://cdn/v16"]);
    }

    #[tokio::test]
    async fn legacy_stream_is_saved_without_merge() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::Both);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: false };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let mut legacy = dash(80, "");
        legacy.format = "flv".to_string();
        let output = retrieval.download("Old", &[legacy.clone()]).await.unwrap();
        assert_eq!(output.file_name().unwrap(), "Old_1080p.flv");

        let audio_options = options_for(dir.path(), StreamMode::AudioOnly);
        let retrieval = Retrieval::new(&fetcher, &merger, &audio_options, None);
        let result = retrieval.download("Old", &[legacy]).await;
        assert!(matches!(result, Err(Error::NoStreamAvailable(_))));
    }

    #[tokio::test]
    async fn empty_variants_fail() {
        let dir = tempfile::tempdir().unwrap();
        let options = options_for(dir.path(), StreamMode::Both);
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);

        let result = retrieval.download("Nothing", &[]).await;
        assert!(matches!(result, Err(Error::NoStreamAvailable(_))));
    }
}
