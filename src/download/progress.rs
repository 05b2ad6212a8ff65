use std::fmt;
use std::io::Write;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const REPORT_EVERY: u64 = 1024 * 1024;
pub const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub kind: StreamKind,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub finished: bool,
}

pub type ProgressSender = mpsc::Sender<ProgressEvent>;
pub type ProgressReceiver = mpsc::Receiver<ProgressEvent>;

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Counts bytes of one transfer and reports every [`REPORT_EVERY`] bytes.
/// Events are dropped when the consumer is behind.
pub struct ProgressTracker {
    kind: StreamKind,
    total: Option<u64>,
    downloaded: u64,
    since_report: u64,
    sender: Option<ProgressSender>,
}

impl ProgressTracker {
    pub fn new(kind: StreamKind, sender: Option<ProgressSender>) -> Self {
        Self { kind, total: None, downloaded: 0, since_report: 0, sender }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn set_total(&mut self, total: Option<u64>) {
        self.total = total;
    }

    pub fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;
        self.since_report += bytes;

        if self.since_report >= REPORT_EVERY {
            self.since_report = 0;
            self.emit(false);
        }
    }

    pub fn finish(&mut self) -> u64 {
        self.emit(true);
        self.downloaded
    }

    fn emit(&self, finished: bool) {
        if let Some(sender) = &self.sender {
            let _ = sender.try_send(ProgressEvent {
                kind: self.kind,
                downloaded: self.downloaded,
                total: self.total,
                finished,
            });
        }
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

pub fn render(event: &ProgressEvent) -> String {
    match event.total {
        Some(total) if total > 0 => format!(
            "[{}] {:5.2}% ({:.2}/{:.2} MB)",
            event.kind,
            (event.downloaded as f64 / total as f64) * 100.,
            megabytes(event.downloaded),
            megabytes(total)
        ),
        _ => format!("[{}] {:.2} MB", event.kind, megabytes(event.downloaded)),
    }
}

/// Prints events until every sender is gone.
pub fn spawn_printer(mut receiver: ProgressReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            print!("\r{}", render(&event));
            if event.finished {
                println!();
            }
            let _ = std::io::stdout().flush();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_megabyte() {
        let (sender, mut receiver) = channel();
        let mut tracker = ProgressTracker::new(StreamKind::Video, Some(sender));
        tracker.set_total(Some(3 * REPORT_EVERY));

        for _ in 0..16 {
            tracker.advance(REPORT_EVERY / 8);
        }
        assert_eq!(tracker.finish(), 2 * REPORT_EVERY);

        let first = receiver.try_recv().unwrap();
        assert_eq!(first.downloaded, REPORT_EVERY);
        assert!(!first.finished);
        assert_eq!(receiver.try_recv().unwrap().downloaded, 2 * REPORT_EVERY);
        assert!(receiver.try_recv().unwrap().finished);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn full_channel_drops_events() {
        let (sender, mut receiver) = mpsc::channel(1);
        let mut tracker = ProgressTracker::new(StreamKind::Audio, Some(sender));

        tracker.advance(REPORT_EVERY);
        tracker.advance(REPORT_EVERY);
        tracker.finish();

        assert_eq!(receiver.try_recv().unwrap().downloaded, REPORT_EVERY);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn render_with_and_without_total() {
        let event = ProgressEvent {
            kind: StreamKind::Video,
            downloaded: REPORT_EVERY,
            total: Some(4 * REPORT_EVERY),
            finished: false,
        };
        assert_eq!(render(&event), "[video] 25.00% (1.00/4.00 MB)");

        let event = ProgressEvent { total: None, ..event };
        assert_eq!(render(&event), "[video] 1.00 MB");
    }
}
