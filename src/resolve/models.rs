use std::fmt;

/// Quality tiers understood by the playback API, ordered worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    P360 = 16,
    P480 = 32,
    P720 = 64,
    P1080 = 80,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::P360, Quality::P480, Quality::P720, Quality::P1080];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|quality| quality.id() == id)
    }

    /// Tier named by a label such as `720p`; `best` is not a tier.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "1080p" => Some(Self::P1080),
            "720p" => Some(Self::P720),
            "480p" => Some(Self::P480),
            "360p" => Some(Self::P360),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Single,
    Collection,
}

/// A resolved video or season.
#[derive(Debug, Clone)]
pub struct Item {
    /// BV id for videos, season id for seasons
    pub id: String,
    pub aid: i64,
    pub title: String,
    pub description: String,
    /// seconds
    pub duration: u64,
    pub kind: ItemKind,
    /// cid of the only page of a single-part video
    pub content_id: Option<i64>,
    pub sub_items: Vec<SubItem>,
}

/// One page of a multi-part video or one episode of a season.
#[derive(Debug, Clone, PartialEq)]
pub struct SubItem {
    pub parent_id: String,
    pub content_id: i64,
    pub title: String,
    pub duration: u64,
    /// 1-based position, used for page selection
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamVariant {
    /// raw quality id, see [`Quality`]
    pub quality: u32,
    pub format: String,
    pub video_url: String,
    /// empty for pre-muxed legacy streams
    pub audio_url: String,
    pub video_codecs: String,
    pub audio_codecs: String,
    /// bits per second, 0 when unknown
    pub bandwidth: u64,
    pub resolution: String,
}

impl StreamVariant {
    pub fn tier(&self) -> Option<Quality> {
        Quality::from_id(self.quality)
    }

    pub fn is_muxed(&self) -> bool {
        self.audio_url.is_empty()
    }
}
