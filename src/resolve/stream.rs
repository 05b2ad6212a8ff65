use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};
use url::Url;

use crate::auth::ApiClient;
use crate::error::Result;
use crate::resolve::models::{Quality, StreamVariant};

const PLAY_URL: &str = "https://api.bilibili.com/x/player/playurl";

const LEGACY_FORMAT: &str = "flv";
const LEGACY_VIDEO_CODECS: &str = "avc1";
const LEGACY_AUDIO_CODECS: &str = "mp4a";

const BEST_LABEL: &str = "best";

// DASH and legacy (durl) payloads have independent decoders.

#[derive(Deserialize)]
struct DashPlayback {
    #[serde(default)]
    dash: Option<Dash>,
}

#[derive(Deserialize, Default)]
struct Dash {
    #[serde(default, deserialize_with = "null_as_empty")]
    video: Vec<DashRendition>,
    /// `null` for silent videos
    #[serde(default, deserialize_with = "null_as_empty")]
    audio: Vec<DashRendition>,
}

#[derive(Deserialize)]
struct DashRendition {
    id: u32,
    #[serde(rename = "baseUrl", alias = "base_url")]
    base_url: String,
    #[serde(default)]
    bandwidth: u64,
    #[serde(default)]
    codecs: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Deserialize)]
struct LegacyPlayback {
    #[serde(default, deserialize_with = "null_as_empty")]
    durl: Vec<LegacySegment>,
    #[serde(default)]
    quality: u32,
}

#[derive(Deserialize)]
struct LegacySegment {
    url: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl DashPlayback {
    fn into_variants(self) -> Vec<StreamVariant> {
        let dash = self.dash.unwrap_or_default();
        // renditions come best-first, so the first audio track is the one we want
        let (audio_url, audio_codecs) = dash
            .audio
            .first()
            .map(|audio| (audio.base_url.clone(), audio.codecs.clone()))
            .unwrap_or_default();

        let mut seen = HashSet::new();
        dash.video
            .into_iter()
            .filter(|video| Quality::from_id(video.id).is_some())
            .filter(|video| seen.insert(video.id))
            .map(|video| StreamVariant {
                quality: video.id,
                format: "mp4".to_string(),
                resolution: format!("{}x{}", video.width, video.height),
                video_url: video.base_url,
                audio_url: audio_url.clone(),
                video_codecs: video.codecs,
                audio_codecs: audio_codecs.clone(),
                bandwidth: video.bandwidth,
            })
            .collect()
    }
}

impl LegacyPlayback {
    fn into_variants(self) -> Vec<StreamVariant> {
        let quality = self.quality;
        self.durl
            .into_iter()
            .map(|segment| StreamVariant {
                quality,
                format: LEGACY_FORMAT.to_string(),
                video_url: segment.url,
                audio_url: String::new(),
                video_codecs: LEGACY_VIDEO_CODECS.to_string(),
                audio_codecs: LEGACY_AUDIO_CODECS.to_string(),
                bandwidth: 0,
                resolution: "unknown".to_string(),
            })
            .collect()
    }
}

/// Looks up the playable renditions of one page or episode.
pub struct StreamResolver<'a> {
    client: &'a ApiClient<'a>,
}

impl<'a> StreamResolver<'a> {
    pub fn new(client: &'a ApiClient<'a>) -> Self {
        Self { client }
    }

    pub async fn resolve_variants(&self, bvid: &str, cid: i64) -> Result<Vec<StreamVariant>> {
        let cid = cid.to_string();

        let url = Url::parse_with_params(
            PLAY_URL,
            &[("bvid", bvid), ("cid", &cid), ("qn", "0"), ("fnval", "16"), ("fourk", "1")],
        )?;
        let playback: DashPlayback = self.client.get_data(&url).await?;
        let variants = playback.into_variants();
        if !variants.is_empty() {
            debug!("Found {} DASH variants for {}/{}", variants.len(), bvid, cid);
            return Ok(variants);
        }

        info!("No DASH streams for {}/{}, trying legacy format", bvid, cid);
        let top = Quality::P1080.id().to_string();
        let url = Url::parse_with_params(PLAY_URL, &[("bvid", bvid), ("cid", &cid), ("qn", &top)])?;
        let playback: LegacyPlayback = self.client.get_data(&url).await?;

        Ok(playback.into_variants())
    }
}

/// Highest quality variant; the first one wins on ties.
pub fn pick_best(variants: &[StreamVariant]) -> Option<&StreamVariant> {
    variants.iter().fold(None, |best: Option<&StreamVariant>, variant| match best {
        Some(best) if best.quality >= variant.quality => Some(best),
        _ => Some(variant),
    })
}

/// Variant matching `label`, or the best one when the label is unknown or unavailable.
pub fn pick_by_label<'v>(variants: &'v [StreamVariant], label: &str) -> Option<&'v StreamVariant> {
    if label == BEST_LABEL {
        return pick_best(variants);
    }

    let wanted = match Quality::from_label(label) {
        Some(quality) => quality,
        None => return pick_best(variants),
    };

    variants
        .iter()
        .find(|variant| variant.quality == wanted.id())
        .or_else(|| pick_best(variants))
}
