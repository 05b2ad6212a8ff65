use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::auth::ApiClient;
use crate::error::Result;
use crate::resolve::models::{Item, ItemKind, SubItem};

const VIEW_URL: &str = "https://api.bilibili.com/x/web-interface/view";
const SEASON_URL: &str = "https://api.bilibili.com/pgc/view/web/season";

#[derive(Deserialize)]
struct VideoView {
    bvid: String,
    #[serde(default)]
    aid: i64,
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    pages: Vec<VideoPage>,
}

#[derive(Deserialize)]
struct VideoPage {
    cid: i64,
    #[serde(default)]
    part: String,
    #[serde(default)]
    duration: u64,
    page: usize,
}

#[derive(Deserialize)]
struct SeasonView {
    title: String,
    #[serde(default)]
    episodes: Vec<SeasonEpisode>,
}

#[derive(Deserialize)]
struct SeasonEpisode {
    bvid: String,
    cid: i64,
    #[serde(default)]
    title: String,
    /// milliseconds on the season endpoint
    #[serde(default)]
    duration: u64,
}

impl VideoView {
    fn into_item(self) -> Item {
        if self.pages.len() > 1 {
            let sub_items = self
                .pages
                .iter()
                .map(|page| SubItem {
                    parent_id: self.bvid.clone(),
                    content_id: page.cid,
                    title: page_title(&self.title, page),
                    duration: page.duration,
                    index: page.page,
                })
                .collect();

            return Item {
                id: self.bvid,
                aid: self.aid,
                title: self.title,
                description: self.desc,
                duration: self.duration,
                kind: ItemKind::Collection,
                content_id: None,
                sub_items,
            };
        }

        Item {
            content_id: self.pages.first().map(|page| page.cid),
            id: self.bvid,
            aid: self.aid,
            title: self.title,
            description: self.desc,
            duration: self.duration,
            kind: ItemKind::Single,
            sub_items: Vec::new(),
        }
    }
}

fn page_title(video_title: &str, page: &VideoPage) -> String {
    if page.part.is_empty() {
        format!("{} - P{}", video_title, page.page)
    } else {
        page.part.clone()
    }
}

impl SeasonView {
    fn into_item(self, season_id: &str) -> Item {
        let sub_items = self
            .episodes
            .into_iter()
            .enumerate()
            .map(|(position, episode)| SubItem {
                parent_id: episode.bvid,
                content_id: episode.cid,
                title: episode.title,
                duration: episode.duration / 1000,
                index: position + 1,
            })
            .collect::<Vec<_>>();

        Item {
            id: season_id.to_string(),
            aid: 0,
            title: self.title,
            description: String::new(),
            duration: sub_items.iter().map(|sub_item| sub_item.duration).sum(),
            kind: ItemKind::Collection,
            content_id: None,
            sub_items,
        }
    }
}

/// Translates ids into [`Item`] descriptions through the read API.
pub struct MetadataFetcher<'a> {
    client: &'a ApiClient<'a>,
}

impl<'a> MetadataFetcher<'a> {
    pub fn new(client: &'a ApiClient<'a>) -> Self {
        Self { client }
    }

    pub async fn fetch_single(&self, bvid: &str) -> Result<Item> {
        let url = Url::parse_with_params(VIEW_URL, &[("bvid", bvid)])?;
        let view: VideoView = self.client.get_data(&url).await?;

        let item = view.into_item();
        debug!("Resolved {} ({:?}, {} parts)", item.id, item.kind, item.sub_items.len());
        Ok(item)
    }

    pub async fn fetch_collection(&self, season_id: &str) -> Result<Item> {
        let url = Url::parse_with_params(SEASON_URL, &[("season_id", season_id)])?;
        let season: SeasonView = self.client.get_data(&url).await?;

        let item = season.into_item(season_id);
        debug!("Resolved season {} ({} episodes)", item.id, item.sub_items.len());
        Ok(item)
    }
}
