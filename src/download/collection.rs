use tracing::{debug, error, info};

use crate::download::engine::Retrieval;
use crate::error::{Error, Result};
use crate::resolve::{Item, ItemKind, StreamResolver, SubItem};

pub const ALL_PAGES: &str = "all";

/// Expands a page expression such as `1-3,5` into 1-based positions.
///
/// Numbers outside `1..=count` are dropped; order and duplicates are kept as written.
pub fn parse_pages(expression: &str, count: usize) -> Result<Vec<usize>> {
    let expression = expression.trim();
    if expression.eq_ignore_ascii_case(ALL_PAGES) {
        return Ok((1..=count).collect());
    }

    let number = |token: &str| {
        token
            .trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidPageSelection(format!("'{}' is not a page number", token.trim())))
    };

    let mut pages = Vec::new();
    for token in expression.split(',') {
        let (start, end) = match token.split_once('-') {
            Some((start, end)) => (number(start)?, number(end)?),
            None => {
                let page = number(token)?;
                (page, page)
            }
        };

        if start > end {
            return Err(Error::InvalidPageSelection(format!("range {}-{} runs backwards", start, end)));
        }

        pages.extend((start..=end).filter(|page| (1..=count).contains(page)));
    }

    Ok(pages)
}

pub fn select<'s>(sub_items: &'s [SubItem], pages: &[usize]) -> Vec<&'s SubItem> {
    pages
        .iter()
        .filter_map(|page| page.checked_sub(1).and_then(|position| sub_items.get(position)))
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct CollectionDownloader<'a> {
    resolver: &'a StreamResolver<'a>,
    retrieval: &'a Retrieval<'a>,
}

impl<'a> CollectionDownloader<'a> {
    pub fn new(resolver: &'a StreamResolver<'a>, retrieval: &'a Retrieval<'a>) -> Self {
        Self { resolver, retrieval }
    }

    /// Downloads a single video, or the selected parts of a collection one after another.
    /// A failing part is logged and skipped.
    pub async fn download_item(&self, item: &Item, pages: &str) -> Result<Summary> {
        match item.kind {
            ItemKind::Single => {
                let content_id = item
                    .content_id
                    .ok_or_else(|| Error::NoStreamAvailable(format!("{} has no playable page", item.id)))?;

                let variants = self.resolver.resolve_variants(&item.id, content_id).await?;
                self.retrieval.download(&item.title, &variants).await?;
                Ok(Summary { succeeded: 1, failed: 0 })
            }
            ItemKind::Collection => self.download_collection(item, pages).await,
        }
    }

    async fn download_collection(&self, item: &Item, pages: &str) -> Result<Summary> {
        let pages = parse_pages(pages, item.sub_items.len())?;
        let selected = select(&item.sub_items, &pages);
        info!("Downloading {} of {} parts of {}", selected.len(), item.sub_items.len(), item.title);

        let mut summary = Summary::default();
        for (i, sub_item) in selected.iter().enumerate() {
            println!("\n[{}/{}] Downloading: {}", i + 1, selected.len(), sub_item.title);
            debug!("Part {} of {} ({}s)", sub_item.index, sub_item.parent_id, sub_item.duration);

            match self.download_sub_item(sub_item).await {
                Ok(()) => summary.succeeded += 1,
                Err(err) => {
                    error!("Failed to download {}: {}", sub_item.title, err);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn download_sub_item(&self, sub_item: &SubItem) -> Result<()> {
        let variants = self
            .resolver
            .resolve_variants(&sub_item.parent_id, sub_item.content_id)
            .await?;
        self.retrieval.download(&sub_item.title, &variants).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::auth::client::mock::MockTransport;
    use crate::auth::{ApiClient, CredentialStore};
    use crate::download::engine::fake::{FakeFetch, FakeMerger};
    use crate::options::{Options, StreamMode};

    const DASH: &str = r#"{"code":0,"message":"0","data":{"dash":{
        "video":[{"id":64,"baseUrl":"https://cdn/v64.m4s","bandwidth":1,"codecs":"avc1","width":1280,"height":720}],
        "audio":[{"id":30280,"baseUrl":"https://cdn/a.m4s","bandwidth":1,"codecs":"mp4a"}]}}}"#;

    const REJECTED: &str = r#"{"code":-404,"message":"啥都木有"}"#;

    fn sub_item(index: usize) -> SubItem {
        SubItem {
            parent_id: "BV1xx411c7mD".to_string(),
            content_id: index as i64,
            title: format!("Part {}", index),
            duration: 60,
            index,
        }
    }

    fn item(kind: ItemKind, sub_items: Vec<SubItem>) -> Item {
        Item {
            id: "BV1xx411c7mD".to_string(),
            aid: 1,
            title: "Video".to_string(),
            description: String::new(),
            duration: 180,
            kind,
            content_id: None,
            sub_items,
        }
    }

    fn options(dir: &Path) -> Options {
        Options {
            output_dir: dir.to_path_buf(),
            max_parallel_downloads: 2,
            quality: "best".to_string(),
            format: "mp4".to_string(),
            mode: StreamMode::Both,
        }
    }

    #[test]
    fn ranges_and_lists_expand_in_order() {
        assert_eq!(parse_pages("1-2,4", 5).unwrap(), vec![1, 2, 4]);
        assert_eq!(parse_pages(" 3 , 1 - 2 ", 5).unwrap(), vec![3, 1, 2]);
        assert_eq!(parse_pages("2,2", 5).unwrap(), vec![2, 2]);
        assert_eq!(parse_pages("all", 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_pages("ALL", 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn out_of_range_pages_are_skipped() {
        assert_eq!(parse_pages("0,4-9", 5).unwrap(), vec![4, 5]);
        assert_eq!(parse_pages("7", 5).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for expression in ["3-1", "a", "1,,2", "1-", "-2", "1-2-3"] {
            assert!(
                matches!(parse_pages(expression, 5), Err(Error::InvalidPageSelection(_))),
                "{} should be rejected",
                expression
            );
        }
    }

    #[test]
    fn selection_follows_positions() {
        let sub_items: Vec<_> = (1..=5).map(sub_item).collect();
        let titles: Vec<_> = select(&sub_items, &[4, 1])
            .into_iter()
            .map(|sub_item| sub_item.title.as_str())
            .collect();
        assert_eq!(titles, ["Part 4", "Part 1"]);
    }

    #[tokio::test]
    async fn failed_part_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::default();
        let transport = MockTransport::default()
            .route("cid=2&", REJECTED)
            .route("fnval=16", DASH);
        let client = ApiClient::new(&store, &transport);
        let resolver = StreamResolver::new(&client);
        let options = options(dir.path());
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);
        let downloader = CollectionDownloader::new(&resolver, &retrieval);

        let item = item(ItemKind::Collection, (1..=3).map(sub_item).collect());
        let summary = downloader.download_item(&item, "all").await.unwrap();

        assert_eq!(summary, Summary { succeeded: 2, failed: 1 });
        assert!(dir.path().join("Part 1_720p.mp4").exists());
        assert!(!dir.path().join("Part 2_720p.mp4").exists());
        assert!(dir.path().join("Part 3_720p.mp4").exists());
    }

    #[tokio::test]
    async fn single_item_needs_a_content_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::default();
        let transport = MockTransport::default().route("fnval=16", DASH);
        let client = ApiClient::new(&store, &transport);
        let resolver = StreamResolver::new(&client);
        let options = options(dir.path());
        let fetcher = FakeFetch::default();
        let merger = FakeMerger { available: true };
        let retrieval = Retrieval::new(&fetcher, &merger, &options, None);
        let downloader = CollectionDownloader::new(&resolver, &retrieval);

        let mut single = item(ItemKind::Single, Vec::new());
        let result = downloader.download_item(&single, "all").await;
        assert!(matches!(result, Err(Error::NoStreamAvailable(_))));
        assert!(transport.requested_urls().is_empty());

        single.content_id = Some(7);
        let summary = downloader.download_item(&single, "1").await.unwrap();
        assert_eq!(summary, Summary { succeeded: 1, failed: 0 });
        assert!(dir.path().join("Video_720p.mp4").exists());
    }
}
