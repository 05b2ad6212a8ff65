use tracing::{debug, info};

use crate::auth::{ApiClient, CredentialStore, Transport};
use crate::download::collection::{CollectionDownloader, Summary};
use crate::download::engine::Retrieval;
use crate::download::merge::{Ffmpeg, Merger};
use crate::download::progress::{self, spawn_printer};
use crate::download::{DownloadClient, MediaFetch};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::resolve::url::{classify, extract_collection_id, extract_single_id, UrlKind};
use crate::resolve::{Item, ItemKind, MetadataFetcher, StreamResolver};

pub async fn run(
    store: &CredentialStore,
    transport: &dyn Transport,
    url: &str,
    pages: &str,
    options: &Options,
) -> Result<Summary> {
    let client = ApiClient::new(store, transport);
    let fetcher = DownloadClient::new(Some(client.builder()))?;
    let merger = Ffmpeg::new();

    download(&client, &fetcher, &merger, url, pages, options).await
}

fn format_duration(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

async fn resolve_item(client: &ApiClient<'_>, url: &str) -> Result<Item> {
    let metadata = MetadataFetcher::new(client);

    match classify(url)? {
        UrlKind::SingleVideo => metadata.fetch_single(&extract_single_id(url)?).await,
        UrlKind::Collection => metadata.fetch_collection(&extract_collection_id(url)?).await,
    }
}

async fn download(
    client: &ApiClient<'_>,
    fetcher: &dyn MediaFetch,
    merger: &dyn Merger,
    url: &str,
    pages: &str,
    options: &Options,
) -> Result<Summary> {
    if !client.builder().credentials().is_authenticated() {
        return Err(Error::NotAuthenticated);
    }

    let item = resolve_item(client, url).await?;
    println!("Title: {}", item.title);
    println!("Duration: {}", format_duration(item.duration));
    if item.kind == ItemKind::Collection {
        println!("Parts: {}", item.sub_items.len());
    }
    debug!("Resolved {} (av{}): {}", item.id, item.aid, item.description);
    debug!("Options: {:?}", options);

    tokio::fs::create_dir_all(&options.output_dir).await?;

    let (sender, receiver) = progress::channel();
    let printer = spawn_printer(receiver);

    let summary = {
        let resolver = StreamResolver::new(client);
        let retrieval = Retrieval::new(fetcher, merger, options, Some(sender));
        CollectionDownloader::new(&resolver, &retrieval).download_item(&item, pages).await
    };

    // every sender is gone once the retrieval is dropped
    if let Err(err) = printer.await {
        debug!("Progress printer stopped: {}", err);
    }

    let summary = summary?;
    println!();
    println!("Download complete: {} succeeded, {} failed", summary.succeeded, summary.failed);
    info!("Files saved to {}", options.output_dir.display());

    Ok(summary)
}
