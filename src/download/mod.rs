pub mod collection;
pub mod engine;
pub mod merge;
pub mod progress;

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Method, Request};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::auth::client::IDENTITY;
use crate::auth::AuthRequestBuilder;
use crate::error::Result;
use progress::ProgressTracker;

/// Streams a remote file to disk.
#[async_trait]
pub trait MediaFetch: Send + Sync {
    async fn fetch_to_file(&self, url: &str, output: &Path, tracker: ProgressTracker) -> Result<u64>;
}

pub struct DownloadClient<'a> {
    client: reqwest::Client,
    auth: Option<AuthRequestBuilder<'a>>,
}

impl<'a> DownloadClient<'a> {
    /// Media transfers have no timeout; a large file may take as long as it takes.
    pub fn new(auth: Option<AuthRequestBuilder<'a>>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(IDENTITY).build()?;

        Ok(Self { client, auth })
    }

    fn request(&self, url: &str) -> Result<Request> {
        match &self.auth {
            Some(auth) => auth.build_request(Method::GET, url, None),
            None => Ok(Request::new(Method::GET, Url::parse(url)?)),
        }
    }
}

#[async_trait]
impl MediaFetch for DownloadClient<'_> {
    async fn fetch_to_file(&self, url: &str, output: &Path, mut tracker: ProgressTracker) -> Result<u64> {
        debug!("Downloading {} to {}", url, output.display());

        let request = self.request(url)?;
        let mut response = self.client.execute(request).await?.error_for_status()?;

        let total = response.content_length();
        if let Some(total) = total {
            info!("{} size: {:.2} MB", tracker.kind(), total as f64 / (1024. * 1024.));
        }
        tracker.set_total(total);

        let mut file = tokio::fs::File::create(output).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            tracker.advance(chunk.len() as u64);
        }
        file.flush().await?;

        Ok(tracker.finish())
    }
}
