use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, COOKIE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Method, Request};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::auth::credentials::CredentialStore;
use crate::error::{Error, Result};

pub const IDENTITY: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const SITE_ORIGIN: &str = "https://www.bilibili.com";
pub const SITE_REFERER: &str = "https://www.bilibili.com/";

const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds requests carrying the platform identity headers and the current cookies.
#[derive(Clone, Copy)]
pub struct AuthRequestBuilder<'a> {
    credentials: &'a CredentialStore,
}

impl<'a> AuthRequestBuilder<'a> {
    pub fn new(credentials: &'a CredentialStore) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &'a CredentialStore {
        self.credentials
    }

    pub fn build_request(&self, method: Method, url: &str, body: Option<String>) -> Result<Request> {
        let url = Url::parse(url)?;
        let mut request = Request::new(method, url);

        let headers = request.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_static(IDENTITY));
        headers.insert(ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
        headers.insert(REFERER, HeaderValue::from_static(SITE_REFERER));

        let cookies = self.credentials.cookie_header();
        if !cookies.is_empty() {
            let value = HeaderValue::from_str(&cookies)
                .map_err(|err| Error::InvalidRequest(format!("cookie header: {}", err)))?;
            headers.insert(COOKIE, value);
        }

        if let Some(body) = body {
            *request.body_mut() = Some(body.into());
        }

        Ok(request)
    }
}

/// Executes a built request and hands back the whole response body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Bytes>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(API_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Bytes> {
        let url = request.url().clone();
        debug!("GET {}", url);

        let response = self.client.execute(request).await?;
        let response = response.error_for_status()?;

        Ok(response.bytes().await?)
    }
}

#[derive(Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default, alias = "result")]
    data: Option<serde_json::Value>,
}

/// Authenticated access to the platform's JSON API.
pub struct ApiClient<'a> {
    builder: AuthRequestBuilder<'a>,
    transport: &'a dyn Transport,
}

impl<'a> ApiClient<'a> {
    pub fn new(credentials: &'a CredentialStore, transport: &'a dyn Transport) -> Self {
        Self { builder: AuthRequestBuilder::new(credentials), transport }
    }

    pub fn builder(&self) -> AuthRequestBuilder<'a> {
        self.builder
    }

    /// GETs `url` and decodes the `data` payload of the `{code, message, data}` envelope.
    pub async fn get_data<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        let request = self.builder.build_request(Method::GET, url.as_str(), None)?;
        let body = self.transport.execute(request).await?;

        let envelope: Envelope = serde_json::from_slice(&body)?;
        if envelope.code != 0 {
            return Err(Error::Api { code: envelope.code, message: envelope.message });
        }

        let data = envelope
            .data
            .ok_or_else(|| Error::Decode(format!("response from {} has no data", url.path())))?;

        Ok(serde_json::from_value(data)?)
    }
}
