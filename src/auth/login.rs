use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::client::{ApiClient, Transport};
use crate::auth::credentials::{CredentialStore, IMPORTABLE_COOKIES, LOGIN_COOKIES};
use crate::auth::qr::QrRenderer;
use crate::error::{Error, Result};

const QR_GENERATE_URL: &str = "https://passport.bilibili.com/x/passport-login/web/qrcode/generate";
const QR_POLL_URL: &str = "https://passport.bilibili.com/x/passport-login/web/qrcode/poll";
const USER_INFO_URL: &str = "https://api.bilibili.com/x/space/myinfo";
pub const BROWSER_LOGIN_URL: &str = "https://passport.bilibili.com/login";

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

const QR_SUCCESS: i64 = 0;
const QR_NOT_SCANNED: i64 = 86101;
const QR_SCANNED: i64 = 86090;
const QR_EXPIRED: i64 = 86038;

#[derive(Debug, Deserialize)]
pub struct UserInfo {
    pub mid: i64,
    pub name: String,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub vip_status: i32,
}

pub async fn user_info(client: &ApiClient<'_>) -> Result<UserInfo> {
    let url = Url::parse(USER_INFO_URL)?;
    client.get_data(&url).await
}

#[derive(Deserialize)]
struct QrIssue {
    url: String,
    #[serde(default)]
    qrcode_key: String,
    #[serde(default, rename = "oauthKey")]
    oauth_key: String,
}

#[derive(Debug)]
pub struct QrTicket {
    pub url: String,
    pub key: String,
}

pub async fn issue_qr(client: &ApiClient<'_>) -> Result<QrTicket> {
    let url = Url::parse(QR_GENERATE_URL)?;
    let issue: QrIssue = client.get_data(&url).await?;

    // older deployments named the key `oauthKey`
    let key = if issue.qrcode_key.is_empty() { issue.oauth_key } else { issue.qrcode_key };
    if key.is_empty() {
        return Err(Error::Decode("QR code response has no key".to_string()));
    }

    Ok(QrTicket { url: issue.url, key })
}

#[derive(Deserialize)]
struct QrPoll {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, PartialEq)]
pub enum PollStatus {
    /// Carries the redirect URL whose query holds the new credentials.
    Confirmed(String),
    NotScanned,
    Scanned,
    Expired,
    Failed(String),
}

impl From<QrPoll> for PollStatus {
    fn from(poll: QrPoll) -> Self {
        match poll.code {
            QR_SUCCESS => Self::Confirmed(poll.url),
            QR_NOT_SCANNED => Self::NotScanned,
            QR_SCANNED => Self::Scanned,
            QR_EXPIRED => Self::Expired,
            _ => Self::Failed(poll.message),
        }
    }
}

pub async fn poll_qr(client: &ApiClient<'_>, key: &str) -> Result<PollStatus> {
    let url = Url::parse_with_params(QR_POLL_URL, &[("qrcode_key", key)])?;
    let poll: QrPoll = client.get_data(&url).await?;
    Ok(poll.into())
}

/// Picks the login cookies out of the redirect URL's query parameters.
pub fn credentials_from_redirect(redirect: &str) -> Result<Vec<(String, String)>> {
    let url = Url::parse(redirect)?;

    Ok(url
        .query_pairs()
        .filter(|(name, value)| LOGIN_COOKIES.contains(&name.as_ref()) && !value.is_empty())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect())
}

/// Runs the QR login until it is confirmed, expires or fails, then saves the credentials.
pub async fn login_with_qr(
    store: &mut CredentialStore,
    transport: &dyn Transport,
    renderer: &dyn QrRenderer,
    interval: Duration,
) -> Result<()> {
    let ticket = {
        let client = ApiClient::new(store, transport);
        issue_qr(&client).await?
    };
    debug!("Issued QR login ticket {}", ticket.key);

    println!("Scan the QR code with the Bilibili app to login:");
    println!("{}", ticket.url);
    if let Err(err) = renderer.render(&ticket.url) {
        warn!("Failed to display QR code: {}", err);
        println!("Could not show the QR code, open the link above instead");
    }
    println!("Waiting for scan...");

    let mut announced_scan = false;
    loop {
        let status = {
            let client = ApiClient::new(store, transport);
            poll_qr(&client, &ticket.key).await?
        };

        match status {
            PollStatus::Confirmed(redirect) => {
                println!();
                for (name, value) in credentials_from_redirect(&redirect)? {
                    store.set(&name, &value);
                }
                store.save()?;
                info!("QR login confirmed");
                return Ok(());
            }
            PollStatus::NotScanned => {
                print!(".");
                std::io::stdout().flush()?;
            }
            PollStatus::Scanned => {
                if !announced_scan {
                    println!("\nQR code scanned, please confirm the login on your phone");
                    announced_scan = true;
                }
            }
            PollStatus::Expired => return Err(Error::LoginExpired),
            PollStatus::Failed(message) => return Err(Error::LoginFailed(message)),
        }

        tokio::time::sleep(interval).await;
    }
}

/// Reads tab separated `name value ...` lines, keeping only importable names.
pub fn parse_cookie_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let value = fields.next()?.trim();
            IMPORTABLE_COOKIES
                .contains(&name)
                .then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

pub fn import_cookie_file(store: &mut CredentialStore, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let cookies = parse_cookie_lines(&content);
    if cookies.is_empty() {
        return Err(Error::NoCookiesFound);
    }

    for (name, value) in &cookies {
        store.set(name, value);
    }

    Ok(cookies.len())
}

pub fn open_browser(url: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = std::process::Command::new("rundll32");
        command.arg("url.dll,FileProtocolHandler");
        command
    } else if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else {
        std::process::Command::new("xdg-open")
    };

    command.arg(url).spawn()?;
    Ok(())
}
