use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

pub const SESSION_DATA: &str = "SESSDATA";
pub const CSRF_TOKEN: &str = "bili_jct";

/// Credential names handed back by the QR login redirect.
pub const LOGIN_COOKIES: [&str; 5] = [SESSION_DATA, CSRF_TOKEN, "DedeUserID", "DedeUserID__ckMd5", "sid"];

/// Credential names accepted from an exported cookie file.
pub const IMPORTABLE_COOKIES: [&str; 7] = [
    SESSION_DATA,
    CSRF_TOKEN,
    "DedeUserID",
    "DedeUserID__ckMd5",
    "sid",
    "buvid3",
    "buvid4",
];

/// Named cookie values persisted as a JSON object between runs.
#[derive(Debug, Default)]
pub struct CredentialStore {
    path: PathBuf,
    credentials: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path, credentials: BTreeMap::new() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the credential file. A missing file leaves the store empty.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            info!("No cookie file found, starting without authentication");
            return Ok(());
        }

        let data = std::fs::read_to_string(&self.path)?;
        self.credentials = serde_json::from_str(&data)?;

        debug!("Loaded {} cookies from {}", self.credentials.len(), self.path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(&self.credentials)?;
        std::fs::write(&self.path, data)?;

        info!("Saved cookies to {}", self.path.display());
        Ok(())
    }

    /// Deletes the credential file, returning whether there was one.
    pub fn remove_file(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        Ok(true)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.credentials.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> &str {
        self.credentials.get(name).map(String::as_str).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.credentials.clear();
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Parses `a=1; b=2` style input. Segments without `=` are skipped.
    pub fn set_from_delimited(&mut self, cookies: &str) {
        for cookie in cookies.split(';') {
            let cookie = cookie.trim();
            if cookie.is_empty() {
                continue;
            }

            if let Some((name, value)) = cookie.split_once('=') {
                self.set(name.trim(), value.trim());
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.get(SESSION_DATA).is_empty() && !self.get(CSRF_TOKEN).is_empty()
    }

    /// The store contents as a single `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        self.credentials
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
