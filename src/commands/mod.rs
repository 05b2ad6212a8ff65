pub mod download;
pub mod legal;
pub mod login;
pub mod logout;
pub mod version;

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::auth::login::{user_info, UserInfo};
use crate::auth::{ApiClient, CredentialStore, Transport};
use crate::config;
use crate::error::{Error, Result};

/// Loads the saved credentials from the per-user config directory.
pub fn open_store() -> Result<CredentialStore> {
    open_store_at(config::credentials_path())
}

/// A credential file that does not decode is logged and treated as empty.
/// I/O failures stay fatal.
fn open_store_at(path: PathBuf) -> Result<CredentialStore> {
    let mut store = CredentialStore::new(path);
    match store.load() {
        Ok(()) => {}
        Err(Error::Decode(err)) => {
            warn!("Failed to load existing cookies from {}: {}", store.path().display(), err);
            store.clear();
        }
        Err(err) => return Err(err),
    }
    Ok(store)
}

/// The logged in user, or `None` when the stored session is missing or rejected.
pub async fn current_user(store: &CredentialStore, transport: &dyn Transport) -> Option<UserInfo> {
    if !store.is_authenticated() {
        return None;
    }

    let client = ApiClient::new(store, transport);
    match user_info(&client).await {
        Ok(user) => Some(user),
        Err(err) => {
            debug!("Stored session is not usable: {}", err);
            None
        }
    }
}

pub fn describe(user: &UserInfo) -> String {
    format!("{} (UID: {})", user.name, user.mid)
}

/// Prints `question` and reads one trimmed line from stdin.
pub fn prompt(question: &str) -> Result<String> {
    print!("{}", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::client::mock::MockTransport;
    use crate::auth::credentials::{CSRF_TOKEN, SESSION_DATA};
    use crate::commands::login::LoginMethod;

    const MY_INFO: &str = r#"{"code":0,"message":"0","data":{"mid":42,"name":"tester","level":5,"vip_status":0}}"#;

    #[tokio::test]
    async fn corrupt_cookie_file_can_be_replaced_by_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "{ truncated").unwrap();

        let mut store = open_store_at(path.clone()).unwrap();
        assert_eq!(store.len(), 0);

        let transport = MockTransport::default().route("myinfo", MY_INFO);
        let header = "SESSDATA=sess; bili_jct=csrf".to_string();
        login::run(&mut store, &transport, LoginMethod::CookieHeader(header), false)
            .await
            .unwrap();

        let reloaded = open_store_at(path).unwrap();
        assert_eq!(reloaded.get(SESSION_DATA), "sess");
        assert_eq!(reloaded.get(CSRF_TOKEN), "csrf");
    }

    #[test]
    fn unreadable_cookie_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = open_store_at(dir.path().to_path_buf());
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
