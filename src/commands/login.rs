use std::path::PathBuf;

use tracing::{info, warn};

use crate::auth::login::{import_cookie_file, login_with_qr, open_browser, BROWSER_LOGIN_URL, POLL_INTERVAL};
use crate::auth::qr::{QrRenderer, TerminalQr};
use crate::auth::{CredentialStore, Transport};
use crate::commands::{current_user, describe, prompt};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    Qr,
    CookieFile(PathBuf),
    /// `name=value; name=value` as copied from a request's Cookie header
    CookieHeader(String),
    Browser,
}

pub async fn run(
    store: &mut CredentialStore,
    transport: &dyn Transport,
    method: LoginMethod,
    force: bool,
) -> Result<()> {
    login(store, transport, &TerminalQr, method, force).await
}

async fn login(
    store: &mut CredentialStore,
    transport: &dyn Transport,
    renderer: &dyn QrRenderer,
    method: LoginMethod,
    force: bool,
) -> Result<()> {
    if !force {
        if let Some(user) = current_user(store, transport).await {
            println!("Already logged in as {}", describe(&user));
            println!("Use --force to login again");
            return Ok(());
        }
    }

    match method {
        LoginMethod::Qr => login_with_qr(store, transport, renderer, POLL_INTERVAL).await?,
        LoginMethod::CookieFile(path) => {
            let count = import_cookie_file(store, &path)?;
            store.save()?;
            println!("Imported {} cookies from {}", count, path.display());
        }
        LoginMethod::CookieHeader(cookies) => {
            store.set_from_delimited(&cookies);
            if !store.is_authenticated() {
                return Err(Error::NoCookiesFound);
            }
            store.save()?;
            println!("Stored {} cookies", store.len());
        }
        LoginMethod::Browser => return browser_login(),
    }

    match current_user(store, transport).await {
        Some(user) => {
            println!("Login successful! Welcome, {}", describe(&user));
            println!("Level: {}  VIP: {}", user.level, if user.vip_status == 1 { "yes" } else { "no" });
        }
        None => warn!("Credentials saved, but the session could not be verified"),
    }

    Ok(())
}

fn browser_login() -> Result<()> {
    if let Err(err) = open_browser(BROWSER_LOGIN_URL) {
        warn!("Could not open a browser: {}", err);
    }

    println!("Log in at {}", BROWSER_LOGIN_URL);
    println!();
    println!("After logging in, export your cookies:");
    println!("  1. Open the developer tools (F12) and go to Application > Cookies");
    println!("  2. Copy SESSDATA, bili_jct and DedeUserID");
    println!("  3. Save them one per line as <name><TAB><value> in a text file");
    println!();

    let answer = prompt("Press Enter when done, or q to cancel: ")?;
    if answer.eq_ignore_ascii_case("q") {
        info!("Browser login cancelled");
        println!("Login cancelled");
        return Ok(());
    }

    println!("Now run: bili-dl login --cookie-file <file>");
    Ok(())
}
