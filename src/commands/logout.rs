use tracing::info;

use crate::auth::{CredentialStore, Transport};
use crate::commands::{current_user, describe, prompt};
use crate::error::Result;

pub async fn run(store: &mut CredentialStore, transport: &dyn Transport, force: bool) -> Result<()> {
    logout(store, transport, force, || prompt("Are you sure you want to logout? [y/N] ")).await
}

async fn logout<F>(store: &mut CredentialStore, transport: &dyn Transport, force: bool, confirm: F) -> Result<()>
where
    F: FnOnce() -> Result<String>,
{
    if !store.is_authenticated() {
        println!("No active login session found.");
        return Ok(());
    }

    let who = current_user(store, transport)
        .await
        .map(|user| describe(&user))
        .unwrap_or_else(|| "current user".to_string());
    println!("Logged in as {}", who);

    if !force {
        let answer = confirm()?;
        if !matches!(answer.to_lowercase().as_str(), "y" | "yes") {
            println!("Logout cancelled");
            return Ok(());
        }
    }

    if store.remove_file()? {
        info!("Removed {}", store.path().display());
    }
    store.clear();

    println!("Logged out {}", who);
    Ok(())
}
