use clap::Subcommand;
use closet_background::{Background, Storage};
use closet_core::Request;

use crate::products::ensure_success;

/// Sub-commands available under `auth`.
#[derive(Debug, Subcommand)]
pub enum AuthCommands {
    /// Show the signed-in user
    Whoami,
    /// Create an anonymous user and keep its session
    Signin,
    /// End the session and forget the cached reference photo
    Signout,
}

pub(crate) async fn run_auth<S: Storage>(
    background: &Background<S>,
    command: AuthCommands,
) -> anyhow::Result<()> {
    match command {
        AuthCommands::Whoami => {
            let response = ensure_success(background.handle(Request::GetUser).await)?;
            match response.user {
                Some(user) if user.is_anonymous => println!("{} (anonymous)", user.id),
                Some(user) => println!("{}", user.id),
                None => println!("not signed in"),
            }
        }
        AuthCommands::Signin => {
            let response = ensure_success(background.handle(Request::SignInAnonymously).await)?;
            if let Some(user) = response.user {
                println!("signed in as {}", user.id);
            }
        }
        AuthCommands::Signout => {
            ensure_success(background.handle(Request::SignOut).await)?;
            println!("signed out");
        }
    }
    Ok(())
}
