use std::sync::Arc;

use clap::Subcommand;
use c25k_core::sync::{expiry_after, AuthProvider, Session};
use c25k_core::AuthError;
use c25k_core::Config;

use super::{coordinator, open_auth, open_local, runtime, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a session issued by the auth service
    Login {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        email: Option<String>,
        /// Session lifetime in seconds
        #[arg(long)]
        expires_in: Option<i64>,
    },
    /// Finish a magic-link sign-in from the redirect URL in the email
    Link {
        /// Full redirect URL, including the `#access_token=...` fragment
        url: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Remove the stored session
    Logout,
    /// Check authentication status
    Status,
}

pub fn run(action: AuthAction) -> CliResult {
    let auth = open_auth()?;
    let user_id = match action {
        AuthAction::Login {
            user_id,
            access_token,
            email,
            expires_in,
        } => {
            let expires_at = match expires_in {
                Some(secs) => Some(expiry_after(secs).ok_or_else(|| {
                    AuthError::SignInFailed(format!("expires-in {secs} out of range"))
                })?),
                None => None,
            };
            auth.sign_in(Session {
                user_id: user_id.clone(),
                access_token,
                email,
                expires_at,
            })?;
            user_id
        }
        AuthAction::Link {
            url,
            user_id,
            email,
        } => auth.sign_in_with_link(&url, &user_id, email)?.user_id,
        AuthAction::Logout => {
            auth.sign_out()?;
            println!("signed out");
            return Ok(());
        }
        AuthAction::Status => {
            match auth.current_session()? {
                Some(s) => {
                    println!("signed in as {}", s.email.as_deref().unwrap_or(&s.user_id));
                    if let Some(expires) = s.expires_at {
                        println!("expires {}", expires.to_rfc3339());
                    }
                }
                None if auth.stored_session()?.is_some() => println!("session expired"),
                None => println!("not signed in"),
            }
            return Ok(());
        }
    };
    println!("signed in as {user_id}");

    // Bring local progress and the cloud together right away.
    let config = Config::load_or_default();
    let local = open_local()?;
    if let Some(coordinator) = coordinator(&config, Arc::clone(&local))? {
        let rt = runtime()?;
        let report = rt.block_on(coordinator.sync_on_sign_in(&user_id));
        println!(
            "synced: {} uploaded, {} from queue, {} completions on this device",
            report.migrated, report.drained.synced, report.local_count
        );
        if !report.cache_refreshed {
            eprintln!("warning: could not reach the remote store; local progress kept");
        }
    }
    Ok(())
}
