//! Progress sync with the remote completion store.

use clap::Subcommand;
use c25k_core::sync::AuthProvider;
use c25k_core::{Config, SyncError};

use super::{coordinator, open_auth, open_local, runtime, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Full reconciliation: upload missing, drain the queue, refresh the cache
    Now,
    /// Retry queued uploads
    Retry,
    /// List completions waiting for upload
    Queue {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sign-in state and pending count
    Status,
}

pub fn run(action: SyncAction) -> CliResult {
    let config = Config::load_or_default();
    let local = open_local()?;

    match action {
        SyncAction::Queue { json } => {
            let queue = local.queue();
            if json {
                println!("{}", serde_json::to_string_pretty(&queue)?);
            } else if queue.is_empty() {
                println!("queue is empty");
            } else {
                for c in queue.entries() {
                    println!("{:<5} {}", c.workout_id, c.completed_at.to_rfc3339());
                }
            }
            return Ok(());
        }
        SyncAction::Status => {
            let session = open_auth()?.current_session()?;
            println!(
                "remote: {}",
                if config.remote.is_configured() {
                    config.remote.base_url.as_str()
                } else {
                    "not configured"
                }
            );
            match session {
                Some(s) => println!("signed in: {}", s.email.as_deref().unwrap_or(&s.user_id)),
                None => println!("signed in: no"),
            }
            println!("pending: {}", local.queue().len());
            return Ok(());
        }
        SyncAction::Now | SyncAction::Retry => {}
    }

    let coordinator = coordinator(&config, local)?.ok_or_else(|| {
        SyncError::Endpoint("remote.base_url is not set (c25k config set remote.base_url ...)".into())
    })?;
    let rt = runtime()?;

    match action {
        SyncAction::Now => {
            let user_id = open_auth()?
                .current_session()?
                .map(|s| s.user_id)
                .ok_or(SyncError::NotSignedIn)?;
            let report = rt.block_on(coordinator.sync_on_sign_in(&user_id));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SyncAction::Retry => match rt.block_on(coordinator.attempt_queue_sync())? {
            Some(report) => println!("synced {}, {} still queued", report.synced, report.remaining),
            None => return Err(SyncError::NotSignedIn.into()),
        },
        SyncAction::Queue { .. } | SyncAction::Status => {}
    }
    Ok(())
}
