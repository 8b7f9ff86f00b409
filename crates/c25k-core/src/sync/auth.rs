//! Session handling for the signed-in user.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::error::{AuthError, StorageError};
use crate::storage::KeyValueStore;
use crate::sync::types::Session;

pub const SESSION_KEY: &str = "c25k_auth_session";

/// Expiry instant `secs` from now, or `None` if it is out of range.
pub fn expiry_after(secs: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d))
}

/// Source of the current session.
pub trait AuthProvider: Send + Sync {
    /// The live session, or `None` when signed out or expired.
    fn current_session(&self) -> Result<Option<Session>, AuthError>;
}

/// Session persisted as a blob in the local key-value store.
pub struct KvSessionAuth<S: KeyValueStore> {
    kv: Mutex<S>,
}

impl<S: KeyValueStore> KvSessionAuth<S> {
    pub fn new(kv: S) -> Self {
        Self { kv: Mutex::new(kv) }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        self.kv.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn sign_in(&self, session: Session) -> Result<(), AuthError> {
        if session.user_id.trim().is_empty() {
            return Err(AuthError::SignInFailed("user id is empty".into()));
        }
        if session.access_token.trim().is_empty() {
            return Err(AuthError::SignInFailed("access token is empty".into()));
        }
        let raw = serde_json::to_string(&session).map_err(|source| StorageError::Malformed {
            key: SESSION_KEY.to_string(),
            source,
        })?;
        self.lock().set(SESSION_KEY, &raw)?;
        tracing::info!(user_id = %session.user_id, "signed in");
        Ok(())
    }

    /// Complete a magic-link sign-in. The redirect carries the token either
    /// in the fragment (`#access_token=...&expires_in=3600`) or the query;
    /// an `error_description` parameter means the link was rejected.
    pub fn sign_in_with_link(
        &self,
        link: &str,
        user_id: &str,
        email: Option<String>,
    ) -> Result<Session, AuthError> {
        let url = Url::parse(link).map_err(|e| AuthError::InvalidLink(e.to_string()))?;
        let fragment_pairs = url
            .fragment()
            .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect::<Vec<_>>())
            .unwrap_or_default();
        let param = |name: &str| {
            fragment_pairs
                .iter()
                .cloned()
                .chain(url.query_pairs().into_owned())
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
        };

        if let Some(reason) = param("error_description").or_else(|| param("error")) {
            return Err(AuthError::SignInFailed(reason));
        }
        let access_token = param("access_token")
            .ok_or_else(|| AuthError::InvalidLink("missing access_token".into()))?;
        let expires_at = match param("expires_in") {
            Some(secs) => {
                let secs: i64 = secs
                    .parse()
                    .map_err(|_| AuthError::InvalidLink(format!("bad expires_in '{secs}'")))?;
                Some(expiry_after(secs).ok_or_else(|| {
                    AuthError::InvalidLink(format!("expires_in {secs} out of range"))
                })?)
            }
            None => None,
        };

        let session = Session {
            user_id: user_id.to_string(),
            access_token,
            email,
            expires_at,
        };
        self.sign_in(session.clone())?;
        Ok(session)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().remove(SESSION_KEY)?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Stored session regardless of expiry.
    pub fn stored_session(&self) -> Result<Option<Session>, AuthError> {
        let raw = match self.lock().get(SESSION_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("ignoring malformed {SESSION_KEY}: {e}");
                Ok(None)
            }
        }
    }
}

impl<S: KeyValueStore> AuthProvider for KvSessionAuth<S> {
    fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self
            .stored_session()?
            .filter(|s| !s.is_expired(Utc::now())))
    }
}
