//! REST client for a PostgREST-style `workout_completions` table.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SyncError;
use crate::storage::RemoteConfig;
use crate::sync::remote::RemoteCompletionStore;
use crate::sync::types::WorkoutCompletion;

const CONFLICT_KEY: &str = "user_id,workout_id";
const SELECT_COLUMNS: &str = "workout_id,completed_at,duration_seconds";

/// One table row as the REST endpoint speaks it.
#[derive(Debug, Serialize, Deserialize)]
struct CompletionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    workout_id: String,
    completed_at: DateTime<Utc>,
    duration_seconds: Option<u64>,
}

impl CompletionRow {
    fn for_user(user_id: &str, c: &WorkoutCompletion) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            workout_id: c.workout_id.clone(),
            completed_at: c.completed_at,
            duration_seconds: c.duration_seconds,
        }
    }
}

impl From<CompletionRow> for WorkoutCompletion {
    fn from(row: CompletionRow) -> Self {
        Self {
            workout_id: row.workout_id,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds,
        }
    }
}

/// Remote store over HTTP.
pub struct HttpCompletionStore {
    client: Client,
    table_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl HttpCompletionStore {
    /// Build a client for `config`. `base_url` is the REST root; the table
    /// name is joined onto it.
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        if !config.is_configured() {
            return Err(SyncError::Endpoint("remote.base_url is not set".into()));
        }
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let table_url = Url::parse(&base)
            .and_then(|u| u.join(&config.table))
            .map_err(|e| SyncError::Endpoint(format!("{}: {e}", config.base_url)))?;

        Ok(Self {
            client: Client::new(),
            table_url,
            api_key: config.api_key.clone(),
            access_token: None,
        })
    }

    /// Authenticate requests as the signed-in user. Without a token the
    /// API key is used as the bearer.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        let req = req.bearer_auth(bearer);
        if self.api_key.is_empty() {
            req
        } else {
            req.header("apikey", &self.api_key)
        }
    }

    async fn write(&self, rows: &[CompletionRow], resolution: &str) -> Result<(), SyncError> {
        let req = self
            .client
            .post(self.table_url.clone())
            .query(&[("on_conflict", CONFLICT_KEY)])
            .header("Prefer", format!("resolution={resolution},return=minimal"))
            .json(rows);
        let resp = self.authorize(req).send().await?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(SyncError::Status {
        status: status.as_u16(),
        message,
    })
}

impl RemoteCompletionStore for HttpCompletionStore {
    async fn upsert(&self, user_id: &str, completion: &WorkoutCompletion) -> Result<(), SyncError> {
        let rows = [CompletionRow::for_user(user_id, completion)];
        self.write(&rows, "merge-duplicates").await
    }

    async fn insert_missing(
        &self,
        user_id: &str,
        completions: &[WorkoutCompletion],
    ) -> Result<(), SyncError> {
        if completions.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = completions
            .iter()
            .map(|c| CompletionRow::for_user(user_id, c))
            .collect();
        self.write(&rows, "ignore-duplicates").await
    }

    async fn fetch_all(&self, user_id: &str) -> Result<Vec<WorkoutCompletion>, SyncError> {
        let user_filter = format!("eq.{user_id}");
        let req = self.client.get(self.table_url.clone()).query(&[
            ("select", SELECT_COLUMNS),
            ("user_id", user_filter.as_str()),
            ("order", "completed_at.desc"),
        ]);
        let resp = check_status(self.authorize(req).send().await?).await?;
        let body = resp.text().await?;
        let rows: Vec<CompletionRow> = serde_json::from_str(&body)?;
        Ok(rows.into_iter().map(WorkoutCompletion::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(base_url: &str) -> RemoteConfig {
        RemoteConfig {
            base_url: base_url.to_string(),
            api_key: "anon-key".into(),
            ..RemoteConfig::default()
        }
    }

    #[test]
    fn table_url_joins_base_and_table() {
        let store = HttpCompletionStore::new(&config("https://db.example.test/rest/v1")).unwrap();
        assert_eq!(
            store.table_url().as_str(),
            "https://db.example.test/rest/v1/workout_completions"
        );
    }

    #[test]
    fn unconfigured_endpoint_is_rejected() {
        assert!(matches!(
            HttpCompletionStore::new(&RemoteConfig::default()),
            Err(SyncError::Endpoint(_))
        ));
    }

    #[tokio::test]
    async fn upsert_posts_row_with_merge_resolution() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/workout_completions")
            .match_query(Matcher::UrlEncoded(
                "on_conflict".into(),
                "user_id,workout_id".into(),
            ))
            .match_header("authorization", "Bearer user-token")
            .match_header("apikey", "anon-key")
            .match_header(
                "prefer",
                Matcher::Regex("resolution=merge-duplicates".into()),
            )
            .match_body(Matcher::PartialJsonString(
                r#"[{"user_id":"u1","workout_id":"W1D1","duration_seconds":1712}]"#.into(),
            ))
            .with_status(201)
            .create_async()
            .await;

        let store = HttpCompletionStore::new(&config(&server.url()))
            .unwrap()
            .with_access_token("user-token");
        store
            .upsert("u1", &WorkoutCompletion::new("W1D1", Some(1712)))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn insert_missing_ignores_duplicates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/workout_completions")
            .match_query(Matcher::Any)
            .match_header(
                "prefer",
                Matcher::Regex("resolution=ignore-duplicates".into()),
            )
            .with_status(201)
            .create_async()
            .await;

        let store = HttpCompletionStore::new(&config(&server.url())).unwrap();
        store
            .insert_missing(
                "u1",
                &[
                    WorkoutCompletion::new("W1D1", None),
                    WorkoutCompletion::new("W1D2", None),
                ],
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_all_decodes_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/workout_completions")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "eq.u1".into()),
                Matcher::UrlEncoded("order".into(), "completed_at.desc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                    {"workout_id":"W2D1","completed_at":"2025-03-03T07:00:00+00:00","duration_seconds":null},
                    {"workout_id":"W1D3","completed_at":"2025-03-01T07:00:00+00:00","duration_seconds":1710}
                ]"#,
            )
            .create_async()
            .await;

        let store = HttpCompletionStore::new(&config(&server.url())).unwrap();
        let rows = store.fetch_all("u1").await.unwrap();
        mock.assert_async().await;

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].workout_id, "W2D1");
        assert_eq!(rows[0].duration_seconds, None);
        assert_eq!(rows[1].duration_seconds, Some(1710));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/workout_completions")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("JWT expired")
            .create_async()
            .await;

        let store = HttpCompletionStore::new(&config(&server.url())).unwrap();
        let err = store
            .upsert("u1", &WorkoutCompletion::new("W1D1", None))
            .await
            .unwrap_err();
        match err {
            SyncError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
