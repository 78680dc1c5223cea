//! Reqwest-backed document store speaking a MediaWiki-style `api.php`.

use std::time::Duration;

use async_trait::async_trait;
use recat_logging::{engine_debug, engine_warn};
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::quota::{Quota, QuotaSource};
use crate::store::{DocumentStore, StoreError, WriteOutcome};

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Bounded retries for optimistic-concurrency losses inside `write`.
    pub conflict_retries: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: "recat/0.1".to_string(),
            conflict_retries: 2,
        }
    }
}

/// HTTP document store. Also implements [`QuotaSource`] by reading the
/// session's reported edit rate limit.
pub struct HttpDocumentStore {
    client: reqwest::Client,
    endpoint: Url,
    settings: StoreSettings,
    // CSRF token cache; refreshed once per write on `badtoken`.
    csrf_token: Mutex<Option<String>>,
}

impl HttpDocumentStore {
    pub fn new(endpoint: Url, settings: StoreSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| StoreError::Unknown(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            settings,
            csrf_token: Mutex::new(None),
        })
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&base_params())
            .query(params)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    async fn post_json(&self, form: &[(&str, &str)]) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&base_params())
            .form(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_json(response).await
    }

    async fn csrf_token(&self, refresh: bool) -> Result<String, StoreError> {
        let mut slot = self.csrf_token.lock().await;
        if !refresh {
            if let Some(token) = slot.as_ref() {
                return Ok(token.clone());
            }
        }
        let value = self
            .get_json(&[("action", "query"), ("meta", "tokens"), ("type", "csrf")])
            .await?;
        let token = value
            .pointer("/query/tokens/csrftoken")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Unknown("token response missing csrftoken".to_string()))?
            .to_string();
        *slot = Some(token.clone());
        Ok(token)
    }

    async fn read_rate_limit(&self) -> Result<Option<Quota>, StoreError> {
        let value = self
            .get_json(&[
                ("action", "query"),
                ("meta", "userinfo"),
                ("uiprop", "ratelimits"),
            ])
            .await?;
        let Some(edit) = value.pointer("/query/userinfo/ratelimits/edit") else {
            return Ok(None);
        };
        // Buckets in priority order; the first one present applies.
        let quota = ["user", "ip", "newbie"].iter().find_map(|bucket| {
            let node = edit.get(*bucket)?;
            let hits = node.get("hits")?.as_u64()?;
            let seconds = node.get("seconds")?.as_u64()?;
            Some(Quota {
                allowance: hits as u32,
                window_seconds: seconds as u32,
            })
        });
        Ok(quota)
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn read_body(&self, title: &str) -> Result<String, StoreError> {
        let value = self
            .get_json(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title),
            ])
            .await?;
        if let Some(code) = api_error(&value) {
            return Err(map_api_error(code, title));
        }

        let page = value
            .pointer("/query/pages/0")
            .ok_or_else(|| StoreError::Unknown("query response missing pages".to_string()))?;
        if flag_set(page, "missing") {
            return Err(StoreError::MissingTarget(title.to_string()));
        }
        if flag_set(page, "invalid") {
            return Err(StoreError::InvalidIdentifier(title.to_string()));
        }
        page.pointer("/revisions/0/slots/main/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Unknown("revision content missing".to_string()))
    }

    async fn write(
        &self,
        title: &str,
        body: &str,
        summary: &str,
    ) -> Result<WriteOutcome, StoreError> {
        let mut token = self.csrf_token(false).await?;
        let mut conflicts = 0;
        let mut token_refreshed = false;
        loop {
            let value = self
                .post_json(&[
                    ("action", "edit"),
                    ("title", title),
                    ("text", body),
                    ("summary", summary),
                    ("token", &token),
                ])
                .await?;

            match api_error(&value) {
                None => {
                    let edit = value
                        .pointer("/edit")
                        .ok_or_else(|| StoreError::Unknown("edit response missing".to_string()))?;
                    if flag_set(edit, "nochange") {
                        return Ok(WriteOutcome::NoChange);
                    }
                    return match edit.get("result").and_then(Value::as_str) {
                        Some("Success") => Ok(WriteOutcome::Accepted),
                        other => Err(StoreError::Unknown(format!(
                            "unexpected edit result: {other:?}"
                        ))),
                    };
                }
                Some("badtoken") if !token_refreshed => {
                    token_refreshed = true;
                    engine_debug!("stale csrf token for {title:?}; refreshing");
                    token = self.csrf_token(true).await?;
                }
                Some("editconflict") if conflicts < self.settings.conflict_retries => {
                    conflicts += 1;
                    engine_debug!("edit conflict on {title:?}; retry {conflicts}");
                }
                Some(code) => return Err(map_api_error(code, title)),
            }
        }
    }
}

#[async_trait]
impl QuotaSource for HttpDocumentStore {
    async fn fetch_quota(&self) -> Quota {
        match self.read_rate_limit().await {
            Ok(Some(quota)) => quota,
            Ok(None) => {
                engine_warn!("no edit rate limit reported; using fallback quota");
                Quota::FALLBACK
            }
            Err(err) => {
                engine_warn!("quota fetch failed ({err}); using fallback quota");
                Quota::FALLBACK
            }
        }
    }
}

fn base_params() -> [(&'static str, &'static str); 2] {
    [("format", "json"), ("formatversion", "2")]
}

async fn decode_json(response: reqwest::Response) -> Result<Value, StoreError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(StoreError::RateLimited);
    }
    if !status.is_success() {
        return Err(StoreError::Unknown(format!("http status {status}")));
    }
    let text = response.text().await.map_err(map_transport_error)?;
    serde_json::from_str(&text)
        .map_err(|err| StoreError::Unknown(format!("malformed api response: {err}")))
}

fn map_transport_error(err: reqwest::Error) -> StoreError {
    StoreError::Unknown(err.to_string())
}

fn api_error(value: &Value) -> Option<&str> {
    value.pointer("/error/code").and_then(Value::as_str)
}

fn map_api_error(code: &str, title: &str) -> StoreError {
    match code {
        "ratelimited" => StoreError::RateLimited,
        "missingtitle" => StoreError::MissingTarget(title.to_string()),
        "invalidtitle" | "badtitle" => StoreError::InvalidIdentifier(title.to_string()),
        "editconflict" => StoreError::Conflict,
        other => StoreError::Unknown(format!("api error: {other}")),
    }
}

fn flag_set(node: &Value, key: &str) -> bool {
    node.get(key).is_some_and(|v| v.as_bool().unwrap_or(true))
}
