//! HTTP layer: transport selection, status mapping, envelope parsing.
//!
//! This is the ONLY place for status code handling. The guard never
//! interprets HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::{RefreshConfig, Transport};
use crate::error::{RefreshError, RefreshResult};
use crate::types::{EntitySnapshot, StatusRequest};

use super::StatusBackend;

pub const USER_AGENT_VALUE: &str = concat!("almaseo-refresh/", env!("CARGO_PKG_VERSION"));

/// Header carrying the refresh token, so server logs can correlate attempts.
pub const REFRESH_TOKEN_HEADER: &str = "x-almaseo-refresh-token";

/// `admin-ajax.php` response envelope.
#[derive(Debug, Deserialize)]
struct AjaxEnvelope {
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
}

/// WordPress REST error body.
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

/// reqwest-backed [`StatusBackend`].
///
/// Serves any payload type that deserializes from the endpoint's body, so one
/// client works for the health panel and, with
/// [`RefreshConfig::with_rest_route`], for other panels such as evergreen.
#[derive(Debug, Clone)]
pub struct HttpStatusBackend {
    client: reqwest::Client,
    site_url: String,
    config: RefreshConfig,
}

impl HttpStatusBackend {
    pub fn new(config: RefreshConfig) -> RefreshResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        // The guard owns the deadline; this one only bounds a hung socket.
        let client = reqwest::Client::builder()
            .timeout(config.timeout().saturating_add(Duration::from_secs(1)))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RefreshError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let site_url = config.site_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            site_url,
            config,
        })
    }

    pub fn from_env() -> RefreshResult<Self> {
        Self::new(RefreshConfig::from_env())
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn transport(&self) -> Transport {
        self.config.transport
    }

    fn rest_url(&self, entity_id: u64) -> String {
        let route = self
            .config
            .rest_route
            .trim_start_matches('/')
            .replace("{id}", &entity_id.to_string());
        format!("{}/wp-json/{}", self.site_url, route)
    }

    fn ajax_url(&self) -> String {
        format!("{}/wp-admin/admin-ajax.php", self.site_url)
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        request: &StatusRequest,
    ) -> reqwest::RequestBuilder {
        let builder = builder.header(REFRESH_TOKEN_HEADER, request.token.get());
        match &self.config.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn fetch_rest<T>(&self, request: &StatusRequest) -> RefreshResult<T>
    where
        T: EntitySnapshot + DeserializeOwned,
    {
        let url = self.rest_url(request.entity_id);
        debug!(
            url = %url,
            token = %request.token,
            reason = %request.reason,
            "fetching status (rest)"
        );

        let builder = match &request.draft {
            Some(draft) => self.client.post(&url).json(&serde_json::json!({
                "reason": request.reason,
                "draft": draft,
            })),
            None => self.client.get(&url).query(&[("reason", request.reason.as_str())]),
        };

        let response = self.authorize(builder, request).send().await?;
        let response = check_status(response, request.entity_id).await?;

        let body = response.text().await.map_err(|e| RefreshError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        parse_snapshot(&body, request.entity_id)
    }

    async fn fetch_ajax<T>(&self, request: &StatusRequest) -> RefreshResult<T>
    where
        T: EntitySnapshot + DeserializeOwned,
    {
        let url = self.ajax_url();
        debug!(
            url = %url,
            token = %request.token,
            reason = %request.reason,
            action = %self.config.ajax_action,
            "fetching status (ajax)"
        );

        let mut form: Vec<(&str, String)> = vec![
            ("action", self.config.ajax_action.clone()),
            ("post_id", request.entity_id.to_string()),
            ("reason", request.reason.clone()),
            ("nonce", self.config.nonce.clone().unwrap_or_default()),
        ];
        if let Some(draft) = &request.draft {
            let encoded = serde_json::to_string(draft).map_err(|e| RefreshError::Config {
                message: format!("failed to encode draft fields: {}", e),
            })?;
            form.push(("draft", encoded));
        }

        let builder = self.client.post(&url).form(&form);
        let response = self.authorize(builder, request).send().await?;
        let response = check_status(response, request.entity_id).await?;

        let body = response.text().await.map_err(|e| RefreshError::Network {
            message: format!("failed to read response body: {}", e),
        })?;
        parse_ajax_envelope(&body, request.entity_id, &self.config.ajax_action)
    }
}

#[async_trait]
impl<T> StatusBackend<T> for HttpStatusBackend
where
    T: EntitySnapshot + DeserializeOwned,
{
    async fn fetch_status(&self, request: &StatusRequest) -> RefreshResult<T> {
        match self.config.transport {
            Transport::Rest => self.fetch_rest(request).await,
            Transport::Ajax => self.fetch_ajax(request).await,
        }
    }
}

/// Map non-success statuses onto [`RefreshError`].
async fn check_status(
    response: reqwest::Response,
    entity_id: u64,
) -> RefreshResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RefreshError::Unauthorized { message },
        StatusCode::NOT_FOUND => RefreshError::NotFound { entity_id },
        StatusCode::TOO_MANY_REQUESTS => RefreshError::RateLimited { retry_after },
        _ if status.is_server_error() => RefreshError::Network {
            message: format!("HTTP {}: {}", status.as_u16(), message),
        },
        _ => RefreshError::Backend { message },
    })
}

/// Pull a human-readable message out of a REST or AJAX error body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(rest) = serde_json::from_str::<RestErrorBody>(body) {
        return Some(match rest.code {
            Some(code) if rest.message.is_empty() => code,
            _ => rest.message,
        });
    }
    if let Ok(envelope) = serde_json::from_str::<AjaxEnvelope>(body) {
        return ajax_failure_message(&envelope.data);
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() <= 200 && !trimmed.starts_with('<'))
        .then(|| trimmed.to_string())
}

fn ajax_failure_message(data: &serde_json::Value) -> Option<String> {
    match data {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        _ => None,
    }
}

fn parse_snapshot<T: EntitySnapshot + DeserializeOwned>(
    body: &str,
    entity_id: u64,
) -> RefreshResult<T> {
    let snapshot: T =
        serde_json::from_str(body).map_err(|e| RefreshError::InvalidResponse {
            message: format!("failed to parse status response: {}", e),
        })?;
    check_entity(snapshot, entity_id)
}

fn parse_ajax_envelope<T: EntitySnapshot + DeserializeOwned>(
    body: &str,
    entity_id: u64,
    action: &str,
) -> RefreshResult<T> {
    // admin-ajax answers "0" or "-1" when the action is unknown or the nonce fails.
    match body.trim() {
        "0" => {
            return Err(RefreshError::Backend {
                message: format!("ajax action '{}' is not registered", action),
            })
        }
        "-1" => {
            return Err(RefreshError::Unauthorized {
                message: "nonce verification failed".into(),
            })
        }
        _ => {}
    }

    let envelope: AjaxEnvelope =
        serde_json::from_str(body).map_err(|e| RefreshError::InvalidResponse {
            message: format!("failed to parse ajax envelope: {}", e),
        })?;

    if !envelope.success {
        return Err(RefreshError::Backend {
            message: ajax_failure_message(&envelope.data)
                .unwrap_or_else(|| "status refresh failed".to_string()),
        });
    }

    let snapshot: T =
        serde_json::from_value(envelope.data).map_err(|e| RefreshError::InvalidResponse {
            message: format!("failed to parse status data: {}", e),
        })?;
    check_entity(snapshot, entity_id)
}

fn check_entity<T: EntitySnapshot>(snapshot: T, entity_id: u64) -> RefreshResult<T> {
    if snapshot.entity_id() != entity_id {
        return Err(RefreshError::InvalidResponse {
            message: format!(
                "response is for post {}, expected {}",
                snapshot.entity_id(),
                entity_id
            ),
        });
    }
    Ok(snapshot)
}
