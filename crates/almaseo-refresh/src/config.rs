//! Configuration for the status backend and panels.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RefreshError, RefreshResult};
use crate::tier::TierThresholds;

/// How the status endpoint is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// `wp-json/almaseo/v1/health/{id}`.
    #[default]
    Rest,

    /// Form-encoded `admin-ajax.php` action.
    Ajax,
}

impl FromStr for Transport {
    type Err = RefreshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "ajax" | "admin-ajax" => Ok(Self::Ajax),
            other => Err(RefreshError::Config {
                message: format!("unknown transport '{}' (expected rest or ajax)", other),
            }),
        }
    }
}

/// REST route of the health panel, relative to `wp-json/`.
pub const HEALTH_REST_ROUTE: &str = "almaseo/v1/health/{id}";

/// `admin-ajax.php` action of the health panel.
pub const HEALTH_AJAX_ACTION: &str = "almaseo_health_refresh";

pub const EVERGREEN_REST_ROUTE: &str = "almaseo/v1/evergreen/{id}";

pub const EVERGREEN_AJAX_ACTION: &str = "almaseo_evergreen_refresh";

/// Upper bound for `timeout_secs`.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Refresh configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Site root, e.g. `https://example.com`.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Bearer token (application password proxy).
    #[serde(default)]
    pub token: Option<String>,

    /// Nonce for the AJAX transport.
    #[serde(default)]
    pub nonce: Option<String>,

    #[serde(default)]
    pub transport: Transport,

    /// REST route template below `wp-json/`; `{id}` is replaced by the post id.
    #[serde(default = "default_rest_route")]
    pub rest_route: String,

    #[serde(default = "default_ajax_action")]
    pub ajax_action: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Field-edit debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long an error banner stays visible, in seconds.
    #[serde(default = "default_error_ttl")]
    pub error_ttl_secs: u64,

    #[serde(default)]
    pub tiers: TierThresholds,

    /// Unparseable `ALMASEO_TRANSPORT` value, reported by `validate`.
    #[serde(skip)]
    invalid_transport: Option<String>,
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_rest_route() -> String {
    HEALTH_REST_ROUTE.to_string()
}

fn default_ajax_action() -> String {
    HEALTH_AJAX_ACTION.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    800
}

fn default_error_ttl() -> u64 {
    8
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            token: None,
            nonce: None,
            transport: Transport::default(),
            rest_route: default_rest_route(),
            ajax_action: default_ajax_action(),
            timeout_secs: default_timeout(),
            debounce_ms: default_debounce_ms(),
            error_ttl_secs: default_error_ttl(),
            tiers: TierThresholds::default(),
            invalid_transport: None,
        }
    }
}

impl RefreshConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `ALMASEO_SITE_URL` | Site root URL |
    /// | `ALMASEO_API_TOKEN` | Bearer token |
    /// | `ALMASEO_NONCE` | AJAX nonce |
    /// | `ALMASEO_TRANSPORT` | `rest` or `ajax` |
    /// | `ALMASEO_REST_ROUTE` | REST route template, e.g. `almaseo/v1/evergreen/{id}` |
    /// | `ALMASEO_AJAX_ACTION` | `admin-ajax.php` action name |
    /// | `ALMASEO_TIMEOUT` | Request timeout in seconds |
    /// | `ALMASEO_DEBOUNCE_MS` | Field-edit debounce window |
    /// | `ALMASEO_ERROR_TTL` | Error banner lifetime in seconds |
    /// | `ALMASEO_TIER_GOOD` / `ALMASEO_TIER_WARN` | Score tier cutoffs |
    ///
    /// Unparseable numeric values fall back to their defaults. An unknown
    /// transport is kept aside and rejected by [`validate`](Self::validate).
    pub fn from_env() -> Self {
        let defaults = TierThresholds::default();
        let (transport, invalid_transport) = match non_empty_var("ALMASEO_TRANSPORT") {
            Some(raw) => match raw.parse() {
                Ok(transport) => (transport, None),
                Err(_) => (Transport::default(), Some(raw)),
            },
            None => (Transport::default(), None),
        };
        Self {
            site_url: std::env::var("ALMASEO_SITE_URL").unwrap_or_else(|_| default_site_url()),
            token: non_empty_var("ALMASEO_API_TOKEN"),
            nonce: non_empty_var("ALMASEO_NONCE"),
            transport,
            rest_route: non_empty_var("ALMASEO_REST_ROUTE").unwrap_or_else(default_rest_route),
            ajax_action: non_empty_var("ALMASEO_AJAX_ACTION").unwrap_or_else(default_ajax_action),
            timeout_secs: parsed_var("ALMASEO_TIMEOUT").unwrap_or_else(default_timeout),
            debounce_ms: parsed_var("ALMASEO_DEBOUNCE_MS").unwrap_or_else(default_debounce_ms),
            error_ttl_secs: parsed_var("ALMASEO_ERROR_TTL").unwrap_or_else(default_error_ttl),
            tiers: TierThresholds {
                good: parsed_var("ALMASEO_TIER_GOOD").unwrap_or(defaults.good),
                warn: parsed_var("ALMASEO_TIER_WARN").unwrap_or(defaults.warn),
            },
            invalid_transport,
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> RefreshResult<()> {
        if let Some(raw) = &self.invalid_transport {
            return Err(RefreshError::Config {
                message: format!("unknown transport '{}' (expected rest or ajax)", raw),
            });
        }
        let parsed = url::Url::parse(&self.site_url).map_err(|e| RefreshError::Config {
            message: format!("invalid site url '{}': {}", self.site_url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RefreshError::Config {
                message: format!("site url must be http(s), got '{}'", parsed.scheme()),
            });
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(RefreshError::Config {
                message: format!(
                    "timeout must be between 1 and {} seconds, got {}",
                    MAX_TIMEOUT_SECS, self.timeout_secs
                ),
            });
        }
        if !self.rest_route.contains("{id}") {
            return Err(RefreshError::Config {
                message: format!("rest route '{}' has no {{id}} placeholder", self.rest_route),
            });
        }
        if self.ajax_action.trim().is_empty() {
            return Err(RefreshError::Config {
                message: "ajax action must not be empty".into(),
            });
        }
        if self.transport == Transport::Ajax && self.nonce.is_none() {
            return Err(RefreshError::Config {
                message: "ajax transport requires a nonce (ALMASEO_NONCE)".into(),
            });
        }
        self.tiers.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn error_ttl(&self) -> Duration {
        Duration::from_secs(self.error_ttl_secs)
    }

    /// Set the site URL.
    pub fn with_site_url(mut self, url: impl Into<String>) -> Self {
        self.site_url = url.into();
        self
    }

    /// Set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the AJAX nonce.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self.invalid_transport = None;
        self
    }

    /// Point the REST transport at another route, e.g. [`EVERGREEN_REST_ROUTE`].
    pub fn with_rest_route(mut self, route: impl Into<String>) -> Self {
        self.rest_route = route.into();
        self
    }

    pub fn with_ajax_action(mut self, action: impl Into<String>) -> Self {
        self.ajax_action = action.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_tiers(mut self, tiers: TierThresholds) -> Self {
        self.tiers = tiers;
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
