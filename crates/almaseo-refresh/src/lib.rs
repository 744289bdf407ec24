//! Stale-response-safe status refresh for AlmaSEO editor panels.
//!
//! Panels such as the health score and the evergreen tracker re-fetch their
//! state from the plugin backend on many triggers: a refresh click, a field
//! edit, a completed save, the tab regaining focus. Responses can arrive in
//! any order. This crate guarantees that only the response to the most
//! recently *requested* refresh is ever shown.
//!
//! - [`StaleResponseGuard`]: token-based request coordination per panel,
//!   generic over the panel payload ([`StatusSnapshot`], [`EvergreenSnapshot`])
//! - [`HttpStatusBackend`]: REST or `admin-ajax.php` status endpoint client
//! - [`PanelView`]: idempotent, DOM-free view model used as the result sink
//! - [`PanelController`]: maps editor lifecycle events onto refreshes
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use almaseo_refresh::{
//!     GuardConfig, HttpStatusBackend, PanelView, RefreshConfig, SharedPanel, StaleResponseGuard,
//! };
//!
//! # async fn example() -> Result<(), almaseo_refresh::RefreshError> {
//! let config = RefreshConfig::from_env();
//! let backend = Arc::new(HttpStatusBackend::new(config.clone())?);
//! let panel = SharedPanel::new(PanelView::new(config.tiers, config.error_ttl()));
//!
//! let guard = StaleResponseGuard::new(42, backend, Arc::new(panel.clone()), GuardConfig::from(&config))?;
//! guard.request_refresh("manual", None);
//! guard.settled().await;
//! println!("{}", panel.lock().render(std::time::Instant::now()));
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `ALMASEO_SITE_URL` | Site root (default: `http://localhost:8080`) |
//! | `ALMASEO_API_TOKEN` | Bearer token |
//! | `ALMASEO_NONCE` | Nonce for the AJAX transport |
//! | `ALMASEO_TRANSPORT` | `rest` (default) or `ajax` |
//! | `ALMASEO_REST_ROUTE` | REST route template (default: `almaseo/v1/health/{id}`) |
//! | `ALMASEO_AJAX_ACTION` | AJAX action (default: `almaseo_health_refresh`) |
//! | `ALMASEO_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `ALMASEO_DEBOUNCE_MS` | Field-edit debounce (default: 800) |
//! | `ALMASEO_ERROR_TTL` | Error banner lifetime in seconds (default: 8) |
//! | `ALMASEO_TIER_GOOD` / `ALMASEO_TIER_WARN` | Score tier cutoffs (default: 80 / 50) |

pub mod backend;
pub mod config;
pub mod debounce;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod tier;
pub mod types;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use backend::{HttpStatusBackend, StatusBackend, REFRESH_TOKEN_HEADER, USER_AGENT_VALUE};
pub use config::{
    RefreshConfig, Transport, EVERGREEN_AJAX_ACTION, EVERGREEN_REST_ROUTE, HEALTH_AJAX_ACTION,
    HEALTH_REST_ROUTE, MAX_TIMEOUT_SECS,
};
pub use debounce::TrailingDebounce;
pub use error::{RefreshError, RefreshResult};
pub use guard::{GuardConfig, StaleResponseGuard, StatusSink};
pub use lifecycle::{Dispatch, EditorEvent, PanelController};
pub use tier::{ScoreTier, TierThresholds};
pub use types::{
    parse_timestamp, DraftFields, EntitySnapshot, EvergreenSnapshot, EvergreenState,
    RefreshToken, SerpPreview, SignalResult, StatusRequest, StatusSnapshot,
};
pub use view::{Banner, PanelView, SharedPanel, SignalRow};
