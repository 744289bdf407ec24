//! Stale-response-safe refresh coordination for one panel.
//!
//! Every refresh request takes a fresh token from a per-guard counter. When a
//! backend call settles, its token is compared with the guard's current token
//! under the state lock; only an exact match reaches the sink. Aborting the
//! superseded task is an optimization on top of that comparison.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::backend::StatusBackend;
use crate::config::RefreshConfig;
use crate::debounce::TrailingDebounce;
use crate::error::{RefreshError, RefreshResult};
use crate::types::{DraftFields, EntitySnapshot, RefreshToken, StatusRequest, StatusSnapshot};

/// Receiver of accepted results.
///
/// Callbacks run while the guard holds its state lock, so implementations
/// must not call back into the guard.
pub trait StatusSink<T = StatusSnapshot>: Send + Sync + 'static {
    /// Called exactly once per accepted response.
    fn on_apply(&self, snapshot: &T);

    /// Called for failures of the current request only.
    fn on_error(&self, error: &RefreshError);

    fn on_loading(&self, _loading: bool) {}
}

/// Guard tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Deadline for one backend call; expiry counts as a network failure.
    pub timeout: Duration,

    /// Trailing debounce window for `request_refresh_debounced`.
    pub debounce: Duration,

    /// Abort the task of a superseded request.
    pub abort_superseded: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            debounce: Duration::from_millis(800),
            abort_superseded: true,
        }
    }
}

impl From<&RefreshConfig> for GuardConfig {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            timeout: config.timeout(),
            debounce: config.debounce(),
            ..Self::default()
        }
    }
}

struct PendingRequest {
    token: RefreshToken,
    task: AbortHandle,
}

struct GuardState<T> {
    counter: u64,
    /// `None` before the first request and after dispose.
    current: Option<RefreshToken>,
    pending: Option<PendingRequest>,
    debounce: TrailingDebounce,
    snapshot: Option<Arc<T>>,
    /// When the latest request was issued, debounced ones included.
    last_issued: Option<Instant>,
    loading: bool,
    disposed: bool,
}

struct Inner<T: EntitySnapshot> {
    entity_id: u64,
    backend: Arc<dyn StatusBackend<T>>,
    sink: Arc<dyn StatusSink<T>>,
    config: GuardConfig,
    runtime: Handle,
    state: Mutex<GuardState<T>>,
    in_flight: watch::Sender<Option<RefreshToken>>,
}

/// Per-panel refresh coordinator. Dropping it disposes it.
///
/// `T` is the panel's payload: [`StatusSnapshot`] for the health panel,
/// [`EvergreenSnapshot`](crate::types::EvergreenSnapshot) for the evergreen
/// panel, or any other [`EntitySnapshot`].
pub struct StaleResponseGuard<T: EntitySnapshot = StatusSnapshot> {
    inner: Arc<Inner<T>>,
}

impl<T: EntitySnapshot> fmt::Debug for StaleResponseGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaleResponseGuard")
            .field("entity_id", &self.inner.entity_id)
            .field("current", &self.current_token())
            .field("loading", &self.is_loading())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T: EntitySnapshot> StaleResponseGuard<T> {
    /// Create a guard for `entity_id`. Must be called from within a tokio
    /// runtime; requests are spawned on that runtime.
    pub fn new<B, S>(
        entity_id: u64,
        backend: Arc<B>,
        sink: Arc<S>,
        config: GuardConfig,
    ) -> RefreshResult<Self>
    where
        B: StatusBackend<T>,
        S: StatusSink<T>,
    {
        let runtime = Handle::try_current().map_err(|e| RefreshError::Config {
            message: format!("refresh guard requires a tokio runtime: {}", e),
        })?;

        let (in_flight, _) = watch::channel(None);
        let debounce = TrailingDebounce::new(config.debounce, runtime.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                entity_id,
                backend: backend as Arc<dyn StatusBackend<T>>,
                sink: sink as Arc<dyn StatusSink<T>>,
                config,
                runtime,
                state: Mutex::new(GuardState {
                    counter: 0,
                    current: None,
                    pending: None,
                    debounce,
                    snapshot: None,
                    last_issued: None,
                    loading: false,
                    disposed: false,
                }),
                in_flight,
            }),
        })
    }

    pub fn entity_id(&self) -> u64 {
        self.inner.entity_id
    }

    /// Issue a refresh, superseding any pending one.
    ///
    /// Returns the new token, or `None` once the guard is disposed.
    pub fn request_refresh(
        &self,
        reason: impl Into<String>,
        draft: Option<DraftFields>,
    ) -> Option<RefreshToken> {
        self.inner.request_refresh(reason.into(), draft)
    }

    /// Like [`request_refresh`](Self::request_refresh), but collapses calls
    /// arriving within the debounce window into one carrying the last draft.
    pub fn request_refresh_debounced(
        &self,
        reason: impl Into<String>,
        draft: Option<DraftFields>,
    ) {
        let mut state = self.inner.lock();
        if state.disposed {
            return;
        }

        let reason = reason.into();
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        state.debounce.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                inner.request_refresh(reason, draft);
            }
        });
    }

    /// Cancel pending work and invalidate the current token. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Last accepted snapshot.
    pub fn snapshot(&self) -> Option<Arc<T>> {
        self.inner.lock().snapshot.clone()
    }

    /// When the most recent request went out, whether direct or debounced.
    pub fn last_issued(&self) -> Option<Instant> {
        self.inner.lock().last_issued
    }

    pub fn current_token(&self) -> Option<RefreshToken> {
        self.inner.lock().current
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().loading
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Resolves once no current request is in flight.
    ///
    /// Does not wait for an armed debounce timer.
    pub async fn settled(&self) {
        let mut rx = self.inner.in_flight.subscribe();
        // Err only if the sender is gone, which means the guard is gone too.
        let _ = rx.wait_for(Option::is_none).await;
    }
}

impl<T: EntitySnapshot> Drop for StaleResponseGuard<T> {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl<T: EntitySnapshot> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, GuardState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_refresh(
        self: &Arc<Self>,
        reason: String,
        draft: Option<DraftFields>,
    ) -> Option<RefreshToken> {
        let mut state = self.lock();
        if state.disposed {
            debug!(
                entity_id = self.entity_id,
                reason = %reason,
                "refresh ignored: guard disposed"
            );
            return None;
        }

        state.counter += 1;
        let token = RefreshToken(state.counter);
        state.current = Some(token);

        if let Some(previous) = state.pending.take() {
            debug!(
                entity_id = self.entity_id,
                superseded = %previous.token,
                token = %token,
                "superseding pending refresh"
            );
            if self.config.abort_superseded {
                previous.task.abort();
            }
        }

        debug!(entity_id = self.entity_id, token = %token, reason = %reason, "issuing refresh");

        let request = StatusRequest {
            entity_id: self.entity_id,
            token,
            reason,
            draft,
        };
        let inner = Arc::clone(self);
        let task = self.runtime.spawn(async move { inner.run(request).await });

        state.pending = Some(PendingRequest {
            token,
            task: task.abort_handle(),
        });
        state.last_issued = Some(Instant::now());
        state.loading = true;
        self.sink.on_loading(true);
        self.in_flight.send_replace(Some(token));

        Some(token)
    }

    async fn run(self: Arc<Self>, request: StatusRequest) {
        let outcome =
            match tokio::time::timeout(self.config.timeout, self.backend.fetch_status(&request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(RefreshError::Timeout {
                    after: self.config.timeout,
                }),
            };

        self.settle(&request, outcome);
    }

    fn settle(&self, request: &StatusRequest, outcome: RefreshResult<T>) {
        let mut state = self.lock();
        if state.current != Some(request.token) {
            debug!(
                entity_id = self.entity_id,
                token = %request.token,
                current = ?state.current.map(RefreshToken::get),
                ok = outcome.is_ok(),
                "dropping stale response"
            );
            return;
        }

        state.pending = None;
        state.loading = false;

        let outcome = outcome.and_then(|snapshot| {
            if snapshot.entity_id() == self.entity_id {
                Ok(snapshot)
            } else {
                Err(RefreshError::InvalidResponse {
                    message: format!(
                        "response is for post {}, expected {}",
                        snapshot.entity_id(),
                        self.entity_id
                    ),
                })
            }
        });

        match outcome {
            Ok(snapshot) => {
                debug!(
                    entity_id = self.entity_id,
                    token = %request.token,
                    reason = %request.reason,
                    "applying status"
                );
                let snapshot = Arc::new(snapshot);
                state.snapshot = Some(Arc::clone(&snapshot));
                self.sink.on_apply(&snapshot);
            }
            Err(error) => {
                warn!(
                    entity_id = self.entity_id,
                    token = %request.token,
                    reason = %request.reason,
                    error = %error,
                    "status refresh failed"
                );
                self.sink.on_error(&error);
            }
        }

        self.sink.on_loading(false);
        self.in_flight.send_replace(None);
    }

    fn dispose(&self) {
        let mut state = self.lock();
        if state.disposed {
            return;
        }

        state.disposed = true;
        state.current = None;
        if let Some(pending) = state.pending.take() {
            pending.task.abort();
        }
        state.debounce.cancel();
        state.loading = false;
        self.in_flight.send_replace(None);

        debug!(entity_id = self.entity_id, issued = state.counter, "refresh guard disposed");
    }
}
