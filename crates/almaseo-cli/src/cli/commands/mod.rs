pub mod health;
pub mod watch;

use std::sync::{Arc, Mutex};

use almaseo_refresh::{
    GuardConfig, HttpStatusBackend, PanelView, RefreshConfig, RefreshError, SharedPanel,
    StaleResponseGuard, StatusSink, StatusSnapshot,
};

use crate::cli::args::{Cli, Command, SiteArgs};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Health(args) => health::run(&cli.site, args).await,
        Command::Watch(args) => watch::run(&cli.site, args).await,
    }
}

/// Environment first, then explicit flags on top.
pub(crate) fn resolve_config(site: &SiteArgs) -> RefreshConfig {
    let mut config = RefreshConfig::from_env();
    if let Some(url) = &site.site_url {
        config = config.with_site_url(url.clone());
    }
    if let Some(token) = &site.token {
        config = config.with_token(token.clone());
    }
    if let Some(nonce) = &site.nonce {
        config = config.with_nonce(nonce.clone());
    }
    if let Some(transport) = site.transport {
        config = config.with_transport(transport);
    }
    if let Some(secs) = site.timeout {
        config = config.with_timeout_secs(secs);
    }
    config
}

/// Panel sink that also remembers how the last settle went.
#[derive(Debug, Clone)]
pub(crate) struct PanelSink {
    pub panel: SharedPanel,
    last_error: Arc<Mutex<Option<RefreshError>>>,
}

impl PanelSink {
    pub fn new(panel: SharedPanel) -> Self {
        Self {
            panel,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn last_error(&self) -> Option<RefreshError> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl StatusSink for PanelSink {
    fn on_apply(&self, snapshot: &StatusSnapshot) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.panel.on_apply(snapshot);
    }

    fn on_error(&self, error: &RefreshError) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error.clone());
        self.panel.on_error(error);
    }

    fn on_loading(&self, loading: bool) {
        self.panel.on_loading(loading);
    }
}

/// Wire config, backend, panel and guard together for one post.
///
/// Config problems come back as `RefreshError::Config` so callers can
/// report them with the usual exit code.
pub(crate) fn build_guard(
    site: &SiteArgs,
    post_id: u64,
) -> Result<(StaleResponseGuard, PanelSink), RefreshError> {
    let config = resolve_config(site);
    let backend = Arc::new(HttpStatusBackend::new(config.clone())?);
    let sink = PanelSink::new(SharedPanel::new(PanelView::new(
        config.tiers,
        config.error_ttl(),
    )));
    let guard = StaleResponseGuard::new(
        post_id,
        backend,
        Arc::new(sink.clone()),
        GuardConfig::from(&config),
    )?;
    Ok((guard, sink))
}
