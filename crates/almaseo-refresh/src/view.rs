//! Panel view model: the single write point for visible health state.
//!
//! `PanelView` stands in for the editor DOM. Signal rows are keyed by signal
//! key and updated in place, and totals are always recomputed from the rows,
//! so re-applying a snapshot never duplicates anything.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::RefreshError;
use crate::guard::StatusSink;
use crate::tier::{ScoreTier, TierThresholds};
use crate::types::{SerpPreview, StatusSnapshot};

/// One row of the pass/fail list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRow {
    pub pass: bool,
    pub note: String,
}

/// Transient inline error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub shown_at: Instant,
    pub ttl: Duration,
}

impl Banner {
    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < self.ttl
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    thresholds: TierThresholds,
    banner_ttl: Duration,
    score: Option<u8>,
    tier: Option<ScoreTier>,
    signals: BTreeMap<String, SignalRow>,
    passed: usize,
    failed: usize,
    updated_at: Option<DateTime<Utc>>,
    serp_preview: Option<SerpPreview>,
    loading: bool,
    banner: Option<Banner>,
}

impl PanelView {
    pub fn new(thresholds: TierThresholds, banner_ttl: Duration) -> Self {
        Self {
            thresholds,
            banner_ttl,
            score: None,
            tier: None,
            signals: BTreeMap::new(),
            passed: 0,
            failed: 0,
            updated_at: None,
            serp_preview: None,
            loading: false,
            banner: None,
        }
    }

    /// Render an accepted snapshot.
    pub fn apply(&mut self, snapshot: &StatusSnapshot) {
        self.score = Some(snapshot.score);
        self.tier = Some(self.thresholds.classify(snapshot.score));

        self.signals.retain(|key, _| snapshot.breakdown.contains_key(key));
        for (key, result) in &snapshot.breakdown {
            match self.signals.get_mut(key) {
                Some(row) => {
                    row.pass = result.pass;
                    row.note.clone_from(&result.note);
                }
                None => {
                    self.signals.insert(
                        key.clone(),
                        SignalRow {
                            pass: result.pass,
                            note: result.note.clone(),
                        },
                    );
                }
            }
        }
        self.passed = self.signals.values().filter(|row| row.pass).count();
        self.failed = self.signals.len() - self.passed;

        self.updated_at = Some(snapshot.updated_at);
        self.serp_preview = snapshot.serp_preview.clone();
    }

    pub fn show_error(&mut self, message: impl Into<String>, now: Instant) {
        self.banner = Some(Banner {
            message: message.into(),
            shown_at: now,
            ttl: self.banner_ttl,
        });
    }

    /// Banner message, if still visible at `now`.
    pub fn banner(&self, now: Instant) -> Option<&str> {
        self.banner
            .as_ref()
            .filter(|b| b.is_visible(now))
            .map(|b| b.message.as_str())
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    pub fn tier(&self) -> Option<ScoreTier> {
        self.tier
    }

    /// Fraction of the score gauge to fill, `0.0..=1.0`.
    pub fn gauge_fill(&self) -> f32 {
        self.score.map(|s| f32::from(s) / 100.0).unwrap_or(0.0)
    }

    pub fn signals(&self) -> &BTreeMap<String, SignalRow> {
        &self.signals
    }

    pub fn totals(&self) -> (usize, usize) {
        (self.passed, self.failed)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn serp_preview(&self) -> Option<&SerpPreview> {
        self.serp_preview.as_ref()
    }

    /// Plain-text rendering of the panel.
    pub fn render(&self, now: Instant) -> String {
        let mut out = String::new();

        match (self.score, self.tier) {
            (Some(score), Some(tier)) => {
                let filled = (self.gauge_fill() * 20.0).round() as usize;
                let _ = writeln!(
                    out,
                    "Health score: {}/100 [{}] {}{}",
                    score,
                    tier.label(),
                    "#".repeat(filled),
                    ".".repeat(20 - filled)
                );
            }
            _ => out.push_str("Health score: --\n"),
        }
        if self.loading {
            out.push_str("(refreshing...)\n");
        }
        if let Some(message) = self.banner(now) {
            let _ = writeln!(out, "! {}", message);
        }
        if !self.signals.is_empty() {
            let _ = writeln!(out, "Signals: {} passed, {} failed", self.passed, self.failed);
            for (key, row) in &self.signals {
                let mark = if row.pass { "pass" } else { "FAIL" };
                if row.note.is_empty() {
                    let _ = writeln!(out, "  [{}] {}", mark, key);
                } else {
                    let _ = writeln!(out, "  [{}] {}: {}", mark, key, row.note);
                }
            }
        }
        if let Some(serp) = &self.serp_preview {
            let _ = writeln!(
                out,
                "SERP: {}\n      {}\n      {}",
                serp.title, serp.url, serp.description
            );
        }
        if let Some(updated_at) = self.updated_at {
            let _ = writeln!(out, "Updated: {}", updated_at.to_rfc3339());
        }
        out
    }
}

/// Shared handle to a [`PanelView`], usable as the guard's sink.
#[derive(Debug, Clone)]
pub struct SharedPanel(Arc<Mutex<PanelView>>);

impl SharedPanel {
    pub fn new(view: PanelView) -> Self {
        Self(Arc::new(Mutex::new(view)))
    }

    pub fn lock(&self) -> MutexGuard<'_, PanelView> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StatusSink for SharedPanel {
    fn on_apply(&self, snapshot: &StatusSnapshot) {
        self.lock().apply(snapshot);
    }

    fn on_error(&self, error: &RefreshError) {
        self.lock().show_error(error.to_string(), Instant::now());
    }

    fn on_loading(&self, loading: bool) {
        self.lock().set_loading(loading);
    }
}
