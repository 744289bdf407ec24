//! Scripted backend and recording sink for unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::backend::StatusBackend;
use crate::error::{RefreshError, RefreshResult};
use crate::guard::StatusSink;
use crate::types::{DraftFields, SignalResult, StatusRequest, StatusSnapshot};

/// One backend call waiting for the test to answer it.
pub struct Call {
    pub request: StatusRequest,
    reply: oneshot::Sender<RefreshResult<StatusSnapshot>>,
}

impl Call {
    /// Resolve the call. Ignored if its task was already aborted.
    pub fn reply(self, outcome: RefreshResult<StatusSnapshot>) {
        let _ = self.reply.send(outcome);
    }

    /// Whether the calling task is gone.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}

/// Backend whose calls are answered by the test, in any order.
pub struct ScriptedBackend {
    calls: mpsc::UnboundedSender<Call>,
}

impl ScriptedBackend {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { calls: tx }), rx)
    }
}

#[async_trait]
impl StatusBackend for ScriptedBackend {
    async fn fetch_status(&self, request: &StatusRequest) -> RefreshResult<StatusSnapshot> {
        let (reply, answer) = oneshot::channel();
        self.calls
            .send(Call {
                request: request.clone(),
                reply,
            })
            .map_err(|_| RefreshError::Network {
                message: "test harness gone".into(),
            })?;
        answer.await.unwrap_or_else(|_| {
            Err(RefreshError::Network {
                message: "call dropped by test".into(),
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Apply(u8),
    Error(String),
    Loading(bool),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Apply(score) => Some(score),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn on_apply(&self, snapshot: &StatusSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Apply(snapshot.score));
    }

    fn on_error(&self, error: &RefreshError) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Error(error.to_string()));
    }

    fn on_loading(&self, loading: bool) {
        self.events.lock().unwrap().push(SinkEvent::Loading(loading));
    }
}

pub fn snapshot(entity_id: u64, score: u8) -> StatusSnapshot {
    let mut breakdown = BTreeMap::new();
    breakdown.insert(
        "title_length".to_string(),
        SignalResult {
            pass: score >= 50,
            note: format!("score {}", score),
        },
    );
    breakdown.insert(
        "internal_links".to_string(),
        SignalResult {
            pass: true,
            note: String::new(),
        },
    );
    StatusSnapshot {
        entity_id,
        score,
        breakdown,
        updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        serp_preview: None,
    }
}

pub fn draft(field: &str, value: &str) -> DraftFields {
    let mut fields = DraftFields::new();
    fields.insert(field.to_string(), serde_json::Value::from(value));
    fields
}

/// Let spawned tasks run until they park.
pub async fn drain() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
