//! Wire and in-memory types for the status protocol.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a logical refresh attempt.
///
/// Allocated by the guard, strictly increasing per guard instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefreshToken(pub u64);

impl RefreshToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unsaved field overrides sent for live preview before a save.
pub type DraftFields = serde_json::Map<String, serde_json::Value>;

/// What the guard asks the backend for.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRequest {
    /// Post id.
    pub entity_id: u64,

    /// Token the response will be matched against.
    pub token: RefreshToken,

    /// Cause tag, for observability only.
    pub reason: String,

    /// Draft overrides, if any.
    pub draft: Option<DraftFields>,
}

/// Outcome of a single health signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResult {
    pub pass: bool,

    #[serde(default)]
    pub note: String,
}

/// Search-result preview computed server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerpPreview {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub url: String,
}

/// A panel payload the guard can hold.
///
/// The guard rejects a payload whose entity id differs from its own.
pub trait EntitySnapshot: Send + Sync + 'static {
    fn entity_id(&self) -> u64;
}

/// The authoritative rendered state of the health panel.
///
/// Replaced as a whole when a response is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Post id.
    #[serde(alias = "post_id", alias = "entityId")]
    pub entity_id: u64,

    /// Score in 0..=100.
    #[serde(deserialize_with = "deserialize_score")]
    pub score: u8,

    /// Pass/fail per signal key.
    #[serde(default)]
    pub breakdown: BTreeMap<String, SignalResult>,

    /// When the backend last computed the score.
    #[serde(alias = "updatedAt", deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, alias = "serpPreview", skip_serializing_if = "Option::is_none")]
    pub serp_preview: Option<SerpPreview>,
}

impl StatusSnapshot {
    /// Number of passing signals.
    pub fn passed(&self) -> usize {
        self.breakdown.values().filter(|s| s.pass).count()
    }

    /// Number of failing signals.
    pub fn failed(&self) -> usize {
        self.breakdown.len() - self.passed()
    }
}

impl EntitySnapshot for StatusSnapshot {
    fn entity_id(&self) -> u64 {
        self.entity_id
    }
}

/// Content freshness verdict of the evergreen panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvergreenState {
    Evergreen,
    Watch,
    Stale,
}

/// Evergreen panel state for one post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvergreenSnapshot {
    #[serde(alias = "post_id", alias = "entityId")]
    pub entity_id: u64,

    pub status: EvergreenState,

    /// Why the post got its status, e.g. "traffic down 40% over 90 days".
    #[serde(default)]
    pub reasons: Vec<String>,

    #[serde(
        alias = "checkedAt",
        alias = "last_checked",
        deserialize_with = "deserialize_timestamp"
    )]
    pub checked_at: DateTime<Utc>,
}

impl EntitySnapshot for EvergreenSnapshot {
    fn entity_id(&self) -> u64 {
        self.entity_id
    }
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !(0.0..=100.0).contains(&raw) {
        return Err(serde::de::Error::custom(format!(
            "score {} outside 0..=100",
            raw
        )));
    }
    Ok(raw.round() as u8)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Unix(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Unix(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid unix timestamp {}", secs))),
        RawTimestamp::Text(text) => parse_timestamp(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("unrecognized timestamp '{}'", text))
        }),
    }
}

/// Parse RFC 3339, MySQL `YYYY-MM-DD HH:MM:SS` (UTC) or unix seconds.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}
