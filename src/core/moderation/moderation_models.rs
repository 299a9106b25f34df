// Moderation domain models - data structures for banned-word detection.
//
// These are pure domain types with no HTTP or database dependencies.
// The http layer converts requests into these, the infra layer persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How serious a banned term is, as configured by the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// A banned term as the scorer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannedTerm {
    pub word: String,
    pub severity: Severity,
}

impl BannedTerm {
    pub fn new(word: impl Into<String>, severity: Severity) -> Self {
        Self {
            word: word.into(),
            severity,
        }
    }
}

/// Outcome of scoring one piece of content against a term list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    /// True iff at least one term cleared the detection threshold
    pub is_restricted: bool,
    /// Original spellings of the flagged terms, in input order
    pub flagged_words: Vec<String>,
    /// Highest score among flagged terms, 0 when nothing was flagged
    pub confidence: f64,
    /// Highest severity among flagged terms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_severity: Option<Severity>,
}

impl ModerationResult {
    /// Create a "clean" result
    pub fn clean() -> Self {
        Self {
            is_restricted: false,
            flagged_words: Vec::new(),
            confidence: 0.0,
            max_severity: None,
        }
    }
}

/// A banned word row as stored per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannedWord {
    pub id: i64,
    pub tenant_id: String,
    pub word: String,
    pub severity: Severity,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl BannedWord {
    pub fn as_term(&self) -> BannedTerm {
        BannedTerm::new(self.word.clone(), self.severity)
    }
}

/// Kind of user-submitted content that can be moderated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(ContentKind::Post),
            "comment" => Ok(ContentKind::Comment),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// Identifies a content row owned by the external data store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub tenant_id: String,
    pub kind: ContentKind,
    pub content_id: String,
}

impl ContentRef {
    pub fn new(tenant_id: impl Into<String>, kind: ContentKind, content_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            kind,
            content_id: content_id.into(),
        }
    }
}

/// Restriction state recorded for a piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFlag {
    pub content: ContentRef,
    pub is_restricted: bool,
    pub reason: Option<String>,
    pub flagged_at: DateTime<Utc>,
}

/// Review state of a moderation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Waiting for a human moderator
    Pending,
    /// Moderator agreed with the automatic restriction
    Confirmed,
    /// Moderator overturned the restriction
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Confirmed => "confirmed",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "confirmed" => Ok(ReportStatus::Confirmed),
            "dismissed" => Ok(ReportStatus::Dismissed),
            other => Err(format!("unknown report status '{}'", other)),
        }
    }
}

/// Audit record written whenever content gets auto-restricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationReport {
    pub id: i64,
    pub content: ContentRef,
    pub original_content: String,
    pub flagged_words: Vec<String>,
    pub confidence: f64,
    pub max_severity: Option<Severity>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Report data before the store assigns an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewModerationReport {
    pub content: ContentRef,
    pub original_content: String,
    pub flagged_words: Vec<String>,
    pub confidence: f64,
    pub max_severity: Option<Severity>,
    pub created_at: DateTime<Utc>,
}

/// What `moderate_content` hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationOutcome {
    pub result: ModerationResult,
    /// Set when the content was restricted and an audit record was written
    pub report_id: Option<i64>,
}
