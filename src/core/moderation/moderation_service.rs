// Moderation service - orchestrates a moderation request against a store.
//
// This service handles:
// - Loading a tenant's active banned words and scoring content
// - Restricting flagged content and writing an audit report
// - Managing banned words per tenant
// - Human review of reports (confirm or dismiss)
//
// NO HTTP or database dependencies here - just domain logic over a store port.

use super::aggregator::evaluate;
use super::moderation_models::{
    BannedWord, ContentFlag, ContentRef, ModerationOutcome, ModerationReport, ModerationResult,
    NewModerationReport, ReportStatus, Severity,
};
use super::normalizer::normalize;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Trait for persisting banned words, content flags and moderation reports.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Active banned words for a tenant, oldest first.
    async fn list_active_banned_words(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<BannedWord>, ModerationError>;

    /// All banned words for a tenant (active or not), oldest first.
    async fn list_banned_words(&self, tenant_id: &str) -> Result<Vec<BannedWord>, ModerationError>;

    /// Insert a new active banned word and return the stored row.
    async fn add_banned_word(
        &self,
        tenant_id: &str,
        word: &str,
        severity: Severity,
        created_at: DateTime<Utc>,
    ) -> Result<BannedWord, ModerationError>;

    /// Toggle a banned word. Returns `None` when the word does not exist for the tenant.
    async fn set_banned_word_active(
        &self,
        tenant_id: &str,
        id: i64,
        active: bool,
    ) -> Result<Option<BannedWord>, ModerationError>;

    async fn get_content_flag(
        &self,
        content: &ContentRef,
    ) -> Result<Option<ContentFlag>, ModerationError>;

    /// Restrict content and write its pending report as one atomic change.
    ///
    /// Either both the restriction and the report are stored or neither is.
    /// Returns the new report id.
    async fn restrict_and_report(
        &self,
        reason: &str,
        report: NewModerationReport,
    ) -> Result<i64, ModerationError>;

    async fn get_report(&self, report_id: i64) -> Result<Option<ModerationReport>, ModerationError>;

    /// Reports for a tenant, newest first, optionally filtered by status.
    async fn list_reports(
        &self,
        tenant_id: &str,
        status: Option<ReportStatus>,
    ) -> Result<Vec<ModerationReport>, ModerationError>;

    /// Move a pending report to `decision`. Dismissing also lifts the
    /// restriction on `content` in the same change.
    ///
    /// Returns `false` without writing anything when the report is no longer
    /// pending (or does not exist).
    async fn resolve_report(
        &self,
        report_id: i64,
        content: &ContentRef,
        decision: ReportStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Moderation service for scoring content and handling the review workflow.
pub struct ModerationService<S: ModerationStore> {
    store: S,
}

impl<S: ModerationStore> ModerationService<S> {
    /// Create a new moderation service with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reason string attached to auto-restricted content.
    fn restriction_reason(flagged_words: &[String]) -> String {
        format!(
            "Automatically restricted: contains banned words ({})",
            flagged_words.join(", ")
        )
    }

    fn require_id(value: &str, field: &str) -> Result<(), ModerationError> {
        if value.trim().is_empty() {
            return Err(ModerationError::InvalidInput(format!(
                "{} must not be empty",
                field
            )));
        }
        Ok(())
    }

    /// Moderate a piece of content for its tenant.
    ///
    /// When the content is flagged, the content is marked restricted and a
    /// pending report is written for human review.
    pub async fn moderate_content(
        &self,
        content: ContentRef,
        text: &str,
    ) -> Result<ModerationOutcome, ModerationError> {
        Self::require_id(&content.tenant_id, "tenant id")?;
        Self::require_id(&content.content_id, "content id")?;

        let terms: Vec<_> = self
            .store
            .list_active_banned_words(&content.tenant_id)
            .await?
            .iter()
            .map(BannedWord::as_term)
            .collect();

        // Nothing to check against - skip scoring entirely
        if terms.is_empty() {
            return Ok(ModerationOutcome {
                result: ModerationResult::clean(),
                report_id: None,
            });
        }

        let result = evaluate(text, &terms);
        if !result.is_restricted {
            return Ok(ModerationOutcome {
                result,
                report_id: None,
            });
        }

        let reason = Self::restriction_reason(&result.flagged_words);
        let report_id = self
            .store
            .restrict_and_report(
                &reason,
                NewModerationReport {
                    content: content.clone(),
                    original_content: text.to_string(),
                    flagged_words: result.flagged_words.clone(),
                    confidence: result.confidence,
                    max_severity: result.max_severity,
                    created_at: Utc::now(),
                },
            )
            .await?;

        tracing::info!(
            tenant_id = %content.tenant_id,
            content_kind = %content.kind,
            content_id = %content.content_id,
            confidence = result.confidence,
            report_id,
            "Content automatically restricted"
        );

        Ok(ModerationOutcome {
            result,
            report_id: Some(report_id),
        })
    }

    /// Add a banned word for a tenant.
    pub async fn add_banned_word(
        &self,
        tenant_id: &str,
        word: &str,
        severity: Severity,
    ) -> Result<BannedWord, ModerationError> {
        Self::require_id(tenant_id, "tenant id")?;

        let word = word.trim();
        let normalized = normalize(word);
        if normalized.is_empty() {
            return Err(ModerationError::InvalidInput(
                "banned word must contain at least one letter or digit".to_string(),
            ));
        }

        let existing = self.store.list_banned_words(tenant_id).await?;
        if existing.iter().any(|w| normalize(&w.word) == normalized) {
            return Err(ModerationError::AlreadyExists(format!(
                "banned word '{}'",
                word
            )));
        }

        let stored = self
            .store
            .add_banned_word(tenant_id, word, severity, Utc::now())
            .await?;
        tracing::info!(tenant_id, word_id = stored.id, %severity, "Banned word added");
        Ok(stored)
    }

    /// List every banned word for a tenant.
    pub async fn list_banned_words(&self, tenant_id: &str) -> Result<Vec<BannedWord>, ModerationError> {
        self.store.list_banned_words(tenant_id).await
    }

    /// Activate or deactivate a banned word.
    pub async fn set_banned_word_active(
        &self,
        tenant_id: &str,
        id: i64,
        active: bool,
    ) -> Result<BannedWord, ModerationError> {
        self.store
            .set_banned_word_active(tenant_id, id, active)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("banned word {}", id)))
    }

    /// List reports for a tenant, newest first.
    pub async fn list_reports(
        &self,
        tenant_id: &str,
        status: Option<ReportStatus>,
    ) -> Result<Vec<ModerationReport>, ModerationError> {
        self.store.list_reports(tenant_id, status).await
    }

    /// Record a moderator's decision on a pending report.
    ///
    /// Dismissing a report lifts the restriction on its content.
    pub async fn review_report(
        &self,
        report_id: i64,
        decision: ReportStatus,
    ) -> Result<ModerationReport, ModerationError> {
        if decision == ReportStatus::Pending {
            return Err(ModerationError::InvalidInput(
                "decision must be 'confirmed' or 'dismissed'".to_string(),
            ));
        }

        let report = self
            .store
            .get_report(report_id)
            .await?
            .ok_or_else(|| ModerationError::NotFound(format!("report {}", report_id)))?;

        if report.status != ReportStatus::Pending {
            return Err(ModerationError::InvalidInput(format!(
                "report {} was already {}",
                report_id, report.status
            )));
        }

        let now = Utc::now();
        let resolved = self
            .store
            .resolve_report(report_id, &report.content, decision, now)
            .await?;

        // Another reviewer got there first
        if !resolved {
            return Err(ModerationError::InvalidInput(format!(
                "report {} was already reviewed",
                report_id
            )));
        }

        tracing::info!(report_id, %decision, "Moderation report reviewed");

        Ok(ModerationReport {
            status: decision,
            reviewed_at: Some(now),
            ..report
        })
    }

    /// Current restriction state of a piece of content.
    pub async fn content_flag(
        &self,
        content: &ContentRef,
    ) -> Result<Option<ContentFlag>, ModerationError> {
        self.store.get_content_flag(content).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::ContentKind;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

    /// In-memory store for testing
    struct MockModerationStore {
        words: DashMap<i64, BannedWord>,
        flags: DashMap<ContentRef, ContentFlag>,
        reports: DashMap<i64, ModerationReport>,
        next_id: AtomicI64,
        term_lookups: AtomicUsize,
        fail_report_writes: AtomicBool,
    }

    impl MockModerationStore {
        fn new() -> Self {
            Self {
                words: DashMap::new(),
                flags: DashMap::new(),
                reports: DashMap::new(),
                next_id: AtomicI64::new(1),
                term_lookups: AtomicUsize::new(0),
                fail_report_writes: AtomicBool::new(false),
            }
        }

        fn sorted_words(&self, tenant_id: &str) -> Vec<BannedWord> {
            let mut words: Vec<_> = self
                .words
                .iter()
                .filter(|w| w.tenant_id == tenant_id)
                .map(|w| w.clone())
                .collect();
            words.sort_by_key(|w| w.id);
            words
        }
    }

    #[async_trait]
    impl ModerationStore for MockModerationStore {
        async fn list_active_banned_words(
            &self,
            tenant_id: &str,
        ) -> Result<Vec<BannedWord>, ModerationError> {
            self.term_lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .sorted_words(tenant_id)
                .into_iter()
                .filter(|w| w.active)
                .collect())
        }

        async fn list_banned_words(
            &self,
            tenant_id: &str,
        ) -> Result<Vec<BannedWord>, ModerationError> {
            Ok(self.sorted_words(tenant_id))
        }

        async fn add_banned_word(
            &self,
            tenant_id: &str,
            word: &str,
            severity: Severity,
            created_at: DateTime<Utc>,
        ) -> Result<BannedWord, ModerationError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let stored = BannedWord {
                id,
                tenant_id: tenant_id.to_string(),
                word: word.to_string(),
                severity,
                active: true,
                created_at,
            };
            self.words.insert(id, stored.clone());
            Ok(stored)
        }

        async fn set_banned_word_active(
            &self,
            tenant_id: &str,
            id: i64,
            active: bool,
        ) -> Result<Option<BannedWord>, ModerationError> {
            Ok(self
                .words
                .get_mut(&id)
                .filter(|w| w.tenant_id == tenant_id)
                .map(|mut w| {
                    w.active = active;
                    w.clone()
                }))
        }

        async fn get_content_flag(
            &self,
            content: &ContentRef,
        ) -> Result<Option<ContentFlag>, ModerationError> {
            Ok(self.flags.get(content).map(|f| f.clone()))
        }

        async fn restrict_and_report(
            &self,
            reason: &str,
            report: NewModerationReport,
        ) -> Result<i64, ModerationError> {
            if self.fail_report_writes.load(Ordering::SeqCst) {
                return Err(ModerationError::StorageError("disk full".to_string()));
            }

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.flags.insert(
                report.content.clone(),
                ContentFlag {
                    content: report.content.clone(),
                    is_restricted: true,
                    reason: Some(reason.to_string()),
                    flagged_at: report.created_at,
                },
            );
            self.reports.insert(
                id,
                ModerationReport {
                    id,
                    content: report.content,
                    original_content: report.original_content,
                    flagged_words: report.flagged_words,
                    confidence: report.confidence,
                    max_severity: report.max_severity,
                    status: ReportStatus::Pending,
                    created_at: report.created_at,
                    reviewed_at: None,
                },
            );
            Ok(id)
        }

        async fn get_report(
            &self,
            report_id: i64,
        ) -> Result<Option<ModerationReport>, ModerationError> {
            Ok(self.reports.get(&report_id).map(|r| r.clone()))
        }

        async fn list_reports(
            &self,
            tenant_id: &str,
            status: Option<ReportStatus>,
        ) -> Result<Vec<ModerationReport>, ModerationError> {
            let mut reports: Vec<_> = self
                .reports
                .iter()
                .filter(|r| r.content.tenant_id == tenant_id)
                .filter(|r| status.map_or(true, |s| r.status == s))
                .map(|r| r.clone())
                .collect();
            reports.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(reports)
        }

        async fn resolve_report(
            &self,
            report_id: i64,
            content: &ContentRef,
            decision: ReportStatus,
            reviewed_at: DateTime<Utc>,
        ) -> Result<bool, ModerationError> {
            let Some(mut report) = self.reports.get_mut(&report_id) else {
                return Ok(false);
            };
            if report.status != ReportStatus::Pending {
                return Ok(false);
            }
            report.status = decision;
            report.reviewed_at = Some(reviewed_at);

            if decision == ReportStatus::Dismissed {
                if let Some(mut flag) = self.flags.get_mut(content) {
                    flag.is_restricted = false;
                }
            }
            Ok(true)
        }
    }

    fn post(id: &str) -> ContentRef {
        ContentRef::new("tenant-a", ContentKind::Post, id)
    }

    #[tokio::test]
    async fn test_clean_content_is_not_restricted() {
        let service = ModerationService::new(MockModerationStore::new());
        service
            .add_banned_word("tenant-a", "proibida", Severity::High)
            .await
            .unwrap();

        let outcome = service
            .moderate_content(post("p1"), "Bom dia a todos")
            .await
            .unwrap();

        assert!(!outcome.result.is_restricted);
        assert_eq!(outcome.report_id, None);
        assert!(service.content_flag(&post("p1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flagged_content_is_restricted_and_reported() {
        let service = ModerationService::new(MockModerationStore::new());
        service
            .add_banned_word("tenant-a", "proibida", Severity::High)
            .await
            .unwrap();

        let text = "Essa palavra é proibida no fórum";
        let outcome = service.moderate_content(post("p1"), text).await.unwrap();

        assert!(outcome.result.is_restricted);
        assert_eq!(outcome.result.flagged_words, vec!["proibida"]);
        assert_eq!(outcome.result.confidence, 100.0);

        let flag = service.content_flag(&post("p1")).await.unwrap().unwrap();
        assert!(flag.is_restricted);
        assert_eq!(
            flag.reason.as_deref(),
            Some("Automatically restricted: contains banned words (proibida)")
        );

        let reports = service.list_reports("tenant-a", None).await.unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(Some(report.id), outcome.report_id);
        assert_eq!(report.original_content, text);
        assert_eq!(report.flagged_words, vec!["proibida"]);
        assert_eq!(report.max_severity, Some(Severity::High));
        assert_eq!(report.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_no_banned_words_skips_scoring() {
        let service = ModerationService::new(MockModerationStore::new());

        let outcome = service
            .moderate_content(post("p1"), "spam spam spam")
            .await
            .unwrap();

        assert_eq!(outcome.result, ModerationResult::clean());
        assert!(service.list_reports("tenant-a", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_and_foreign_words_are_ignored() {
        let service = ModerationService::new(MockModerationStore::new());
        let spam = service
            .add_banned_word("tenant-a", "spam", Severity::Low)
            .await
            .unwrap();
        service
            .add_banned_word("tenant-b", "golpe", Severity::Low)
            .await
            .unwrap();
        service
            .set_banned_word_active("tenant-a", spam.id, false)
            .await
            .unwrap();

        let outcome = service
            .moderate_content(post("p1"), "spam e golpe")
            .await
            .unwrap();

        assert!(!outcome.result.is_restricted);
    }

    #[tokio::test]
    async fn test_blank_ids_are_rejected() {
        let service = ModerationService::new(MockModerationStore::new());

        let err = service
            .moderate_content(ContentRef::new(" ", ContentKind::Comment, "c1"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidInput(_)));

        let err = service
            .moderate_content(ContentRef::new("tenant-a", ContentKind::Comment, ""), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidInput(_)));
        assert_eq!(service.store.term_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_banned_word_validation() {
        let service = ModerationService::new(MockModerationStore::new());

        let err = service
            .add_banned_word("tenant-a", "  !!! ", Severity::Low)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidInput(_)));

        let stored = service
            .add_banned_word("tenant-a", "  Golpe ", Severity::Medium)
            .await
            .unwrap();
        assert_eq!(stored.word, "Golpe");
        assert!(stored.active);

        // Duplicate after normalization
        let err = service
            .add_banned_word("tenant-a", "GÓLPE", Severity::High)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::AlreadyExists(_)));

        // Same word in another tenant is fine
        service
            .add_banned_word("tenant-b", "golpe", Severity::High)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_active_on_missing_word_is_not_found() {
        let service = ModerationService::new(MockModerationStore::new());
        let err = service
            .set_banned_word_active("tenant-a", 42, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dismissing_a_report_lifts_the_restriction() {
        let service = ModerationService::new(MockModerationStore::new());
        service
            .add_banned_word("tenant-a", "spam", Severity::Low)
            .await
            .unwrap();
        let outcome = service
            .moderate_content(post("p9"), "s p a m")
            .await
            .unwrap();
        let report_id = outcome.report_id.unwrap();

        let reviewed = service
            .review_report(report_id, ReportStatus::Dismissed)
            .await
            .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Dismissed);
        assert!(reviewed.reviewed_at.is_some());

        let flag = service.content_flag(&post("p9")).await.unwrap().unwrap();
        assert!(!flag.is_restricted);

        // A second decision is rejected
        let err = service
            .review_report(report_id, ReportStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_confirming_keeps_the_restriction() {
        let service = ModerationService::new(MockModerationStore::new());
        service
            .add_banned_word("tenant-a", "spam", Severity::Low)
            .await
            .unwrap();
        let outcome = service.moderate_content(post("p2"), "spam").await.unwrap();

        service
            .review_report(outcome.report_id.unwrap(), ReportStatus::Confirmed)
            .await
            .unwrap();

        let flag = service.content_flag(&post("p2")).await.unwrap().unwrap();
        assert!(flag.is_restricted);
        let pending = service
            .list_reports("tenant-a", Some(ReportStatus::Pending))
            .await
            .unwrap();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_review_rejects_pending_decision_and_missing_report() {
        let service = ModerationService::new(MockModerationStore::new());

        let err = service
            .review_report(1, ReportStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::InvalidInput(_)));

        let err = service
            .review_report(1, ReportStatus::Dismissed)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_report_write_leaves_content_unrestricted() {
        let service = ModerationService::new(MockModerationStore::new());
        service
            .add_banned_word("tenant-a", "golpe", Severity::High)
            .await
            .unwrap();
        service.store.fail_report_writes.store(true, Ordering::SeqCst);

        let err = service
            .moderate_content(post("p3"), "isso e golpe")
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::StorageError(_)));

        assert!(service.content_flag(&post("p3")).await.unwrap().is_none());
        assert!(service.list_reports("tenant-a", None).await.unwrap().is_empty());
    }
}
