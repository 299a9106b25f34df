// SQLite-backed moderation store.
//
// Tables:
// - banned_words: Per-tenant banned words with severity and active flag
// - content_flags: Restriction state for posts and comments
// - moderation_reports: Audit records for human review

use crate::core::moderation::{
    BannedWord, ContentFlag, ContentKind, ContentRef, ModerationError, ModerationReport,
    ModerationStore, NewModerationReport, ReportStatus, Severity,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteModerationStore {
    pool: Pool<Sqlite>,
}

fn db_err(e: sqlx::Error) -> ModerationError {
    ModerationError::StorageError(e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ModerationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ModerationError::StorageError(format!("bad timestamp '{}': {}", value, e)))
}

fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T, ModerationError> {
    value.parse().map_err(ModerationError::StorageError)
}

fn banned_word_from_row(row: &SqliteRow) -> Result<BannedWord, ModerationError> {
    Ok(BannedWord {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        word: row.get("word"),
        severity: parse_column(&row.get::<String, _>("severity"))?,
        active: row.get("active"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

fn content_ref_from_row(row: &SqliteRow) -> Result<ContentRef, ModerationError> {
    Ok(ContentRef {
        tenant_id: row.get("tenant_id"),
        kind: parse_column::<ContentKind>(&row.get::<String, _>("content_kind"))?,
        content_id: row.get("content_id"),
    })
}

fn report_from_row(row: &SqliteRow) -> Result<ModerationReport, ModerationError> {
    let flagged_json: String = row.get("flagged_words");
    let flagged_words: Vec<String> = serde_json::from_str(&flagged_json)
        .map_err(|e| ModerationError::StorageError(format!("bad flagged_words: {}", e)))?;

    Ok(ModerationReport {
        id: row.get("id"),
        content: content_ref_from_row(row)?,
        original_content: row.get("original_content"),
        flagged_words,
        confidence: row.get("confidence"),
        max_severity: row
            .get::<Option<String>, _>("max_severity")
            .map(|s| parse_column::<Severity>(&s))
            .transpose()?,
        status: parse_column(&row.get::<String, _>("status"))?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        reviewed_at: row
            .get::<Option<String>, _>("reviewed_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
    })
}

impl SqliteModerationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS banned_words (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                word TEXT NOT NULL,
                severity TEXT NOT NULL DEFAULT 'medium',
                active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_banned_words_tenant
                ON banned_words(tenant_id, active);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_flags (
                tenant_id TEXT NOT NULL,
                content_kind TEXT NOT NULL,
                content_id TEXT NOT NULL,
                is_restricted BOOLEAN NOT NULL DEFAULT 0,
                reason TEXT,
                flagged_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, content_kind, content_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS moderation_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                content_kind TEXT NOT NULL,
                content_id TEXT NOT NULL,
                original_content TEXT NOT NULL,
                flagged_words TEXT NOT NULL,
                confidence REAL NOT NULL,
                max_severity TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                reviewed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_moderation_reports_tenant
                ON moderation_reports(tenant_id, status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_banned_word(
        &self,
        tenant_id: &str,
        id: i64,
    ) -> Result<Option<BannedWord>, ModerationError> {
        let row = sqlx::query("SELECT * FROM banned_words WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(banned_word_from_row).transpose()
    }
}

#[async_trait]
impl ModerationStore for SqliteModerationStore {
    async fn list_active_banned_words(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<BannedWord>, ModerationError> {
        let rows = sqlx::query(
            "SELECT * FROM banned_words WHERE tenant_id = ? AND active = 1 ORDER BY id ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(banned_word_from_row).collect()
    }

    async fn list_banned_words(&self, tenant_id: &str) -> Result<Vec<BannedWord>, ModerationError> {
        let rows = sqlx::query("SELECT * FROM banned_words WHERE tenant_id = ? ORDER BY id ASC")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(banned_word_from_row).collect()
    }

    async fn add_banned_word(
        &self,
        tenant_id: &str,
        word: &str,
        severity: Severity,
        created_at: DateTime<Utc>,
    ) -> Result<BannedWord, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO banned_words (tenant_id, word, severity, active, created_at)
            VALUES (?, ?, ?, 1, ?)
            "#,
        )
        .bind(tenant_id)
        .bind(word)
        .bind(severity.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(BannedWord {
            id: result.last_insert_rowid(),
            tenant_id: tenant_id.to_string(),
            word: word.to_string(),
            severity,
            active: true,
            created_at,
        })
    }

    async fn set_banned_word_active(
        &self,
        tenant_id: &str,
        id: i64,
        active: bool,
    ) -> Result<Option<BannedWord>, ModerationError> {
        let result = sqlx::query("UPDATE banned_words SET active = ? WHERE id = ? AND tenant_id = ?")
            .bind(active)
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_banned_word(tenant_id, id).await
    }

    async fn get_content_flag(
        &self,
        content: &ContentRef,
    ) -> Result<Option<ContentFlag>, ModerationError> {
        let row = sqlx::query(
            r#"
            SELECT is_restricted, reason, flagged_at FROM content_flags
            WHERE tenant_id = ? AND content_kind = ? AND content_id = ?
            "#,
        )
        .bind(&content.tenant_id)
        .bind(content.kind.as_str())
        .bind(&content.content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Ok(Some(ContentFlag {
                content: content.clone(),
                is_restricted: row.get("is_restricted"),
                reason: row.get("reason"),
                flagged_at: parse_timestamp(&row.get::<String, _>("flagged_at"))?,
            })),
            None => Ok(None),
        }
    }

    async fn restrict_and_report(
        &self,
        reason: &str,
        report: NewModerationReport,
    ) -> Result<i64, ModerationError> {
        let flagged_json = serde_json::to_string(&report.flagged_words)
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        let created_at = report.created_at.to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r#"
            INSERT INTO content_flags (tenant_id, content_kind, content_id, is_restricted, reason, flagged_at)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT(tenant_id, content_kind, content_id) DO UPDATE SET
                is_restricted = 1,
                reason = excluded.reason,
                flagged_at = excluded.flagged_at
            "#,
        )
        .bind(&report.content.tenant_id)
        .bind(report.content.kind.as_str())
        .bind(&report.content.content_id)
        .bind(reason)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let result = sqlx::query(
            r#"
            INSERT INTO moderation_reports (
                tenant_id, content_kind, content_id, original_content,
                flagged_words, confidence, max_severity, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(&report.content.tenant_id)
        .bind(report.content.kind.as_str())
        .bind(&report.content.content_id)
        .bind(&report.original_content)
        .bind(flagged_json)
        .bind(report.confidence)
        .bind(report.max_severity.map(|s| s.as_str()))
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(result.last_insert_rowid())
    }

    async fn get_report(&self, report_id: i64) -> Result<Option<ModerationReport>, ModerationError> {
        let row = sqlx::query("SELECT * FROM moderation_reports WHERE id = ?")
            .bind(report_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(report_from_row).transpose()
    }

    async fn list_reports(
        &self,
        tenant_id: &str,
        status: Option<ReportStatus>,
    ) -> Result<Vec<ModerationReport>, ModerationError> {
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query(
            r#"
            SELECT * FROM moderation_reports
            WHERE tenant_id = ? AND (? IS NULL OR status = ?)
            ORDER BY id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(report_from_row).collect()
    }

    async fn resolve_report(
        &self,
        report_id: i64,
        content: &ContentRef,
        decision: ReportStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<bool, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Only a pending report can change state, so concurrent reviews
        // cannot both win.
        let result = sqlx::query(
            r#"
            UPDATE moderation_reports SET status = ?, reviewed_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(decision.as_str())
        .bind(reviewed_at.to_rfc3339())
        .bind(report_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() != 1 {
            return Ok(false);
        }

        if decision == ReportStatus::Dismissed {
            sqlx::query(
                r#"
                UPDATE content_flags SET is_restricted = 0
                WHERE tenant_id = ? AND content_kind = ? AND content_id = ?
                "#,
            )
            .bind(&content.tenant_id)
            .bind(content.kind.as_str())
            .bind(&content.content_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(true)
    }
}
