use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index if missing. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // One wide row per consultant
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consultants (
            consultant_id TEXT PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            mobile TEXT,
            home_phone TEXT,
            other_phone TEXT,
            fax TEXT,
            contact_type TEXT,
            consultant_status TEXT,
            contact_owner TEXT,
            lead_source TEXT,
            consultant_lead_source TEXT,
            account_name TEXT,
            title TEXT,
            department TEXT,
            mailing_street TEXT,
            mailing_city TEXT,
            mailing_state TEXT,
            mailing_zip TEXT,
            mailing_country TEXT,
            location TEXT,
            practice_area TEXT,
            hourly_rate_low TEXT,
            hourly_rate_high TEXT,
            hourly_rate_range TEXT,
            business_strategy_skills TEXT NOT NULL DEFAULT '[]',
            finance_skills TEXT NOT NULL DEFAULT '[]',
            law_skills TEXT NOT NULL DEFAULT '[]',
            marketing_pr_skills TEXT NOT NULL DEFAULT '[]',
            nonprofit_skills TEXT NOT NULL DEFAULT '[]',
            professional_passion TEXT,
            projects_excite TEXT,
            open_to_fulltime TEXT,
            how_heard_about_us TEXT,
            referred_by TEXT,
            reference_1 TEXT NOT NULL DEFAULT '{}',
            reference_2 TEXT NOT NULL DEFAULT '{}',
            description TEXT,
            interview_notes TEXT,
            reference_call_notes TEXT,
            keywords TEXT,
            linkedin TEXT,
            linkedin_connection TEXT,
            invitation_lists TEXT NOT NULL DEFAULT '[]',
            created_time TEXT,
            modified_time TEXT,
            last_activity_time TEXT,
            resume_text TEXT,
            canonical_text TEXT NOT NULL,
            text_hash TEXT NOT NULL,
            embedding BLOB,
            embedding_model TEXT,
            raw_source_payload TEXT NOT NULL DEFAULT 'null',
            extracted_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS consultant_attachments (
            consultant_id TEXT NOT NULL,
            attachment_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size TEXT,
            file_type TEXT,
            created_time TEXT,
            modified_time TEXT,
            extracted_text TEXT NOT NULL,
            embedding BLOB,
            UNIQUE(consultant_id, attachment_id),
            FOREIGN KEY (consultant_id) REFERENCES consultants(consultant_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only run log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_runs (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            contacts_seen INTEGER NOT NULL DEFAULT 0,
            consultants_matched INTEGER NOT NULL DEFAULT 0,
            succeeded INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            embedding_failures INTEGER NOT NULL DEFAULT 0,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            elapsed_ms INTEGER,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_consultants_name ON consultants(name)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_consultants_status ON consultants(consultant_status)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_attachments_consultant ON consultant_attachments(consultant_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sync_runs_started ON sync_runs(started_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
