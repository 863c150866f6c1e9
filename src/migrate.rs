use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables and indexes. Safe to run repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Offers are keyed by source URL and never updated
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS offers (
            job_url TEXT PRIMARY KEY,
            job_title TEXT,
            category TEXT,
            company TEXT,
            location TEXT,
            salary_any TEXT,
            salary_b2b TEXT,
            salary_internship TEXT,
            salary_mandate TEXT,
            salary_perm TEXT,
            salary_specific_task TEXT,
            work_type TEXT,
            experience TEXT,
            employment_type TEXT,
            operating_mode TEXT,
            tech_stack TEXT,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS skills (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_skill_name TEXT NOT NULL UNIQUE,
            canonical_skill_name TEXT,
            category TEXT,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_offers_created_at ON offers(created_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
