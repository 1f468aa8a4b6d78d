//! SQLite connection setup.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use sea_orm::{DatabaseConnection, SqlxSqliteConnector};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use url::Url;

use runtime::DatabaseConfig;

pub const MEMORY_DSN: &str = "sqlite::memory:";

/// Only SQLite is wired in.
pub fn check_backend(cfg: &DatabaseConfig) -> Result<()> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }
    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" | "sqlite3" => Ok(()),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps in-memory DSNs as `sqlite::memory:`.
/// - Normalizes backslashes into forward slashes.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

/// Opens the pool and hands it to SeaORM. `mock` swaps in a private in-memory database.
pub async fn connect(cfg: &DatabaseConfig, base_dir: &Path, mock: bool) -> Result<DatabaseConnection> {
    check_backend(cfg)?;

    let dsn = if mock {
        MEMORY_DSN.to_string()
    } else {
        absolutize_sqlite_dsn(cfg.url.trim(), base_dir, true)?
    };
    let in_memory = dsn == MEMORY_DSN;

    let mut options = SqliteConnectOptions::from_str(&dsn)
        .with_context(|| format!("Invalid SQLite DSN '{dsn}'"))?
        .create_if_missing(true);
    if let Some(ms) = cfg.busy_timeout_ms {
        options = options.busy_timeout(Duration::from_millis(u64::from(ms)));
    }
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // Every pooled connection to `:memory:` would see its own empty database.
    let mut pool = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
    pool = if in_memory {
        pool.max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        pool.max_connections(cfg.max_conns.unwrap_or(10))
    };

    tracing::info!("Connecting to database: {}", dsn);
    let pool = pool
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to {dsn}"))?;
    tracing::info!(in_memory, "Connected DB backend: sqlite");

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}
