// SQLite-backed whitelist store.
//
// Table:
// - users: one row per whitelisted identity, `userID` is the unique key
//
// Adds are a single `INSERT ... ON CONFLICT DO NOTHING`, so the existence check and
// the write happen inside SQLite under its write lock. Every value is bound, never
// formatted into the SQL text.

use crate::core::whitelist::{
    AddOutcome, NewWhitelistEntry, WhitelistEntry, WhitelistError, WhitelistStatus, WhitelistStore,
};
use anyhow::bail;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Connection, Pool, Row, Sqlite};
use std::path::Path;
use std::time::Duration;

pub struct SqliteWhitelistStore {
    pool: Pool<Sqlite>,
}

fn storage_error(e: sqlx::Error) -> WhitelistError {
    WhitelistError::StorageUnavailable(e.to_string())
}

/// SQLite's own bounds (pool acquire, busy lock wait) for a given service deadline.
///
/// Both together stay under `store_timeout`, so a contended write fails inside
/// SQLite and is never committed after the service has already given up on it.
fn sqlite_bounds(store_timeout: Duration) -> (Duration, Duration) {
    (store_timeout / 5, store_timeout / 2)
}

impl SqliteWhitelistStore {
    /// Open (creating if needed) the database file at `path` and run migrations.
    ///
    /// `store_timeout` is the deadline the whitelist service puts on each call;
    /// the SQLite-side limits are derived from it with `sqlite_bounds`.
    pub async fn connect(path: impl AsRef<Path>, store_timeout: Duration) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let (acquire_timeout, busy_timeout) = sqlite_bounds(store_timeout);
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        // Migrate on a connection of its own so every pooled connection opens
        // after the schema (and the unique index) is in place.
        let mut conn = SqliteConnection::connect_with(&options).await?;
        migrate(&mut conn).await?;
        conn.close().await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

/// Create the `users` table. The unique index also upgrades tables created
/// before `userID` carried a constraint.
async fn migrate(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            userID TEXT NOT NULL UNIQUE,
            nickname TEXT NOT NULL,
            status TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *conn)
    .await?;

    if let Err(err) =
        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_user_id ON users(userID)")
            .execute(&mut *conn)
            .await
    {
        let duplicates: Vec<String> = sqlx::query(
            "SELECT userID FROM users GROUP BY userID HAVING COUNT(*) > 1 ORDER BY userID LIMIT 10",
        )
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|row| {
            row.try_get::<Option<String>, _>("userID")
                .ok()
                .flatten()
                .unwrap_or_default()
        })
        .collect();

        if duplicates.is_empty() {
            return Err(err.into());
        }

        tracing::error!(
            ?duplicates,
            "users table holds duplicate userID rows; remove them before starting the bot"
        );
        bail!(
            "cannot add unique key on users.userID: duplicate ids {duplicates:?}; \
             de-duplicate the users table and restart"
        );
    }

    Ok(())
}

#[async_trait]
impl WhitelistStore for SqliteWhitelistStore {
    async fn insert_if_absent(
        &self,
        entry: &NewWhitelistEntry,
    ) -> Result<AddOutcome, WhitelistError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (userID, nickname, status)
            VALUES (?, ?, ?)
            ON CONFLICT(userID) DO NOTHING
            "#,
        )
        .bind(&entry.user_id)
        .bind(&entry.nickname)
        .bind(entry.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 1 {
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::AlreadyExists)
        }
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<WhitelistEntry>, WhitelistError> {
        let row = sqlx::query("SELECT userID, nickname, status FROM users WHERE userID = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_str: String = row.try_get("status").map_err(storage_error)?;
        let status = status_str
            .parse::<WhitelistStatus>()
            .map_err(WhitelistError::StorageUnavailable)?;
        // Rows from older tables may carry a NULL nickname
        let nickname: Option<String> = row.try_get("nickname").map_err(storage_error)?;

        Ok(Some(WhitelistEntry {
            user_id: row.try_get("userID").map_err(storage_error)?,
            nickname: nickname.unwrap_or_default(),
            status,
        }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::whitelist::WhitelistService;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SqliteWhitelistStore {
        SqliteWhitelistStore::connect(dir.path().join("whitelist.db"), Duration::from_secs(5))
            .await
            .unwrap()
    }

    async fn row_count(store: &SqliteWhitelistStore) -> i64 {
        sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get("n")
    }

    #[tokio::test]
    async fn test_insert_then_conflict_keeps_first_nickname() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let first = store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("42", "Alice"))
            .await
            .unwrap();
        assert_eq!(first, AddOutcome::Added);

        let second = store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("42", "AliceX"))
            .await
            .unwrap();
        assert_eq!(second, AddOutcome::AlreadyExists);

        let stored = store.find_by_id("42").await.unwrap().unwrap();
        assert_eq!(stored.nickname, "Alice");
        assert_eq!(stored.status, WhitelistStatus::Whitelisted);
        assert_eq!(row_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_status_column_holds_wl() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("1", "Bob"))
            .await
            .unwrap();

        let status: String = sqlx::query("SELECT status FROM users WHERE userID = '1'")
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get("status");
        assert_eq!(status, "wl");
    }

    #[tokio::test]
    async fn test_hostile_nickname_is_stored_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("1", "Bob"))
            .await
            .unwrap();

        let hostile = "x'); DROP TABLE users; -- \"quoted\" ;";
        let outcome = store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("2", hostile))
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        assert_eq!(store.find_by_id("2").await.unwrap().unwrap().nickname, hostile);
        assert_eq!(store.find_by_id("1").await.unwrap().unwrap().nickname, "Bob");
        assert_eq!(row_count(&store).await, 2);
    }

    #[tokio::test]
    async fn test_hostile_user_id_does_not_match_other_rows() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store
            .insert_if_absent(&NewWhitelistEntry::whitelisted("1", "Bob"))
            .await
            .unwrap();

        assert!(store.find_by_id("' OR '1'='1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir).await;
            store
                .insert_if_absent(&NewWhitelistEntry::whitelisted("42", "Alice"))
                .await
                .unwrap();
            store.close().await;
        }

        let store = open_store(&dir).await;
        let stored = store.find_by_id("42").await.unwrap().unwrap();
        assert_eq!(stored.nickname, "Alice");
    }

    #[tokio::test]
    async fn test_legacy_table_gains_unique_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.db");

        // Table shape without any constraint on userID
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE users (userID TEXT, nickname TEXT, status TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let store = SqliteWhitelistStore::connect(&path, Duration::from_secs(5))
            .await
            .unwrap();
        let entry = NewWhitelistEntry::whitelisted("42", "Alice");

        assert_eq!(store.insert_if_absent(&entry).await.unwrap(), AddOutcome::Added);
        assert_eq!(
            store.insert_if_absent(&entry).await.unwrap(),
            AddOutcome::AlreadyExists
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_write_one_row() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(WhitelistService::new(open_store(&dir).await));

        let (a, b) = tokio::join!(
            {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.add_if_absent("77", "first").await })
            },
            {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.add_if_absent("77", "second").await })
            }
        );

        let mut outcomes = vec![a.unwrap().unwrap(), b.unwrap().unwrap()];
        outcomes.sort_by_key(|o| *o == AddOutcome::AlreadyExists);
        assert_eq!(outcomes, vec![AddOutcome::Added, AddOutcome::AlreadyExists]);

        let stored = service.lookup("77").await.unwrap().unwrap();
        assert!(stored.nickname == "first" || stored.nickname == "second");
    }

    #[test]
    fn test_sqlite_bounds_fit_inside_store_timeout() {
        let store_timeout = Duration::from_secs(5);
        let (acquire, busy) = sqlite_bounds(store_timeout);

        assert!(acquire + busy < store_timeout);
        assert!(!busy.is_zero());
    }

    #[tokio::test]
    async fn test_write_lock_contention_fails_without_late_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("whitelist.db");
        let store_timeout = Duration::from_millis(600);
        let service = WhitelistService::with_timeout(
            SqliteWhitelistStore::connect(&path, store_timeout)
                .await
                .unwrap(),
            store_timeout,
        );

        // Another writer holds the write lock for longer than the deadline
        let mut holder =
            SqliteConnection::connect_with(&SqliteConnectOptions::new().filename(&path))
                .await
                .unwrap();
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut holder)
            .await
            .unwrap();

        let err = service.add_if_absent("42", "Alice").await.unwrap_err();
        match &err {
            WhitelistError::StorageUnavailable(reason) => assert!(
                !reason.starts_with("insert_if_absent timed out"),
                "SQLite should give up before the service deadline, got: {reason}"
            ),
            other => panic!("unexpected error: {other:?}"),
        }

        sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
        holder.close().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The failed add must not have landed after the lock was released
        assert!(service.lookup("42").await.unwrap().is_none());
        assert_eq!(
            service.add_if_absent("42", "Alice").await.unwrap(),
            AddOutcome::Added
        );
    }

    #[tokio::test]
    async fn test_legacy_table_with_duplicates_refuses_to_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dupes.db");

        let mut conn = SqliteConnection::connect_with(
            &SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
        sqlx::query("CREATE TABLE users (userID TEXT, nickname TEXT, status TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO users VALUES ('42', 'Alice', 'wl'), ('42', 'AliceX', 'wl'), ('7', 'Bob', 'wl')",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();

        let err = match SqliteWhitelistStore::connect(&path, Duration::from_secs(5)).await {
            Ok(_) => panic!("store opened over duplicate ids"),
            Err(err) => err.to_string(),
        };
        assert!(err.contains("duplicate ids"), "{err}");
        assert!(err.contains("\"42\""), "{err}");
        assert!(!err.contains("\"7\""), "{err}");
    }
}
