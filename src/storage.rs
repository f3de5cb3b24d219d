use anyhow::Context;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use crate::models::GeneratedString;

// Define the database schema using CREATE TABLE IF NOT EXISTS statements
const MIGRATIONS_SQL: &str = "
CREATE TABLE IF NOT EXISTS random_string_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    value TEXT NOT NULL,
    length INTEGER NOT NULL,
    created TEXT NOT NULL -- ISO-8601 string from the provider
);
";

/// Immutable view of every stored record at one point in time.
pub type Snapshot = Arc<Vec<GeneratedString>>;

#[derive(Debug)]
pub struct StorageManager {
    pool: SqlitePool,
    // Latest snapshot, republished after every mutation
    snapshots: watch::Sender<Snapshot>,
}

impl StorageManager {
    /// Opens (creating if needed) the database file at `db_path` and runs migrations.
    pub async fn new(db_path: &Path) -> Result<Self, anyhow::Error> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await.context("Failed to create database directory")?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        Self::connect(&db_url).await
    }

    /// Connects to the database at `db_url`, runs migrations and loads the first snapshot.
    pub async fn connect(db_url: &str) -> Result<Self, anyhow::Error> {
        log::info!("Connecting to database: {}", db_url);

        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            log::info!("Database file not found, creating...");
            Sqlite::create_database(db_url).await.context("Failed to create database")?;
        }

        let pool = SqlitePoolOptions::new()
            .connect(db_url)
            .await
            .context("Failed to connect to SQLite database")?;

        Self::run_migrations(&pool).await?;

        let initial = Self::fetch_all(&pool).await?;
        let (snapshots, _) = watch::channel(Arc::new(initial));

        Ok(Self { pool, snapshots })
    }

    /// Applies the database schema migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), anyhow::Error> {
        log::info!("Running database migrations...");
        sqlx::query(MIGRATIONS_SQL)
            .execute(pool)
            .await
            .context("Failed to run database migrations")?;
        log::info!("Database migrations completed.");
        Ok(())
    }

    async fn fetch_all<'e, E>(executor: E) -> Result<Vec<GeneratedString>, anyhow::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        // No ORDER BY: callers get SQLite's natural order
        let rows = sqlx::query("SELECT id, value, length, created FROM random_string_data")
            .fetch_all(executor)
            .await
            .context("Failed to fetch generated strings from database")?;

        rows.into_iter()
            .map(|row| {
                Ok(GeneratedString {
                    id: Some(row.try_get("id").context("Failed to read id column")?),
                    value: row.try_get("value").context("Failed to read value column")?,
                    length: row.try_get("length").context("Failed to read length column")?,
                    created: row.try_get("created").context("Failed to read created column")?,
                })
            })
            .collect::<Result<Vec<GeneratedString>, anyhow::Error>>()
    }

    /// Hands a snapshot read inside a committed transaction to every subscriber.
    fn publish_snapshot(&self, strings: Vec<GeneratedString>) {
        log::debug!("Publishing snapshot of {} generated strings", strings.len());
        self.snapshots.send_replace(Arc::new(strings));
    }

    /// Receiver that observes every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Fetches all generated strings.
    #[cfg(test)]
    pub(crate) async fn list_strings(&self) -> Result<Vec<GeneratedString>, anyhow::Error> {
        Self::fetch_all(&self.pool).await
    }

    /// Inserts a new record and returns the id SQLite assigned to it.
    /// Any id already set on `record` is ignored.
    ///
    /// The write and the snapshot re-read share one transaction: if the new
    /// snapshot cannot be read the insert is rolled back.
    pub async fn insert_string(&self, record: &GeneratedString) -> Result<i64, anyhow::Error> {
        log::debug!("Saving generated string of length {}", record.length);

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO random_string_data (value, length, created)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&record.value)
        .bind(record.length)
        .bind(&record.created)
        .execute(&mut *tx)
        .await
        .context("Failed to insert generated string into database")?;

        let id = result.last_insert_rowid();
        // Dropping `tx` on error rolls the insert back
        let strings = Self::fetch_all(&mut *tx).await?;
        tx.commit().await.context("Failed to commit generated string")?;

        log::info!("Successfully saved generated string with ID: {}", id);
        self.publish_snapshot(strings);
        Ok(id)
    }

    /// Deletes the row with the given id. Returns the number of rows removed.
    pub async fn delete_string(&self, id: i64) -> Result<u64, anyhow::Error> {
        log::warn!("Deleting generated string with ID: {}", id);

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query("DELETE FROM random_string_data WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete generated string from database")?;

        if result.rows_affected() == 0 {
            log::warn!("Attempted to delete non-existent generated string: {}", id);
            // Don't error if not found, just log
            return Ok(0);
        }

        let strings = Self::fetch_all(&mut *tx).await?;
        tx.commit().await.context("Failed to commit delete")?;

        log::info!("Successfully deleted generated string {}", id);
        self.publish_snapshot(strings);
        Ok(result.rows_affected())
    }

    /// Deletes every row. Returns the number of rows removed.
    pub async fn delete_all_strings(&self) -> Result<u64, anyhow::Error> {
        log::warn!("Deleting all generated strings");

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let result = sqlx::query("DELETE FROM random_string_data")
            .execute(&mut *tx)
            .await
            .context("Failed to delete generated strings from database")?;

        let strings = Self::fetch_all(&mut *tx).await?;
        tx.commit().await.context("Failed to commit delete")?;

        log::info!("Deleted {} generated strings", result.rows_affected());
        self.publish_snapshot(strings);
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
