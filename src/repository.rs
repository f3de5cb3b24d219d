//! Single source of truth for generated strings: asks the content provider for new
//! ones and keeps the local history in storage.

use crate::api::ContentProvider;
use crate::error::GenerateError;
use crate::models::{GeneratedString, RandomTextResponse};
use crate::storage::{Snapshot, StorageManager};
use futures::{stream, Stream};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

// Column of the provider row holding the JSON payload
const DATA_COLUMN: &str = "data";

// Alias for the live list stream we hand out
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Snapshot> + Send>>;

pub struct RandomStringRepository {
    provider: Arc<dyn ContentProvider>,
    storage: Arc<Mutex<StorageManager>>,
    // Taken once at construction so subscribing never waits on the storage lock
    snapshots: watch::Receiver<Snapshot>,
}

impl RandomStringRepository {
    pub async fn new(provider: Arc<dyn ContentProvider>, storage: Arc<Mutex<StorageManager>>) -> Self {
        let snapshots = storage.lock().await.subscribe();
        Self {
            provider,
            storage,
            snapshots,
        }
    }

    /// Live view of all stored strings. Yields the current set first, then a new
    /// snapshot after every insert or delete. Ends when storage is dropped.
    pub fn list(&self) -> SnapshotStream {
        let rx = self.snapshots.clone();
        Box::pin(stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, (rx, false)))
        }))
    }

    /// Current set of stored strings without subscribing.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Queries the provider for a string of at most `length` characters and stores it.
    /// Returns the stored record with its id populated.
    pub async fn generate(&self, length: u32) -> Result<GeneratedString, GenerateError> {
        log::info!("Requesting random string with max length {}", length);

        let rows = self.provider.query(length).await.map_err(|e| {
            log::error!("Content provider query failed: {:?}", e);
            // Alternate form keeps the whole cause chain, not just the outer context
            GenerateError::Provider(format!("{:#}", e))
        })?;

        let Some(row) = rows.into_iter().next() else {
            log::warn!("Content provider returned no rows");
            return Err(GenerateError::NoData);
        };

        let Some(payload) = row.column(DATA_COLUMN) else {
            log::warn!("Content provider row has no '{}' column", DATA_COLUMN);
            return Err(GenerateError::NoData);
        };

        let Some(payload) = payload else {
            log::warn!("Content provider returned a null '{}' column", DATA_COLUMN);
            return Err(GenerateError::Parse);
        };

        // Parser detail stays in the log; the user only sees the fixed message
        let response: RandomTextResponse = serde_json::from_str(payload).map_err(|e| {
            log::warn!("Failed to parse content provider response: {} - Data: {}", e, payload);
            GenerateError::Parse
        })?;

        let record = GeneratedString::from(response.random_text);
        let id = {
            let storage = self.storage.lock().await;
            storage.insert_string(&record).await.map_err(|e| {
                log::error!("Failed to store generated string: {:?}", e);
                GenerateError::Storage(format!("{:#}", e))
            })?
        };

        Ok(record.with_id(id))
    }

    /// Deletes the stored row matching `record`'s id. No-op if it is already gone.
    pub async fn delete_one(&self, record: &GeneratedString) -> Result<u64, anyhow::Error> {
        let Some(id) = record.id else {
            log::warn!("Ignoring delete of a record that was never stored");
            return Ok(0);
        };
        self.storage.lock().await.delete_string(id).await
    }

    /// Deletes every stored row and returns how many there were.
    pub async fn delete_all(&self) -> Result<u64, anyhow::Error> {
        self.storage.lock().await.delete_all_strings().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{HttpContentProvider, ProviderRow};
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    pub(crate) const TEST_JSON_RESPONSE: &str = r#"{
        "randomText": {
            "value": "testString",
            "length": 10,
            "created": "2024-10-01T12:00:00Z"
        }
    }"#;

    enum Script {
        Rows(Vec<ProviderRow>),
        Fail(String),
    }

    /// Scripted provider that records the limits it was queried with.
    pub(crate) struct FakeProvider {
        script: Script,
        limits: StdMutex<Vec<u32>>,
    }

    impl FakeProvider {
        fn scripted(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                limits: StdMutex::new(Vec::new()),
            })
        }

        pub(crate) fn rows(rows: Vec<ProviderRow>) -> Arc<Self> {
            Self::scripted(Script::Rows(rows))
        }

        pub(crate) fn json(payload: &str) -> Arc<Self> {
            Self::rows(vec![ProviderRow::single(DATA_COLUMN, payload)])
        }

        pub(crate) fn failing(message: &str) -> Arc<Self> {
            Self::scripted(Script::Fail(message.to_string()))
        }

        pub(crate) fn queried_limits(&self) -> Vec<u32> {
            self.limits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentProvider for FakeProvider {
        async fn query(&self, limit: u32) -> anyhow::Result<Vec<ProviderRow>> {
            self.limits.lock().unwrap().push(limit);
            match &self.script {
                Script::Rows(rows) => Ok(rows.clone()),
                Script::Fail(message) => Err(anyhow::anyhow!(message.clone())),
            }
        }
    }

    pub(crate) async fn repository_with(
        provider: Arc<dyn ContentProvider>,
        dir: &TempDir,
    ) -> RandomStringRepository {
        let storage = StorageManager::new(&dir.path().join("repo.sqlite"))
            .await
            .expect("storage should open");
        RandomStringRepository::new(provider, Arc::new(Mutex::new(storage))).await
    }

    #[tokio::test]
    async fn generate_queries_provider_and_stores_result() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::json(TEST_JSON_RESPONSE);
        let repository = repository_with(provider.clone(), &dir).await;

        let record = repository.generate(10).await.unwrap();

        assert_eq!(provider.queried_limits(), vec![10]);
        assert_eq!(record.value, "testString");
        assert_eq!(record.length, 10);
        assert_eq!(record.created, "2024-10-01T12:00:00Z");

        let stored = repository.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(record.id, stored[0].id);
        assert!(record.id.is_some());
        assert_eq!(stored[0], record);
    }

    #[tokio::test]
    async fn generate_fails_when_provider_returns_no_rows() {
        let dir = TempDir::new().unwrap();
        let repository = repository_with(FakeProvider::rows(Vec::new()), &dir).await;

        let err = repository.generate(10).await.unwrap_err();

        assert_eq!(err.to_string(), "No data returned from content provider");
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_fails_when_data_column_is_missing() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::rows(vec![ProviderRow::single("other", TEST_JSON_RESPONSE)]);
        let repository = repository_with(provider, &dir).await;

        let err = repository.generate(10).await.unwrap_err();

        assert_eq!(err, GenerateError::NoData);
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_fails_when_json_parsing_fails() {
        let dir = TempDir::new().unwrap();
        let repository = repository_with(FakeProvider::json("invalid json"), &dir).await;

        let err = repository.generate(10).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to parse response");
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_fails_when_json_has_wrong_shape() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::json(r#"{"randomText": {"value": "abc"}}"#);
        let repository = repository_with(provider, &dir).await;

        assert_eq!(repository.generate(3).await.unwrap_err(), GenerateError::Parse);
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_treats_null_payload_as_parse_failure() {
        let dir = TempDir::new().unwrap();
        let mut columns = std::collections::HashMap::new();
        columns.insert(DATA_COLUMN.to_string(), None);
        let repository = repository_with(FakeProvider::rows(vec![ProviderRow::new(columns)]), &dir).await;

        assert_eq!(repository.generate(3).await.unwrap_err(), GenerateError::Parse);
    }

    #[tokio::test]
    async fn generate_surfaces_provider_error_message() {
        let dir = TempDir::new().unwrap();
        let repository = repository_with(FakeProvider::failing("Test exception"), &dir).await;

        let err = repository.generate(10).await.unwrap_err();

        assert_eq!(err.to_string(), "Test exception");
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_surfaces_http_transport_error() {
        let dir = TempDir::new().unwrap();
        // Nothing listens on port 9 of the loopback interface
        let provider = Arc::new(HttpContentProvider::new("http://127.0.0.1:9", None));
        let repository = repository_with(provider, &dir).await;

        let GenerateError::Provider(message) = repository.generate(10).await.unwrap_err() else {
            panic!("expected a provider error");
        };

        assert!(message.contains("error sending request"), "got: {}", message);
        assert_ne!(message, "Failed to send request to content provider");
        assert!(repository.snapshot().is_empty());
    }

    #[tokio::test]
    async fn generate_surfaces_row_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not rows"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let repository = repository_with(Arc::new(HttpContentProvider::new(server.uri(), None)), &dir).await;

        let GenerateError::Provider(message) = repository.generate(10).await.unwrap_err() else {
            panic!("expected a provider error");
        };

        assert!(message.starts_with("Failed to decode content provider rows: "), "got: {}", message);
        assert!(message.contains("error decoding response body"), "got: {}", message);
    }

    #[tokio::test]
    async fn generate_surfaces_storage_error_and_leaves_no_row() {
        let dir = TempDir::new().unwrap();
        let storage = StorageManager::new(&dir.path().join("repo.sqlite"))
            .await
            .expect("storage should open");
        // A row whose length column cannot be read back breaks the post-insert snapshot
        sqlx::query("INSERT INTO random_string_data (value, length, created) VALUES ('bad', 'notanint', '2024-10-01T12:00:00Z')")
            .execute(storage.pool())
            .await
            .unwrap();
        let pool = storage.pool().clone();
        let repository =
            RandomStringRepository::new(FakeProvider::json(TEST_JSON_RESPONSE), Arc::new(Mutex::new(storage))).await;

        let err = repository.generate(10).await.unwrap_err();

        assert!(matches!(&err, GenerateError::Storage(message) if message.contains("Failed to read length column")));
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM random_string_data")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn list_emits_current_set_then_each_mutation() {
        let dir = TempDir::new().unwrap();
        let repository = repository_with(FakeProvider::json(TEST_JSON_RESPONSE), &dir).await;
        let mut list = repository.list();

        assert!(list.next().await.unwrap().is_empty());

        let first = repository.generate(10).await.unwrap();
        assert_eq!(*list.next().await.unwrap(), vec![first.clone()]);

        let second = repository.generate(10).await.unwrap();
        let snapshot = list.next().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&second));

        assert_eq!(repository.delete_one(&first).await.unwrap(), 1);
        assert_eq!(*list.next().await.unwrap(), vec![second]);

        assert_eq!(repository.delete_all().await.unwrap(), 1);
        assert!(list.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_one_is_noop_for_absent_or_unsaved_records() {
        let dir = TempDir::new().unwrap();
        let repository = repository_with(FakeProvider::json(TEST_JSON_RESPONSE), &dir).await;
        let record = repository.generate(10).await.unwrap();

        assert_eq!(repository.delete_one(&record).await.unwrap(), 1);
        assert_eq!(repository.delete_one(&record).await.unwrap(), 0);

        let unsaved = GeneratedString::unsaved("x".to_string(), 1, "2024-10-01T12:00:00Z".to_string());
        assert_eq!(repository.delete_one(&unsaved).await.unwrap(), 0);
    }
}
