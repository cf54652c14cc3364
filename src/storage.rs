/// Storage for chrome.storage.local: a generic key-value seam plus the archive collection
use std::rc::Rc;

use futures::lock::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::KEY_ARCHIVED;
use crate::error::StorageError;
use crate::tab_data::{ArchiveRecord, RecordMatcher};

/// Persistent key-value store (chrome.storage.local in the extension)
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Read and decode `key`; `None` when it was never written
pub async fn load<S, T>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            }),
    }
}

pub async fn save<S, T>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, value).await
}

/// The archived-tab collection, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveData {
    pub records: Vec<ArchiveRecord>,
}

impl ArchiveData {
    pub fn new() -> Self {
        ArchiveData {
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: ArchiveRecord) {
        self.records.push(record);
    }

    /// Remove the first entry the matcher selects
    pub fn remove_record(&mut self, matcher: &RecordMatcher) -> bool {
        match self.records.iter().position(|r| matcher.matches(r)) {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Owner of the `archived` key
///
/// Every read-modify-write of the collection runs under one async lock, so a
/// long archive batch and a restore-triggered removal cannot lose each
/// other's update.
pub struct ArchiveStore<S> {
    store: Rc<S>,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> ArchiveStore<S> {
    pub fn new(store: Rc<S>) -> Self {
        ArchiveStore {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Snapshot of the collection; not serialized against writers
    pub async fn load(&self) -> Result<ArchiveData, StorageError> {
        let records: Option<Vec<ArchiveRecord>> = load(self.store.as_ref(), KEY_ARCHIVED).await?;
        Ok(ArchiveData {
            records: records.unwrap_or_default(),
        })
    }

    async fn write(&self, data: &ArchiveData) -> Result<(), StorageError> {
        save(self.store.as_ref(), KEY_ARCHIVED, &data.records).await
    }

    /// Append records in order with a single write
    pub async fn append(&self, records: Vec<ArchiveRecord>) -> Result<usize, StorageError> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let added = records.len();
        for record in records {
            data.add_record(record);
        }
        self.write(&data).await?;
        Ok(added)
    }

    /// Remove one matching entry; `false` (and no write) when none matches
    pub async fn remove(&self, matcher: &RecordMatcher) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        if !data.remove_record(matcher) {
            return Ok(false);
        }
        self.write(&data).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.write(&ArchiveData::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, record};
    use futures::executor::block_on;

    #[test]
    fn test_archive_data_new() {
        let data = ArchiveData::new();
        assert_eq!(data.records.len(), 0);
    }

    #[test]
    fn test_add_record_keeps_insertion_order() {
        let mut data = ArchiveData::new();
        data.add_record(record("a", "https://a.com", 1.0));
        data.add_record(record("b", "https://b.com", 2.0));

        let ids: Vec<&str> = data.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_record() {
        let mut data = ArchiveData::new();
        data.add_record(record("a", "https://a.com", 1.0));
        data.add_record(record("b", "https://b.com", 2.0));

        let removed = data.remove_record(&record("a", "", 0.0).matcher());

        assert!(removed);
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].id, "b");
    }

    #[test]
    fn test_remove_nonexistent_record() {
        let mut data = ArchiveData::new();
        data.add_record(record("a", "https://a.com", 1.0));

        let removed = data.remove_record(&record("zzz", "https://a.com", 1.0).matcher());

        assert!(!removed);
        assert_eq!(data.records.len(), 1);
    }

    #[test]
    fn test_remove_duplicate_url_date_removes_one() {
        let mut data = ArchiveData::new();
        data.add_record(record("", "https://a.com", 1.0));
        data.add_record(record("", "https://a.com", 1.0));

        assert!(data.remove_record(&record("", "https://a.com", 1.0).matcher()));
        assert_eq!(data.records.len(), 1);
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let store = Rc::new(MemoryStore::new());
        let archive = ArchiveStore::new(store);

        let data = block_on(archive.load()).unwrap();
        assert!(data.records.is_empty());
    }

    #[test]
    fn test_load_malformed_is_decode_error() {
        let store = Rc::new(MemoryStore::new());
        store.insert(KEY_ARCHIVED, serde_json::json!({"not": "a list"}));
        let archive = ArchiveStore::new(store);

        let err = block_on(archive.load()).unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));
    }

    #[test]
    fn test_append_and_remove_persist() {
        let store = Rc::new(MemoryStore::new());
        let archive = ArchiveStore::new(store.clone());

        block_on(async {
            archive
                .append(vec![record("a", "https://a.com", 1.0), record("b", "https://b.com", 2.0)])
                .await
                .unwrap();
            archive.append(vec![record("c", "https://c.com", 3.0)]).await.unwrap();

            assert!(archive.remove(&record("b", "", 0.0).matcher()).await.unwrap());
            assert!(!archive.remove(&record("b", "", 0.0).matcher()).await.unwrap());
        });

        let stored: Vec<ArchiveRecord> =
            serde_json::from_value(store.value(KEY_ARCHIVED).unwrap()).unwrap();
        let ids: Vec<&str> = stored.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_remove_miss_does_not_write() {
        let store = Rc::new(MemoryStore::new());
        let archive = ArchiveStore::new(store.clone());

        let removed = block_on(archive.remove(&record("a", "", 0.0).matcher())).unwrap();

        assert!(!removed);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_clear() {
        let store = Rc::new(MemoryStore::new());
        let archive = ArchiveStore::new(store.clone());

        block_on(async {
            archive.append(vec![record("a", "https://a.com", 1.0)]).await.unwrap();
            archive.clear().await.unwrap();
        });

        assert_eq!(store.value(KEY_ARCHIVED), Some(serde_json::json!([])));
    }

    #[test]
    fn test_concurrent_append_and_remove_both_land() {
        let store = Rc::new(MemoryStore::yielding());
        let archive = ArchiveStore::new(store.clone());
        block_on(archive.append(vec![record("old", "https://old.com", 1.0)])).unwrap();

        block_on(async {
            let old_matcher = record("old", "", 0.0).matcher();
            let (appended, removed) = futures::join!(
                archive.append(vec![record("new", "https://new.com", 2.0)]),
                archive.remove(&old_matcher),
            );
            assert_eq!(appended.unwrap(), 1);
            assert!(removed.unwrap());
        });

        let data = block_on(archive.load()).unwrap();
        let ids: Vec<&str> = data.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }
}
