use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{Options, DB};
use tokio::task;
use tracing::info;

use super::{Store, StoreError};
use crate::paste::Paste;

/// Pastes stored as bincode values keyed by their id.
///
/// RocksDB holds an exclusive LOCK file on the database directory, so this
/// process is the only writer. Every read-check-write sequence runs under
/// `write_lock`, which makes it a single compare-and-mutate as far as any
/// other caller can tell.
pub struct RocksStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: DB,
    write_lock: Mutex<()>,
}

impl Inner {
    fn get(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        match self.db.get_pinned(id.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Unavailable("write lock poisoned".to_string()))
    }
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path.as_ref())?;
        info!("Opened paste database at {}", path.as_ref().display());
        Ok(Self {
            inner: Arc::new(Inner {
                db,
                write_lock: Mutex::new(()),
            }),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        task::spawn_blocking(move || f(&inner)).await?
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let id = id.to_string();
        self.blocking(move |inner| inner.get(&id)).await
    }

    async fn consume_view(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let id = id.to_string();
        self.blocking(move |inner| {
            let _guard = inner.lock()?;
            let mut paste = match inner.get(&id)? {
                Some(paste) if paste.has_views_left() => paste,
                _ => return Ok(None),
            };

            paste.view_count = paste
                .view_count
                .checked_add(1)
                .ok_or_else(|| StoreError::ViewCountOverflow(id.clone()))?;
            inner.db.put(id.as_bytes(), bincode::serialize(&paste)?)?;
            Ok(Some(paste))
        })
        .await
    }

    async fn insert(&self, paste: Paste) -> Result<(), StoreError> {
        self.blocking(move |inner| {
            let value = bincode::serialize(&paste)?;
            let _guard = inner.lock()?;
            if inner.db.get_pinned(paste.id.as_bytes())?.is_some() {
                return Err(StoreError::Conflict);
            }

            inner.db.put(paste.id.as_bytes(), value)?;
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.blocking(|inner| {
            inner
                .db
                .property_value("rocksdb.stats")?
                .map(|_| ())
                .ok_or_else(|| StoreError::Unavailable("no stats reported".to_string()))
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.blocking(|inner| {
            inner.db.flush()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::paste::NewPaste;

    fn paste(id: &str, max_views: Option<u64>) -> Paste {
        let new_paste = NewPaste::new("stored verbatim\n", Some(60), max_views).unwrap();
        Paste::new(id.to_string(), new_paste, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let original = paste("abc", Some(3));
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store.insert(original.clone()).await.unwrap();
            store.consume_view("abc").await.unwrap();
            store.close().await.unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let found = store.find_by_id("abc").await.unwrap().unwrap();
        assert_eq!(found.content, original.content);
        assert_eq!(found.expires_at, original.expires_at);
        assert_eq!(found.view_count, 1);
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        store.insert(paste("abc", None)).await.unwrap();
        assert!(matches!(
            store.insert(paste("abc", Some(1))).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn consume_stops_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        store.insert(paste("abc", Some(1))).await.unwrap();
        assert!(store.consume_view("abc").await.unwrap().is_some());
        assert!(store.consume_view("abc").await.unwrap().is_none());
        assert!(store.consume_view("nope").await.unwrap().is_none());
        assert_eq!(store.find_by_id("abc").await.unwrap().unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn saturated_view_count_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        let mut saturated = paste("abc", None);
        saturated.view_count = u64::MAX;
        store.insert(saturated).await.unwrap();
        assert!(matches!(
            store.consume_view("abc").await,
            Err(StoreError::ViewCountOverflow(id)) if id == "abc"
        ));
        assert_eq!(
            store.find_by_id("abc").await.unwrap().unwrap().view_count,
            u64::MAX
        );

        // The write lock is released normally, so later consumes still work.
        store.insert(paste("def", None)).await.unwrap();
        assert_eq!(store.consume_view("def").await.unwrap().unwrap().view_count, 1);
    }

    #[tokio::test]
    async fn ping_reports_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        assert!(store.ping().await.is_ok());
    }
}
