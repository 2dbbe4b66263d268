//! The rules shared by every read and write path.
//!
//! Both the JSON API and the HTML page consume pastes through [`consume`];
//! they differ only in how they encode the outcome.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::Error;
use crate::paste::{NewPaste, Paste};
use crate::short_code::{Generator, ShortCode, SHORT_CODE_SIZE};
use crate::store::Store;

/// A paste that was just served, with the view that served it counted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Consumed {
    pub content: String,
    pub view_count: u64,
    pub max_views: Option<u64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Consumed {
    /// `None` for pastes without a view limit. Never negative.
    pub fn remaining_views(&self) -> Option<u64> {
        self.max_views
            .map(|max_views| max_views.saturating_sub(self.view_count))
    }
}

impl From<Paste> for Consumed {
    fn from(paste: Paste) -> Self {
        Self {
            content: paste.content,
            view_count: paste.view_count,
            max_views: paste.max_views,
            expires_at: paste.expires_at,
        }
    }
}

/// Serves one view of the paste `id` as of `now`.
///
/// Absent, expired, and exhausted pastes all fail with [`Error::NotFound`].
/// The expiry and limit checks here only avoid pointless writes; the limit is
/// enforced by [`Store::consume_view`], so at most `max_views` calls ever
/// succeed no matter how many race.
pub async fn consume<S>(store: &S, id: &str, now: DateTime<Utc>) -> Result<Consumed, Error>
where
    S: Store + ?Sized,
{
    let paste = store.find_by_id(id).await?.ok_or(Error::NotFound)?;

    if paste.expired(now) {
        debug!("Paste {} expired at {:?}", id, paste.expires_at);
        return Err(Error::NotFound);
    }

    if !paste.has_views_left() {
        debug!("Paste {} has no views left", id);
        return Err(Error::NotFound);
    }

    match store.consume_view(id).await? {
        Some(updated) => Ok(updated.into()),
        None => {
            debug!("Lost the race for the last view of paste {}", id);
            Err(Error::NotFound)
        }
    }
}

/// Persists a new paste under a freshly generated id.
///
/// Fails with [`Error::Conflict`] if the id is already taken; the caller
/// decides whether to try again.
pub async fn create<S, R>(
    store: &S,
    rng: &mut R,
    new_paste: NewPaste,
    now: DateTime<Utc>,
) -> Result<Paste, Error>
where
    S: Store + ?Sized,
    R: Rng + Send,
{
    let id: String = rng.sample::<ShortCode<SHORT_CODE_SIZE>, _>(Generator).into();
    let paste = Paste::new(id, new_paste, now)?;
    store.insert(paste.clone()).await?;
    Ok(paste)
}

/// Whether the store answers. Failures are logged, never returned.
pub async fn is_live<S>(store: &S) -> bool
where
    S: Store + ?Sized,
{
    match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Store health check failed: {}", e);
            false
        }
    }
}
