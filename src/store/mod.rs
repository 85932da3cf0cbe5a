//! Storage seam shared by the server database and the local demo mirror.
//!
//! Both backends are scoped to a single owner when constructed, so none of
//! the operations take a user id. They differ in how an upsert finds the row
//! it overwrites, which is passed explicitly as a [`MatchRule`].

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::entry::{Entry, EntryChanges, MoodMark, NewEntry, Page};

pub mod postgres;

pub use postgres::{PgEntryRepository, PgEntryStore};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),

    #[error("Stored entries are unreadable: {0}")]
    Corrupt(String),

    #[error("Entry {0} disappeared during update")]
    Vanished(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How an upsert locates the entry it should overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Strict (owner, date) key.
    Date,
    /// First entry whose id or date matches. Only sound for single-owner stores.
    IdOrDate,
}

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Entries ordered by date descending, filtered and paginated.
    async fn list(&self, page: &Page) -> StoreResult<Vec<Entry>>;

    /// Date and mood of every entry in `from..=to`, oldest first.
    async fn moods_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<MoodMark>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>>;

    async fn find_match(
        &self,
        rule: MatchRule,
        id: Option<&str>,
        date: NaiveDate,
    ) -> StoreResult<Option<Entry>>;

    /// Inserts a new entry. Returns `None` when another writer already holds
    /// the same date, so the caller can fall back to updating that row.
    async fn insert(&self, entry: NewEntry) -> StoreResult<Option<Entry>>;

    async fn update(&self, id: &str, changes: &EntryChanges) -> StoreResult<Entry>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

/// Hands out stores scoped to one user.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    fn for_user(&self, user_id: Uuid) -> Box<dyn EntryStore>;

    /// Cheap round trip used by the readiness check.
    async fn ping(&self) -> StoreResult<()>;
}

/// Create-or-update keyed by `rule`. Fields of `entry` not present in
/// `changes` are only used when a new row is created.
pub async fn upsert(
    store: &dyn EntryStore,
    rule: MatchRule,
    entry: NewEntry,
    changes: EntryChanges,
) -> StoreResult<Entry> {
    if let Some(existing) = store
        .find_match(rule, entry.id.as_deref(), entry.date)
        .await?
    {
        return store.update(&existing.id, &changes).await;
    }

    let date = entry.date;
    let id = entry.id.clone();
    if let Some(created) = store.insert(entry).await? {
        return Ok(created);
    }

    // Lost a race with a concurrent insert for the same date.
    tracing::debug!(%date, "insert conflicted, updating existing entry");
    let existing = store
        .find_match(rule, id.as_deref(), date)
        .await?
        .ok_or_else(|| StoreError::Vanished(date.to_string()))?;
    store.update(&existing.id, &changes).await
}

/// Applies a page to an already date-sorted slice of entries.
pub fn paginate<'a, I>(entries: I, page: &Page) -> Vec<Entry>
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries
        .into_iter()
        .filter(|e| page.mood.matches(e.mood))
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}
