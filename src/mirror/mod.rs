//! Demo mode: diary entries kept entirely in client-local storage.
//!
//! The mirror follows the same list/upsert/delete semantics as the server
//! store, but it only ever holds one visitor's entries, so an upsert matches
//! an existing entry by id or by date. The whole collection is rewritten,
//! sorted newest first, after every change.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::clock::Clock;
use crate::models::entry::{
    Entry, EntryChanges, Mood, MoodFilter, MoodMark, NewEntry, Page, PAPER_DIARY_PLACEHOLDER,
};
use crate::store::{self, paginate, EntryStore, MatchRule, StoreError, StoreResult};

pub mod storage;

pub use storage::{FileStorage, LocalStorage, MemoryStorage};

pub const DEMO_MODE_KEY: &str = "moodlog_demo_mode";
pub const DEMO_ENTRIES_KEY: &str = "moodlog_demo_entries";

/// An entry written in demo mode. The comment is produced by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoEntry {
    pub id: Option<String>,
    pub date: NaiveDate,
    pub content: String,
    pub mood: Mood,
    pub ai_comment: Option<String>,
}

pub struct LocalMirrorStore {
    storage: Arc<dyn LocalStorage>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl LocalMirrorStore {
    pub fn new(storage: Arc<dyn LocalStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.storage.get(DEMO_MODE_KEY), Ok(Some(v)) if v == "true")
    }

    pub fn enable(&self) -> StoreResult<()> {
        self.storage.set(DEMO_MODE_KEY, "true")
    }

    /// Leaves demo mode and drops every demo entry.
    pub fn discard(&self) -> StoreResult<()> {
        let _guard = self.lock()?;
        self.storage.remove(DEMO_MODE_KEY)?;
        self.storage.remove(DEMO_ENTRIES_KEY)
    }

    pub fn count(&self, mood: MoodFilter) -> StoreResult<usize> {
        Ok(self.load()?.iter().filter(|e| mood.matches(e.mood)).count())
    }

    /// Upsert keyed by id or date, whichever matches first.
    pub async fn save(&self, entry: DemoEntry) -> StoreResult<Entry> {
        let changes = EntryChanges {
            date: Some(entry.date),
            content: Some(entry.content.clone()),
            mood: Some(entry.mood),
            ai_comment: entry.ai_comment.clone(),
            paper_diary_image: None,
        };
        store::upsert(
            self,
            MatchRule::IdOrDate,
            NewEntry {
                id: entry.id,
                date: entry.date,
                content: entry.content,
                mood: entry.mood,
                ai_comment: entry.ai_comment,
                paper_diary_image: None,
            },
            changes,
        )
        .await
    }

    /// Attaches an inline image to the entry of `date`, creating a
    /// placeholder entry when that day has none.
    pub async fn attach_paper_diary(
        &self,
        date: NaiveDate,
        mood: Mood,
        data_url: String,
    ) -> StoreResult<Entry> {
        store::upsert(
            self,
            MatchRule::Date,
            NewEntry {
                id: None,
                date,
                content: PAPER_DIARY_PLACEHOLDER.to_string(),
                mood,
                ai_comment: None,
                paper_diary_image: Some(data_url.clone()),
            },
            EntryChanges {
                mood: Some(mood),
                paper_diary_image: Some(data_url),
                ..Default::default()
            },
        )
        .await
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("demo store lock poisoned".into()))
    }

    /// Unreadable data is treated as an empty collection.
    fn load(&self) -> StoreResult<Vec<Entry>> {
        let Some(raw) = self.storage.get(DEMO_ENTRIES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Entry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable demo entries");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, mut entries: Vec<Entry>) -> StoreResult<()> {
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        let raw = serde_json::to_string(&entries).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.storage.set(DEMO_ENTRIES_KEY, &raw)
    }

    fn new_id(&self, date: NaiveDate) -> String {
        format!(
            "demo_{}_{}",
            date.format("%Y-%m-%d"),
            self.clock.now().timestamp_millis()
        )
    }
}

fn first_match<'a>(
    entries: &'a [Entry],
    rule: MatchRule,
    id: Option<&str>,
    date: NaiveDate,
) -> Option<&'a Entry> {
    entries.iter().find(|e| match rule {
        MatchRule::Date => e.date == date,
        MatchRule::IdOrDate => Some(e.id.as_str()) == id || e.date == date,
    })
}

#[async_trait]
impl EntryStore for LocalMirrorStore {
    async fn list(&self, page: &Page) -> StoreResult<Vec<Entry>> {
        Ok(paginate(&self.load()?, page))
    }

    async fn moods_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<MoodMark>> {
        let mut marks: Vec<MoodMark> = self
            .load()?
            .into_iter()
            .filter(|e| e.date >= from && e.date <= to)
            .map(|e| MoodMark {
                date: e.date,
                mood: e.mood,
            })
            .collect();
        marks.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(marks)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>> {
        Ok(self.load()?.into_iter().find(|e| e.id == id))
    }

    async fn find_match(
        &self,
        rule: MatchRule,
        id: Option<&str>,
        date: NaiveDate,
    ) -> StoreResult<Option<Entry>> {
        Ok(first_match(&self.load()?, rule, id, date).cloned())
    }

    async fn insert(&self, entry: NewEntry) -> StoreResult<Option<Entry>> {
        let _guard = self.lock()?;
        let mut entries = self.load()?;
        if entries.iter().any(|e| e.date == entry.date) {
            return Ok(None);
        }

        let created = Entry {
            id: entry.id.unwrap_or_else(|| self.new_id(entry.date)),
            user_id: None,
            date: entry.date,
            content: entry.content,
            mood: entry.mood,
            ai_comment: entry.ai_comment,
            paper_diary_image: entry.paper_diary_image,
            created_at: None,
            updated_at: None,
        };
        entries.push(created.clone());
        self.persist(entries)?;
        Ok(Some(created))
    }

    async fn update(&self, id: &str, changes: &EntryChanges) -> StoreResult<Entry> {
        let _guard = self.lock()?;
        let mut entries = self.load()?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| StoreError::Vanished(id.to_string()))?;
        changes.apply(entry);
        let updated = entry.clone();
        self.persist(entries)?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock()?;
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.persist(entries)?;
        Ok(true)
    }
}
