//! Diary entries of signed-in users.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::clock::Clock;
use crate::comment::CommentGenerator;
use crate::error::{AppError, AppResult};
use crate::models::entry::{
    validate_content, Entry, EntryChanges, Mood, MoodMark, NewEntry, Page,
    PAPER_DIARY_PLACEHOLDER,
};
use crate::store::{self, EntryRepository, EntryStore, MatchRule};
use crate::upload::{self, PaperDiaryUpload};

/// Days shown in the mood trend, today included.
pub const TREND_DAYS: i64 = 7;

#[derive(Clone)]
pub struct EntryService {
    entries: Arc<dyn EntryRepository>,
    blobs: Arc<dyn BlobStore>,
    comments: Arc<dyn CommentGenerator>,
    clock: Arc<dyn Clock>,
}

/// What happened to the stored image while deleting an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCleanup {
    NoImage,
    Removed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub image_cleanup: ImageCleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub date: NaiveDate,
    pub today: Option<Entry>,
    pub recent: Vec<MoodMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPaperDiary {
    pub entry: Entry,
    pub image_url: String,
}

/// A validated, commented entry that is not persisted on the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoDraft {
    pub date: NaiveDate,
    pub content: String,
    pub mood: Mood,
    pub ai_comment: String,
}

impl EntryService {
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        blobs: Arc<dyn BlobStore>,
        comments: Arc<dyn CommentGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries,
            blobs,
            comments,
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn comments(&self) -> &dyn CommentGenerator {
        self.comments.as_ref()
    }

    pub fn repository(&self) -> &dyn EntryRepository {
        self.entries.as_ref()
    }

    fn store(&self, user_id: Uuid) -> Box<dyn EntryStore> {
        self.entries.for_user(user_id)
    }

    pub async fn list(&self, user_id: Uuid, page: &Page) -> AppResult<Vec<Entry>> {
        Ok(self.store(user_id).list(page).await?)
    }

    /// Saves today's entry, replacing the text, mood and comment of an
    /// entry already written today.
    pub async fn save_today(&self, user_id: Uuid, content: &str, mood: Mood) -> AppResult<Entry> {
        let content = validate_content(content)?;
        let date = self.clock.today();
        let ai_comment = self.comments.comment(&content, mood).await;

        let entry = store::upsert(
            self.store(user_id).as_ref(),
            MatchRule::Date,
            NewEntry {
                id: None,
                date,
                content: content.clone(),
                mood,
                ai_comment: Some(ai_comment.clone()),
                paper_diary_image: None,
            },
            EntryChanges {
                content: Some(content),
                mood: Some(mood),
                ai_comment: Some(ai_comment),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(user_id = %user_id, entry_id = %entry.id, %date, "Entry saved");
        Ok(entry)
    }

    /// Validates and comments an entry for a demo session, which keeps its
    /// entries on the client.
    pub async fn draft_demo_entry(&self, content: &str, mood: Mood) -> AppResult<DemoDraft> {
        let content = validate_content(content)?;
        let ai_comment = self.comments.comment(&content, mood).await;
        Ok(DemoDraft {
            date: self.clock.today(),
            content,
            mood,
            ai_comment,
        })
    }

    /// Stores a scanned page and attaches it to the entry of `upload.date`,
    /// creating a placeholder entry when that day has none.
    pub async fn upload_paper_diary(
        &self,
        user_id: Uuid,
        upload: PaperDiaryUpload,
    ) -> AppResult<StoredPaperDiary> {
        upload.validate()?;
        let PaperDiaryUpload { date, mood, bytes, .. } = upload;
        let jpeg = upload::normalize_off_runtime(bytes).await?;

        let path = upload::object_path(user_id, date, self.clock.now());
        self.blobs.put(&path, jpeg, "image/jpeg").await?;
        let image_url = self.blobs.public_url(&path);

        let result = store::upsert(
            self.store(user_id).as_ref(),
            MatchRule::Date,
            NewEntry {
                id: None,
                date,
                content: PAPER_DIARY_PLACEHOLDER.to_string(),
                mood,
                ai_comment: None,
                paper_diary_image: Some(image_url.clone()),
            },
            EntryChanges {
                mood: Some(mood),
                paper_diary_image: Some(image_url.clone()),
                ..Default::default()
            },
        )
        .await;

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                // The object has nothing pointing at it now.
                if let Err(cleanup) = self.blobs.remove(&path).await {
                    tracing::warn!(error = %cleanup, path = %path, "Failed to remove orphaned image");
                }
                return Err(e.into());
            }
        };

        tracing::info!(user_id = %user_id, entry_id = %entry.id, path = %path, "Paper diary stored");
        Ok(StoredPaperDiary { entry, image_url })
    }

    /// Deletes an entry owned by `user_id`. The stored image is removed
    /// first on a best-effort basis; its outcome never blocks the delete.
    pub async fn delete(&self, user_id: Uuid, entry_id: &str) -> AppResult<DeleteOutcome> {
        let store = self.store(user_id);
        let entry = store
            .get(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry not found or not yours".into()))?;

        let image_cleanup = match entry.paper_diary_image.as_deref() {
            None => ImageCleanup::NoImage,
            Some(url) => self.remove_image(user_id, url).await,
        };

        if !store.delete(&entry.id).await? {
            return Err(AppError::NotFound("Entry not found or not yours".into()));
        }

        tracing::info!(user_id = %user_id, entry_id, ?image_cleanup, "Entry deleted");
        Ok(DeleteOutcome {
            id: entry.id,
            image_cleanup,
        })
    }

    async fn remove_image(&self, user_id: Uuid, url: &str) -> ImageCleanup {
        let Some(path) = upload::object_path_from_url(user_id, url) else {
            tracing::warn!(url, "Cannot derive storage path from image URL");
            return ImageCleanup::Failed;
        };
        match self.blobs.remove(&path).await {
            Ok(()) => ImageCleanup::Removed,
            Err(e) => {
                tracing::warn!(error = %e, path = %path, "Image cleanup failed, deleting entry anyway");
                ImageCleanup::Failed
            }
        }
    }

    /// Today's entry and the mood of each of the last seven days.
    pub async fn overview(&self, user_id: Uuid) -> AppResult<Overview> {
        overview_of(self.store(user_id).as_ref(), self.clock.today()).await
    }
}

pub(crate) async fn overview_of(store: &dyn EntryStore, today: NaiveDate) -> AppResult<Overview> {
    let entry = store.find_match(MatchRule::Date, None, today).await?;
    let recent = store
        .moods_between(today - Duration::days(TREND_DAYS - 1), today)
        .await?;
    Ok(Overview {
        date: today,
        today: entry,
        recent,
    })
}
