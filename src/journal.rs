//! Client-side entry point that routes every operation to the server or to
//! the local demo mirror depending on the current session.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::middleware::{AuthUser, SessionMode};
use crate::error::{AppError, AppResult};
use crate::mirror::{DemoEntry, LocalMirrorStore};
use crate::models::entry::{validate_content, Entry, Mood, Page};
use crate::service::{self, DeleteOutcome, EntryService, ImageCleanup, Overview};
use crate::store::EntryStore;
use crate::upload::{self, PaperDiaryUpload};

pub struct Journal {
    service: EntryService,
    mirror: Arc<LocalMirrorStore>,
    session: Option<AuthUser>,
}

/// Result of a paper diary upload in either mode. Demo uploads carry the
/// image inline as a data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperDiary {
    pub entry: Entry,
    pub image_url: String,
}

impl Journal {
    pub fn new(service: EntryService, mirror: Arc<LocalMirrorStore>) -> Self {
        Self {
            service,
            mirror,
            session: None,
        }
    }

    pub fn mode(&self) -> SessionMode {
        SessionMode::resolve(self.session.clone(), self.mirror.is_enabled())
    }

    pub fn start_demo(&self) -> AppResult<()> {
        self.mirror.enable()?;
        tracing::info!("Demo mode started");
        Ok(())
    }

    /// Signing in drops every demo entry; nothing is migrated to the account.
    pub fn sign_in(&mut self, user: AuthUser) -> AppResult<()> {
        self.mirror.discard()?;
        tracing::info!(user_id = %user.id, "Discarded demo entries on sign-in");
        self.session = Some(user);
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.session = None;
    }

    pub async fn save(&self, content: &str, mood: Mood) -> AppResult<Entry> {
        match self.mode() {
            SessionMode::Authenticated(user) => self.service.save_today(user.id, content, mood).await,
            SessionMode::Demo => {
                let content = validate_content(content)?;
                let ai_comment = self.service.comments().comment(&content, mood).await;
                let entry = self
                    .mirror
                    .save(DemoEntry {
                        id: None,
                        date: self.service.clock().today(),
                        content,
                        mood,
                        ai_comment: Some(ai_comment),
                    })
                    .await?;
                Ok(entry)
            }
            SessionMode::Anonymous => Err(AppError::Unauthorized),
        }
    }

    pub async fn list(&self, page: &Page) -> AppResult<Vec<Entry>> {
        match self.mode() {
            SessionMode::Authenticated(user) => self.service.list(user.id, page).await,
            SessionMode::Demo => Ok(self.mirror.list(page).await?),
            SessionMode::Anonymous => Err(AppError::Unauthorized),
        }
    }

    pub async fn delete(&self, entry_id: &str) -> AppResult<DeleteOutcome> {
        match self.mode() {
            SessionMode::Authenticated(user) => self.service.delete(user.id, entry_id).await,
            SessionMode::Demo => {
                let entry = self
                    .mirror
                    .get(entry_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Entry not found".into()))?;
                self.mirror.delete(&entry.id).await?;
                // Demo images live inside the entry and go with it.
                let image_cleanup = match entry.paper_diary_image {
                    Some(_) => ImageCleanup::Removed,
                    None => ImageCleanup::NoImage,
                };
                Ok(DeleteOutcome {
                    id: entry.id,
                    image_cleanup,
                })
            }
            SessionMode::Anonymous => Err(AppError::Unauthorized),
        }
    }

    pub async fn upload_paper_diary(&self, upload: PaperDiaryUpload) -> AppResult<PaperDiary> {
        match self.mode() {
            SessionMode::Authenticated(user) => {
                let stored = self.service.upload_paper_diary(user.id, upload).await?;
                Ok(PaperDiary {
                    entry: stored.entry,
                    image_url: stored.image_url,
                })
            }
            SessionMode::Demo => {
                upload.validate()?;
                let PaperDiaryUpload { date, mood, bytes, .. } = upload;
                let jpeg = upload::normalize_off_runtime(bytes).await?;
                let image_url = upload::jpeg_data_url(&jpeg);
                let entry = self
                    .mirror
                    .attach_paper_diary(date, mood, image_url.clone())
                    .await?;
                Ok(PaperDiary { entry, image_url })
            }
            SessionMode::Anonymous => Err(AppError::Unauthorized),
        }
    }

    pub async fn overview(&self) -> AppResult<Overview> {
        match self.mode() {
            SessionMode::Authenticated(user) => self.service.overview(user.id).await,
            SessionMode::Demo => {
                service::overview_of(self.mirror.as_ref(), self.service.clock().today()).await
            }
            SessionMode::Anonymous => Err(AppError::Unauthorized),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|u| u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobError, BlobStore};
    use crate::clock::FixedClock;
    use crate::comment::{FallbackCommenter, FALLBACK_COMMENT};
    use crate::mirror::MemoryStorage;
    use crate::store::{EntryRepository, StoreResult};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct NoServer;

    #[async_trait]
    impl EntryRepository for NoServer {
        fn for_user(&self, _user_id: Uuid) -> Box<dyn EntryStore> {
            unreachable!("demo tests never reach the server")
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    struct NoBlobs;

    #[async_trait]
    impl BlobStore for NoBlobs {
        async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), BlobError> {
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://blobs.test/{path}")
        }

        async fn remove(&self, _: &str) -> Result<(), BlobError> {
            Ok(())
        }
    }

    fn journal() -> Journal {
        journal_on(Arc::new(MemoryStorage::new()))
    }

    fn journal_on(storage: Arc<MemoryStorage>) -> Journal {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 16, 0, 0).unwrap(),
        ));
        let service = EntryService::new(
            Arc::new(NoServer),
            Arc::new(NoBlobs),
            Arc::new(FallbackCommenter),
            clock.clone(),
        );
        let mirror = Arc::new(LocalMirrorStore::new(storage, clock));
        Journal::new(service, mirror)
    }

    #[tokio::test]
    async fn test_anonymous_is_rejected() {
        let journal = journal();
        assert_eq!(journal.mode(), SessionMode::Anonymous);
        assert!(matches!(
            journal.save("hello", Mood::Happy).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            journal.list(&Page::default()).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_demo_save_uses_reference_day() {
        let journal = journal();
        journal.start_demo().unwrap();

        // 16:00 UTC is already the next day at UTC+9.
        let entry = journal.save("late night", Mood::Sad).await.unwrap();
        assert_eq!(entry.date.to_string(), "2024-06-11");
        assert_eq!(entry.ai_comment.as_deref(), Some(FALLBACK_COMMENT));

        let overview = journal.overview().await.unwrap();
        assert_eq!(overview.today.map(|e| e.id), Some(entry.id));
        assert_eq!(overview.recent.len(), 1);
    }

    #[tokio::test]
    async fn test_demo_rejects_blank_content() {
        let journal = journal();
        journal.start_demo().unwrap();
        assert!(matches!(
            journal.save("   ", Mood::Happy).await,
            Err(AppError::Validation(_))
        ));
        assert!(journal.list(&Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_demo_delete_missing_entry() {
        let journal = journal();
        journal.start_demo().unwrap();
        assert!(matches!(
            journal.delete("demo_nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_discards_demo_entries() {
        let mut journal = journal();
        journal.start_demo().unwrap();
        journal.save("trying it out", Mood::Happy).await.unwrap();

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
        };
        journal.sign_in(user.clone()).unwrap();
        assert_eq!(journal.mode(), SessionMode::Authenticated(user));

        journal.sign_out();
        assert_eq!(journal.mode(), SessionMode::Anonymous);
    }

    #[tokio::test]
    async fn test_sign_in_clears_leftover_entries_without_marker() {
        use crate::mirror::{LocalStorage, DEMO_ENTRIES_KEY};

        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(DEMO_ENTRIES_KEY, r#"[{"id":"demo_old","date":"2024-06-01","content":"x","mood":"sad"}]"#)
            .unwrap();
        let mut journal = journal_on(storage.clone());
        assert_eq!(journal.mode(), SessionMode::Anonymous);

        journal
            .sign_in(AuthUser {
                id: Uuid::new_v4(),
                email: None,
            })
            .unwrap();
        assert_eq!(storage.get(DEMO_ENTRIES_KEY).unwrap(), None);
    }
}
