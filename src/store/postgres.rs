use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{EntryRepository, EntryStore, MatchRule, StoreError, StoreResult};
use crate::models::entry::{Entry, EntryChanges, MoodMark, NewEntry, Page};

const ENTRY_COLUMNS: &str = "id::text AS id, user_id, date, content, mood, ai_comment, \
                             paper_diary_image, created_at, updated_at";

#[derive(Clone)]
pub struct PgEntryRepository {
    db: PgPool,
}

impl PgEntryRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    fn for_user(&self, user_id: Uuid) -> Box<dyn EntryStore> {
        Box::new(PgEntryStore::new(self.db.clone(), user_id))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}

/// `entries` rows belonging to one user.
#[derive(Clone)]
pub struct PgEntryStore {
    db: PgPool,
    user_id: Uuid,
}

impl PgEntryStore {
    pub fn new(db: PgPool, user_id: Uuid) -> Self {
        Self { db, user_id }
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn list(&self, page: &Page) -> StoreResult<Vec<Entry>> {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM entries
            WHERE user_id = $1 AND ($2::mood IS NULL OR mood = $2)
            ORDER BY date DESC
            OFFSET $3 LIMIT $4
            "#
        );
        let entries = sqlx::query_as::<_, Entry>(&sql)
            .bind(self.user_id)
            .bind(page.mood.mood())
            .bind(i64::from(page.offset))
            .bind(i64::from(page.limit))
            .fetch_all(&self.db)
            .await?;
        Ok(entries)
    }

    async fn moods_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<MoodMark>> {
        let marks = sqlx::query_as::<_, MoodMark>(
            r#"
            SELECT date, mood FROM entries
            WHERE user_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(self.user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(marks)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>> {
        // Ids that are not UUIDs cannot name a row here.
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1 AND user_id = $2");
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(id)
            .bind(self.user_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(entry)
    }

    async fn find_match(
        &self,
        rule: MatchRule,
        id: Option<&str>,
        date: NaiveDate,
    ) -> StoreResult<Option<Entry>> {
        let entry = match rule {
            MatchRule::Date => {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries WHERE user_id = $1 AND date = $2"
                );
                sqlx::query_as::<_, Entry>(&sql)
                    .bind(self.user_id)
                    .bind(date)
                    .fetch_optional(&self.db)
                    .await?
            }
            MatchRule::IdOrDate => {
                let id = id.and_then(|raw| Uuid::parse_str(raw).ok());
                let sql = format!(
                    r#"
                    SELECT {ENTRY_COLUMNS} FROM entries
                    WHERE user_id = $1 AND (id = $2 OR date = $3)
                    ORDER BY date DESC
                    LIMIT 1
                    "#
                );
                sqlx::query_as::<_, Entry>(&sql)
                    .bind(self.user_id)
                    .bind(id)
                    .bind(date)
                    .fetch_optional(&self.db)
                    .await?
            }
        };
        Ok(entry)
    }

    async fn insert(&self, entry: NewEntry) -> StoreResult<Option<Entry>> {
        let sql = format!(
            r#"
            INSERT INTO entries (user_id, date, content, mood, ai_comment, paper_diary_image)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, date) DO NOTHING
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Entry>(&sql)
            .bind(self.user_id)
            .bind(entry.date)
            .bind(&entry.content)
            .bind(entry.mood)
            .bind(&entry.ai_comment)
            .bind(&entry.paper_diary_image)
            .fetch_optional(&self.db)
            .await?;
        Ok(created)
    }

    async fn update(&self, id: &str, changes: &EntryChanges) -> StoreResult<Entry> {
        let uuid = Uuid::parse_str(id).map_err(|_| StoreError::Vanished(id.to_string()))?;
        let sql = format!(
            r#"
            UPDATE entries SET
                content = COALESCE($3, content),
                mood = COALESCE($4, mood),
                ai_comment = COALESCE($5, ai_comment),
                paper_diary_image = COALESCE($6, paper_diary_image),
                date = COALESCE($7, date),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Entry>(&sql)
            .bind(uuid)
            .bind(self.user_id)
            .bind(&changes.content)
            .bind(changes.mood)
            .bind(&changes.ai_comment)
            .bind(&changes.paper_diary_image)
            .bind(changes.date)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| StoreError::Vanished(id.to_string()))
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND user_id = $2")
            .bind(uuid)
            .bind(self.user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
