#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use uuid::Uuid;

use moodlog_api::auth::jwt::Claims;
use moodlog_api::auth::rate_limit::RateLimitState;
use moodlog_api::blob::{BlobError, BlobStore};
use moodlog_api::clock::FixedClock;
use moodlog_api::comment::CommentGenerator;
use moodlog_api::config::Config;
use moodlog_api::models::entry::{Entry, EntryChanges, Mood, MoodMark, NewEntry, Page};
use moodlog_api::service::EntryService;
use moodlog_api::store::{paginate, EntryRepository, EntryStore, MatchRule, StoreResult};
use moodlog_api::{router, AppState};

pub const JWT_SECRET: &str = "test-secret";
pub const STUB_COMMENT: &str = "sounds like a day";

/// 2024-06-10 12:00 at UTC+9.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 3, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

// ============================================================================
// Fakes
// ============================================================================

/// Entries of every user in one vector, like a single table.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    rows: Arc<Mutex<Vec<Entry>>>,
}

impl MemoryRepository {
    pub fn rows_of(&self, user_id: Uuid) -> Vec<Entry> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .cloned()
            .collect()
    }

    pub fn total(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl EntryRepository for MemoryRepository {
    fn for_user(&self, user_id: Uuid) -> Box<dyn EntryStore> {
        Box::new(MemoryUserStore {
            rows: self.rows.clone(),
            user_id,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct MemoryUserStore {
    rows: Arc<Mutex<Vec<Entry>>>,
    user_id: Uuid,
}

impl MemoryUserStore {
    fn owned(&self) -> Vec<Entry> {
        let mut owned: Vec<Entry> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == Some(self.user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.date.cmp(&a.date));
        owned
    }
}

#[async_trait]
impl EntryStore for MemoryUserStore {
    async fn list(&self, page: &Page) -> StoreResult<Vec<Entry>> {
        Ok(paginate(&self.owned(), page))
    }

    async fn moods_between(&self, from: NaiveDate, to: NaiveDate) -> StoreResult<Vec<MoodMark>> {
        let mut marks: Vec<MoodMark> = self
            .owned()
            .into_iter()
            .filter(|e| e.date >= from && e.date <= to)
            .map(|e| MoodMark {
                date: e.date,
                mood: e.mood,
            })
            .collect();
        marks.reverse();
        Ok(marks)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Entry>> {
        Ok(self.owned().into_iter().find(|e| e.id == id))
    }

    async fn find_match(
        &self,
        _rule: MatchRule,
        _id: Option<&str>,
        date: NaiveDate,
    ) -> StoreResult<Option<Entry>> {
        Ok(self.owned().into_iter().find(|e| e.date == date))
    }

    async fn insert(&self, entry: NewEntry) -> StoreResult<Option<Entry>> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|e| e.user_id == Some(self.user_id) && e.date == entry.date)
        {
            return Ok(None);
        }
        let created = Entry {
            id: Uuid::new_v4().to_string(),
            user_id: Some(self.user_id),
            date: entry.date,
            content: entry.content,
            mood: entry.mood,
            ai_comment: entry.ai_comment,
            paper_diary_image: entry.paper_diary_image,
            created_at: Some(fixed_now()),
            updated_at: Some(fixed_now()),
        };
        rows.push(created.clone());
        Ok(Some(created))
    }

    async fn update(&self, id: &str, changes: &EntryChanges) -> StoreResult<Entry> {
        let mut rows = self.rows.lock().unwrap();
        let entry = rows
            .iter_mut()
            .find(|e| e.id == id && e.user_id == Some(self.user_id))
            .ok_or_else(|| moodlog_api::store::StoreError::Vanished(id.to_string()))?;
        changes.apply(entry);
        Ok(entry.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|e| !(e.id == id && e.user_id == Some(self.user_id)));
        Ok(rows.len() != before)
    }
}

/// Records every call so tests can check ordering.
#[derive(Clone, Default)]
pub struct MemoryBlobs {
    pub objects: Arc<Mutex<Vec<String>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_remove: bool,
}

impl MemoryBlobs {
    pub fn failing_remove() -> Self {
        Self {
            fail_remove: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<(), BlobError> {
        self.calls.lock().unwrap().push(format!("put {path}"));
        self.objects.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/object/public/paper-diaries/{path}")
    }

    async fn remove(&self, path: &str) -> Result<(), BlobError> {
        self.calls.lock().unwrap().push(format!("remove {path}"));
        if self.fail_remove {
            return Err(BlobError::Transport("connection reset".into()));
        }
        self.objects.lock().unwrap().retain(|p| p != path);
        Ok(())
    }
}

pub struct StubCommenter;

#[async_trait]
impl CommentGenerator for StubCommenter {
    async fn comment(&self, _content: &str, _mood: Mood) -> String {
        STUB_COMMENT.to_string()
    }
}

// ============================================================================
// App wiring
// ============================================================================

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        host: "127.0.0.1".into(),
        port: 0,
        frontend_url: "http://localhost:3000".into(),
        jwt_secret: JWT_SECRET.into(),
        claude_api_key: String::new(),
        claude_model: "test-model".into(),
        claude_base_url: "http://localhost".into(),
        storage_url: "https://storage.test".into(),
        storage_service_key: String::new(),
        storage_bucket: "paper-diaries".into(),
        reference_utc_offset_hours: 9,
        demo_comments_per_hour: 20,
    }
}

pub fn entry_service(repo: &MemoryRepository, blobs: &MemoryBlobs) -> EntryService {
    EntryService::new(
        Arc::new(repo.clone()),
        Arc::new(blobs.clone()),
        Arc::new(StubCommenter),
        Arc::new(FixedClock::new(fixed_now())),
    )
}

pub struct TestApp {
    pub router: Router,
    pub repo: MemoryRepository,
    pub blobs: MemoryBlobs,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_blobs(MemoryBlobs::default())
    }

    pub fn with_blobs(blobs: MemoryBlobs) -> Self {
        Self::build(blobs, test_config())
    }

    pub fn build(blobs: MemoryBlobs, config: Config) -> Self {
        let repo = MemoryRepository::default();
        let state = AppState {
            config: Arc::new(config),
            entries: entry_service(&repo, &blobs),
            rate_limiter: RateLimitState::new(),
        };
        Self {
            router: router(state),
            repo,
            blobs,
        }
    }
}

pub fn token_for(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id,
        email: Some("writer@example.com".into()),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
        iat: Some(Utc::now().timestamp()),
        role: Some("authenticated".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn form_request(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::delete(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "moodlog-test-boundary";

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        content_type: &'a str,
        bytes: Vec<u8>,
    },
}

pub fn multipart_request(uri: &str, token: Option<&str>, parts: Vec<Part<'_>>) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"scan\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 140, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
    out.into_inner()
}
