//! # MoodLog: Request/Response DTOs
//!
//! Conventions:
//! - `*Query` / `*Form` → deserialized from the query string or form body
//! - `*Response` → serialized to client JSON
//! - Range checks are expressed via `validator` derive macros

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::entry::{Entry, Mood, MoodFilter, Page};
use crate::service::{DemoDraft, ImageCleanup};

// ============================================================================
// Entries
// ============================================================================

/// GET /api/entries
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListEntriesQuery {
    #[serde(default)]
    pub offset: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    #[serde(default)]
    pub limit: Option<u32>,

    /// A mood label, or `all`.
    #[serde(default)]
    pub mood: Option<String>,
}

impl ListEntriesQuery {
    pub fn into_page(self) -> AppResult<Page> {
        self.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let defaults = Page::default();
        Ok(Page {
            offset: self.offset.unwrap_or(defaults.offset),
            limit: self.limit.unwrap_or(defaults.limit),
            mood: MoodFilter::parse(self.mood.as_deref())?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<Entry>,
}

/// POST /api/entries, sent either urlencoded or as multipart form data.
#[derive(Debug, Default, Deserialize)]
pub struct SaveEntryForm {
    pub content: Option<String>,
    pub mood: Option<String>,
}

impl SaveEntryForm {
    pub fn into_parts(self) -> AppResult<(String, Mood)> {
        let (Some(content), Some(mood)) = (self.content, self.mood) else {
            return Err(AppError::Validation("Content and mood are required".into()));
        };
        Ok((content, mood.trim().parse()?))
    }
}

#[async_trait]
impl<S> FromRequest<S> for SaveEntryForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Form(form) = Form::<SaveEntryForm>::from_request(req, state).await?;
            return Ok(form);
        }

        let multipart = Multipart::from_request(req, state).await?;
        let mut fields = text_fields(multipart).await?;
        Ok(SaveEntryForm {
            content: fields.remove("content"),
            mood: fields.remove("mood"),
        })
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn text_fields(mut multipart: Multipart) -> AppResult<HashMap<String, String>> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SaveEntryResponse {
    Saved {
        success: bool,
        entry: Entry,
    },
    /// Demo sessions keep the entry themselves.
    Draft {
        success: bool,
        #[serde(flatten)]
        draft: DemoDraft,
    },
}

#[derive(Debug, Serialize)]
pub struct DeleteEntryResponse {
    pub success: bool,
    pub id: String,
    pub image_cleanup: ImageCleanup,
}

// ============================================================================
// Paper diary
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PaperDiaryResponse {
    pub success: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub entry: Entry,
}

/// Raw multipart fields of POST /api/paper-diary.
#[derive(Debug, Default)]
pub struct PaperDiaryForm {
    pub date: Option<String>,
    pub mood: Option<String>,
    pub image: Option<ImagePart>,
}

#[derive(Debug)]
pub struct ImagePart {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PaperDiaryForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = PaperDiaryForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            match field.name() {
                Some("date") => form.date = Some(read_text(field).await?),
                Some("mood") => form.mood = Some(read_text(field).await?),
                Some("image") => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    form.image = Some(ImagePart {
                        bytes: bytes.to_vec(),
                        content_type,
                    });
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))
}
