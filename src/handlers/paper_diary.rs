use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::auth::middleware::SessionMode;
use crate::dto::{PaperDiaryForm, PaperDiaryResponse};
use crate::error::{AppError, AppResult};
use crate::models::entry::{parse_date, Mood};
use crate::upload::{PaperDiaryUpload, UploadError};
use crate::AppState;

pub async fn upload_paper_diary(
    State(state): State<AppState>,
    Extension(session): Extension<SessionMode>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> AppResult<Json<PaperDiaryResponse>> {
    let user = session.user()?;
    let form = PaperDiaryForm::read(multipart).await?;

    let (Some(date), Some(image)) = (form.date, form.image) else {
        return Err(AppError::Validation("A date and an image file are required".into()));
    };
    let date = parse_date(&date)?;
    let mood = match form.mood.as_deref().map(str::trim) {
        None | Some("") => Mood::default(),
        Some(raw) => raw.parse()?,
    };
    if image.bytes.is_empty() {
        return Err(UploadError::Missing.into());
    }

    let stored = state
        .entries
        .upload_paper_diary(
            user.id,
            PaperDiaryUpload {
                date,
                mood,
                bytes: image.bytes,
                mime_type: image.content_type,
            },
        )
        .await?;

    Ok(Json(PaperDiaryResponse {
        success: true,
        image_url: stored.image_url,
        entry: stored.entry,
    }))
}
