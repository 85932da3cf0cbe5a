use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    Extension, Json,
};
use axum_extra::extract::WithRejection;

use crate::auth::middleware::SessionMode;
use crate::dto::{DeleteEntryResponse, EntriesResponse, ListEntriesQuery, SaveEntryForm, SaveEntryResponse};
use crate::error::{AppError, AppResult};
use crate::service::Overview;
use crate::AppState;

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(session): Extension<SessionMode>,
    WithRejection(Query(query), _): WithRejection<Query<ListEntriesQuery>, AppError>,
) -> AppResult<Json<EntriesResponse>> {
    let user = session.user()?;
    let page = query.into_page()?;
    let entries = state.entries.list(user.id, &page).await?;
    Ok(Json(EntriesResponse { entries }))
}

/// Saves today's entry. Demo sessions get the validated entry and its
/// comment back without anything being stored on the server.
pub async fn save_entry(
    State(state): State<AppState>,
    Extension(session): Extension<SessionMode>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    form: SaveEntryForm,
) -> AppResult<Json<SaveEntryResponse>> {
    match session {
        SessionMode::Authenticated(user) => {
            let (content, mood) = form.into_parts()?;
            let entry = state.entries.save_today(user.id, &content, mood).await?;
            Ok(Json(SaveEntryResponse::Saved {
                success: true,
                entry,
            }))
        }
        SessionMode::Demo => {
            let (content, mood) = form.into_parts()?;
            state
                .rate_limiter
                .check_demo_comment(
                    connect_info.map(|ConnectInfo(addr)| addr),
                    state.config.demo_comments_per_hour,
                )
                .await?;
            let draft = state.entries.draft_demo_entry(&content, mood).await?;
            Ok(Json(SaveEntryResponse::Draft {
                success: true,
                draft,
            }))
        }
        SessionMode::Anonymous => Err(AppError::Unauthorized),
    }
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(session): Extension<SessionMode>,
    WithRejection(Path(entry_id), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<DeleteEntryResponse>> {
    let user = session.user()?;
    if entry_id.trim().is_empty() {
        return Err(AppError::Validation("Entry ID is required".into()));
    }
    let outcome = state.entries.delete(user.id, &entry_id).await?;
    Ok(Json(DeleteEntryResponse {
        success: true,
        id: outcome.id,
        image_cleanup: outcome.image_cleanup,
    }))
}

/// Today's entry plus the weekly mood trend.
pub async fn overview(
    State(state): State<AppState>,
    Extension(session): Extension<SessionMode>,
) -> AppResult<Json<Overview>> {
    let user = session.user()?;
    Ok(Json(state.entries.overview(user.id).await?))
}
