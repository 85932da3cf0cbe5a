use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::auth::jwt::verify_token;
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Cookie set by the client while a visitor is trying the app without login.
pub const DEMO_MODE_COOKIE: &str = "moodlog_demo_mode";

#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Which store a request may use. A valid session always wins over the
/// demo marker; without either, the visitor is anonymous.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    Authenticated(AuthUser),
    Demo,
    Anonymous,
}

impl SessionMode {
    pub fn resolve(user: Option<AuthUser>, demo_marker: bool) -> Self {
        match (user, demo_marker) {
            (Some(user), _) => SessionMode::Authenticated(user),
            (None, true) => SessionMode::Demo,
            (None, false) => SessionMode::Anonymous,
        }
    }

    pub fn user(&self) -> AppResult<&AuthUser> {
        match self {
            SessionMode::Authenticated(user) => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }
}

pub async fn resolve_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    // An invalid or expired token counts as no session at all.
    let user = bearer.and_then(|TypedHeader(Authorization(bearer))| {
        match verify_token(bearer.token(), &state.config.jwt_secret) {
            Ok(data) => Some(AuthUser {
                id: data.claims.sub,
                email: data.claims.email.filter(|e| !e.is_empty()),
            }),
            Err(_) => {
                tracing::debug!("Ignoring invalid session token");
                None
            }
        }
    });

    let demo_marker = jar
        .get(DEMO_MODE_COOKIE)
        .is_some_and(|c| c.value() == "true");

    req.extensions_mut()
        .insert(SessionMode::resolve(user, demo_marker));
    next.run(req).await
}
