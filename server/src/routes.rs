use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::LibraryError,
    identity::{Caller, IdentityError, Session},
    models::{Book, HistoryEntry, NewBook},
    state::State as AppState,
};

type App = Arc<AppState>;

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email,
            token: session.id_token,
        }
    }
}

pub async fn register_handler(
    State(app): State<App>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>, LibraryError> {
    crate::identity::validate_password(&credentials.password)?;

    let session = app
        .identity
        .sign_up(&credentials.email, &credentials.password)
        .await
        .map_err(rejected_to_validation)?;
    app.catalog
        .create_profile(&session.user_id, &session.email)
        .await?;

    info!("Registered {}", session.email);

    Ok(Json(session.into()))
}

pub async fn login_handler(
    State(app): State<App>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>, LibraryError> {
    let session = app
        .identity
        .sign_in(&credentials.email, &credentials.password)
        .await
        .map_err(rejected_to_validation)?;

    Ok(Json(session.into()))
}

pub async fn books_handler(State(app): State<App>) -> Result<Json<Vec<Book>>, LibraryError> {
    Ok(Json(app.catalog.list_available().await?))
}

pub async fn all_books_handler(State(app): State<App>) -> Result<Json<Vec<Book>>, LibraryError> {
    Ok(Json(app.catalog.list_all().await?))
}

pub async fn add_book_handler(
    State(app): State<App>,
    headers: HeaderMap,
    Json(book): Json<NewBook>,
) -> Result<Json<Book>, LibraryError> {
    let caller = authenticate(&app, &headers).await?;

    Ok(Json(app.catalog.add_book(&caller.id, book).await?))
}

pub async fn delete_book_handler(
    State(app): State<App>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, LibraryError> {
    let caller = authenticate(&app, &headers).await?;
    app.catalog.delete_book(&caller.id, &book_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn borrow_handler(
    State(app): State<App>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Book>, LibraryError> {
    let caller = authenticate(&app, &headers).await?;

    Ok(Json(
        app.catalog
            .borrow(&caller.id, &caller.email, &book_id)
            .await?,
    ))
}

pub async fn return_handler(
    State(app): State<App>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Book>, LibraryError> {
    let caller = authenticate(&app, &headers).await?;

    Ok(Json(app.catalog.return_book(&caller.id, &book_id).await?))
}

pub async fn history_handler(
    State(app): State<App>,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, LibraryError> {
    Ok(Json(app.catalog.list_history(&book_id).await?))
}

/// Resolves the bearer token to the calling identity, once per request; the
/// catalog itself never reads ambient session state.
async fn authenticate(app: &App, headers: &HeaderMap) -> Result<Caller, LibraryError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(LibraryError::NotAuthenticated)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(LibraryError::NotAuthenticated)?;

    app.identity.lookup(token).await.map_err(|err| match err {
        IdentityError::Rejected(_) => LibraryError::NotAuthenticated,
        IdentityError::Transport(err) => LibraryError::Backend(err),
    })
}

/// Credential failures surface the provider's own message, as the client
/// displays it verbatim.
fn rejected_to_validation(err: IdentityError) -> LibraryError {
    match err {
        IdentityError::Rejected(message) => LibraryError::Validation(message),
        IdentityError::Transport(err) => LibraryError::Backend(err),
    }
}
