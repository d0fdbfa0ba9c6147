use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

/// Every operation outcome the app surfaces to a caller. Display strings are
/// the user-facing messages shown by the client.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("You must be logged in")]
    NotAuthenticated,

    #[error("Only administrators can manage the catalog")]
    Forbidden,

    #[error("Book not found")]
    NotFound,

    #[error("You can only borrow one book at a time")]
    AlreadyBorrowing,

    #[error("This book is already borrowed")]
    AlreadyBorrowed,

    #[error("You can only return books that you have borrowed")]
    NotOwner,

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl From<StoreError> for LibraryError {
    fn from(err: StoreError) -> Self {
        LibraryError::Backend(err.into())
    }
}

impl IntoResponse for LibraryError {
    fn into_response(self) -> Response {
        let status = match self {
            LibraryError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            LibraryError::Forbidden => StatusCode::FORBIDDEN,
            LibraryError::NotFound => StatusCode::NOT_FOUND,
            LibraryError::AlreadyBorrowing
            | LibraryError::AlreadyBorrowed
            | LibraryError::NotOwner => StatusCode::CONFLICT,
            LibraryError::Validation { .. } => StatusCode::BAD_REQUEST,
            LibraryError::Backend { .. } => StatusCode::BAD_GATEWAY,
        };

        (status, self.to_string()).into_response()
    }
}
