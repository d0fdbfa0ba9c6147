//! Documentation of a library book lending service.
//!
//!
//!
//! # General Infrastructure
//! - Thin HTTP service over two hosted collaborators: the identity provider
//!   (accounts, sessions) and the document store (catalog data)
//! - No storage, no custom auth: every request is a handful of REST calls
//!   against those two backends
//! - Frontend talks to this server only; the API key never reaches clients
//!
//!
//!
//! # Collections
//!
//! - `books`: one document per catalog item. `userId`/`borrowedBy` carry the
//!   current borrower and are null together when the book is available
//! - `books/{id}/bookHistory`: append-only borrow log, one entry per borrow
//!   with a store-assigned timestamp, listed newest first
//! - `users`: one profile per account with `email` and `role`; written once
//!   at registration, role defaults to `user`
//!
//!
//!
//! # Notes
//!
//! ## Why no transaction wrapper
//! The borrow sequence is check-then-act across several reads and writes.
//! The store only gives us single-document writes, so two sessions can both
//! pass the checks before either write lands; the book document then carries
//! whichever write landed last. Accepted for a catalog of this size.
//! Closing the window would take a lease collection or a conditional write
//! the store does not expose through this client.
//!
//! ## Role checks
//! `role` gates catalog changes on the server, not in the client. A profile
//! with anything other than `admin` in `role` (any case) is a plain user.
use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod catalog;
pub mod config;
pub mod error;
pub mod firestore;
pub mod identity;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(test)]
pub mod testutil;

use routes::{
    add_book_handler, all_books_handler, books_handler, borrow_handler, delete_book_handler,
    history_handler, login_handler, register_handler, return_handler,
};
use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new();

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/books", get(books_handler).post(add_book_handler))
        .route("/books/all", get(all_books_handler))
        .route("/books/:id", delete(delete_book_handler))
        .route("/books/:id/borrow", post(borrow_handler))
        .route("/books/:id/return", post(return_handler))
        .route("/books/:id/history", get(history_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
