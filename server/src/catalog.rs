//! # Catalog
//!
//! Borrow/return consistency over the book collection, plus the audit trail.
//!
//! ## Collections
//! - `books`: one document per catalog item (`title`, `author`, `year`,
//!   `userId`, `borrowedBy`).
//! - `books/{id}/bookHistory`: append-only borrow records (`timestamp`,
//!   `borrowedBy`, `borrowedId`), listed newest first.
//! - `users`: profile per registered account (`email`, `role`).
//!
//! ## Consistency
//! Every mutation is a single-document write. The borrow sequence reads
//! before it writes, so two sessions racing for the same book (or one user
//! racing to hold two books) can both pass the checks before either write
//! lands. The store offers no conditional update to close that window; the
//! checks hold within a session, best-effort across sessions.
//!
//! The denormalized `borrowedBy` email is only ever written in the same
//! update as `userId`.

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    error::LibraryError,
    models::{Book, HistoryEntry, NewBook, Role, UserProfile},
    store::{DocumentStore, Fields},
};

const BOOKS: &str = "books";
const USERS: &str = "users";

fn history_collection(book_id: &str) -> String {
    format!("{BOOKS}/{book_id}/bookHistory")
}

pub struct Catalog<S> {
    store: S,
}

impl<S: DocumentStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lends `book_id` to the caller and appends one history entry.
    ///
    /// A user holds at most one book at a time, and a held book cannot be
    /// borrowed again until returned.
    pub async fn borrow(
        &self,
        user_id: &str,
        user_email: &str,
        book_id: &str,
    ) -> Result<Book, LibraryError> {
        let held = self
            .store
            .query(BOOKS, Some(("userId", json!(user_id))), None)
            .await?;
        if !held.is_empty() {
            return Err(LibraryError::AlreadyBorrowing);
        }

        let doc = self
            .store
            .get(BOOKS, book_id)
            .await?
            .ok_or(LibraryError::NotFound)?;
        let book = Book::from_document(doc)?;
        if book.user_id.is_some() {
            return Err(LibraryError::AlreadyBorrowed);
        }

        let mut fields = Fields::new();
        fields.insert("userId".into(), json!(user_id));
        fields.insert("borrowedBy".into(), json!(user_email));
        self.store.update(BOOKS, book_id, fields).await?;

        let mut entry = Fields::new();
        entry.insert("borrowedBy".into(), json!(user_email));
        entry.insert("borrowedId".into(), json!(user_id));
        self.store
            .add(&history_collection(book_id), entry, Some("timestamp"))
            .await?;

        info!("{} borrowed by {user_email}", book.title);

        Ok(Book {
            user_id: Some(user_id.to_string()),
            borrowed_by: Some(user_email.to_string()),
            ..book
        })
    }

    /// Makes the book available again. Only the current borrower may return
    /// it; returns write no history entry.
    pub async fn return_book(&self, user_id: &str, book_id: &str) -> Result<Book, LibraryError> {
        let doc = self
            .store
            .get(BOOKS, book_id)
            .await?
            .ok_or(LibraryError::NotFound)?;
        let book = Book::from_document(doc)?;
        if book.user_id.as_deref() != Some(user_id) {
            return Err(LibraryError::NotOwner);
        }

        let mut fields = Fields::new();
        fields.insert("userId".into(), Value::Null);
        fields.insert("borrowedBy".into(), Value::Null);
        self.store.update(BOOKS, book_id, fields).await?;

        info!("{} returned", book.title);

        Ok(Book {
            user_id: None,
            borrowed_by: None,
            ..book
        })
    }

    pub async fn list_available(&self) -> Result<Vec<Book>, LibraryError> {
        let docs = self
            .store
            .query(BOOKS, Some(("userId", Value::Null)), None)
            .await?;

        docs.into_iter()
            .map(|doc| Book::from_document(doc).map_err(LibraryError::from))
            .collect()
    }

    pub async fn list_all(&self) -> Result<Vec<Book>, LibraryError> {
        let docs = self.store.query(BOOKS, None, None).await?;

        docs.into_iter()
            .map(|doc| Book::from_document(doc).map_err(LibraryError::from))
            .collect()
    }

    /// Borrow records for one book, newest first.
    pub async fn list_history(&self, book_id: &str) -> Result<Vec<HistoryEntry>, LibraryError> {
        let docs = self
            .store
            .query(&history_collection(book_id), None, Some("timestamp"))
            .await?;

        docs.into_iter()
            .map(|doc| HistoryEntry::from_document(doc).map_err(LibraryError::from))
            .collect()
    }

    /// Admin-only. The new book starts available; `borrowedBy` is left
    /// absent until the first borrow.
    pub async fn add_book(&self, caller_id: &str, book: NewBook) -> Result<Book, LibraryError> {
        self.require_admin(caller_id).await?;

        if book.title.is_empty() {
            return Err(LibraryError::Validation("Title is required".into()));
        }
        if book.author.is_empty() {
            return Err(LibraryError::Validation("Author is required".into()));
        }
        let year = book
            .year
            .as_i64()
            .ok_or_else(|| LibraryError::Validation("Year must be an integer".into()))?;

        let mut fields = Fields::new();
        fields.insert("title".into(), json!(book.title));
        fields.insert("author".into(), json!(book.author));
        fields.insert("year".into(), json!(year));
        fields.insert("userId".into(), Value::Null);
        let id = self.store.add(BOOKS, fields, None).await?;

        info!("Added {} ({year})", book.title);

        Ok(Book {
            id,
            title: book.title,
            author: book.author,
            year,
            user_id: None,
            borrowed_by: None,
        })
    }

    /// Admin-only. The history sub-collection is left in place; orphaned
    /// records are acceptable and never displayed once the book is gone.
    pub async fn delete_book(&self, caller_id: &str, book_id: &str) -> Result<(), LibraryError> {
        self.require_admin(caller_id).await?;

        self.store.delete(BOOKS, book_id).await?;

        info!("Deleted book {book_id}");

        Ok(())
    }

    /// Creates the profile document written once at registration.
    pub async fn create_profile(&self, user_id: &str, email: &str) -> Result<(), LibraryError> {
        let mut fields = Fields::new();
        fields.insert("email".into(), json!(email));
        fields.insert("role".into(), json!(Role::User.as_str()));
        self.store.set(USERS, user_id, fields).await?;

        Ok(())
    }

    /// Any lookup failure (missing profile, unreadable role, backend error)
    /// comes back as `None`; callers cannot tell the cases apart.
    pub async fn role_of(&self, user_id: &str) -> Option<Role> {
        let doc = match self.store.get(USERS, user_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                warn!("User document not found for {user_id}");
                return None;
            }
            Err(err) => {
                warn!("Role lookup failed for {user_id}: {err}");
                return None;
            }
        };

        let profile: UserProfile = match serde_json::from_value(Value::Object(doc.fields)) {
            Ok(profile) => profile,
            Err(err) => {
                warn!("Malformed user document for {user_id}: {err}");
                return None;
            }
        };

        Role::parse(&profile.role)
    }

    async fn require_admin(&self, user_id: &str) -> Result<(), LibraryError> {
        match self.role_of(user_id).await {
            Some(Role::Admin) => Ok(()),
            _ => Err(LibraryError::Forbidden),
        }
    }
}
