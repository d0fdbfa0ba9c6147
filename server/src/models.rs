use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::store::Document;

/// One lendable catalog item. Mirrors the stored document field for field,
/// with the store-assigned id injected on read.
///
/// `user_id` and `borrowed_by` are null together or set together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub author: String,
    pub year: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub borrowed_by: Option<String>,
}

impl Book {
    pub fn from_document(doc: Document) -> Result<Self> {
        let mut value = Value::Object(doc.fields);
        value["id"] = Value::String(doc.id);

        Ok(serde_json::from_value(value)?)
    }
}

/// Catalog-add payload. `year` stays a raw JSON number until validation so a
/// fractional year is rejected with a message instead of a decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year: Number,
}

/// Immutable audit record of a single borrow event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub borrowed_by: String,
    pub borrowed_id: String,
}

impl HistoryEntry {
    pub fn from_document(doc: Document) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(doc.fields))?)
    }
}

/// Profile document keyed by the identity provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Registration writes `user`, while older profile documents carry
    /// `ADMIN`; both spellings must resolve.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn book_reads_missing_borrower_fields_as_null() {
        let fields = json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "year": 1965,
        });
        let Value::Object(fields) = fields else {
            unreachable!()
        };

        let book = Book::from_document(Document {
            id: "b1".into(),
            fields,
        })
        .unwrap();

        assert_eq!(book.id, "b1");
        assert_eq!(book.user_id, None);
        assert_eq!(book.borrowed_by, None);
    }

    #[test]
    fn role_parse_accepts_both_observed_spellings() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("librarian"), None);
    }
}
