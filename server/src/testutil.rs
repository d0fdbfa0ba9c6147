//! In-memory [`DocumentStore`] for tests. Single-document writes with a
//! monotonic counter standing in for server-assigned write times.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::store::{Document, DocumentStore, Fields, StoreError};

const EPOCH: i64 = 1_700_000_000;

pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Fields>>>,
    ticks: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            ticks: AtomicI64::new(0),
        }
    }

    fn tick(&self) -> i64 {
        self.ticks.fetch_add(1, Ordering::SeqCst)
    }

    fn server_time(tick: i64) -> Value {
        let at = DateTime::<Utc>::from_timestamp(EPOCH + tick, 0).unwrap();

        Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();

        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        for (key, value) in fields {
            doc.insert(key, value);
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().unwrap();
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }

        Ok(())
    }

    async fn add(
        &self,
        collection: &str,
        mut fields: Fields,
        server_time_field: Option<&str>,
    ) -> Result<String, StoreError> {
        let tick = self.tick();
        let id = format!("m{tick:03}");

        if let Some(field) = server_time_field {
            fields.insert(field.to_string(), Self::server_time(tick));
        }

        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);

        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<(&str, Value)>,
        descending: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().unwrap();
        let mut docs: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, wanted)) = filter {
            docs.retain(|doc| doc.fields.get(field).unwrap_or(&Value::Null) == &wanted);
        }

        if let Some(field) = descending {
            docs.sort_by(|a, b| {
                let a = a.fields.get(field).map(Value::to_string);
                let b = b.fields.get(field).map(Value::to_string);
                b.cmp(&a)
            });
        }

        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn null_filter_matches_absent_field() {
        let store = MemoryStore::new();

        let mut fields = Fields::new();
        fields.insert("title".into(), json!("Dune"));
        store.add("books", fields, None).await.unwrap();

        let mut fields = Fields::new();
        fields.insert("title".into(), json!("Hyperion"));
        fields.insert("userId".into(), json!("u1"));
        store.add("books", fields, None).await.unwrap();

        let free = store
            .query("books", Some(("userId", Value::Null)), None)
            .await
            .unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].fields["title"], json!("Dune"));
    }

    #[tokio::test]
    async fn update_requires_existing_document() {
        let store = MemoryStore::new();

        let err = store
            .update("books", "ghost", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }
}
