//! # Firestore adapter
//!
//! [`DocumentStore`] over the Firestore REST API, authenticated the way the
//! web clients are: the project web API key on every request, with access
//! control left to the store's security rules.
//!
//! Field maps travel as Firestore typed values (`stringValue`,
//! `integerValue`, ...) and are converted to plain JSON at this boundary.
//! Document ids are generated client-side, as the hosted SDKs do.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::store::{Document, DocumentStore, Fields, StoreError};

const ENDPOINT: &str = "https://firestore.googleapis.com/v1";

pub struct FirestoreStore {
    http: Client,
    api_key: String,
    root: String,
}

impl FirestoreStore {
    pub fn new(http: Client, project_id: &str, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            root: format!("projects/{project_id}/databases/(default)/documents"),
        }
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{ENDPOINT}/{}/{collection}/{id}", self.root)
    }

    fn doc_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.root)
    }

    /// Splits a slash-joined collection path into the query parent and the
    /// leaf collection id, as `runQuery` wants them.
    fn split_collection(&self, collection: &str) -> (String, String) {
        match collection.rsplit_once('/') {
            Some((parent, leaf)) => (format!("{}/{parent}", self.root), leaf.to_string()),
            None => (self.root.clone(), collection.to_string()),
        }
    }

    fn key(&self) -> [(&'static str, &str); 1] {
        [("key", self.api_key.as_str())]
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let response = self
            .http
            .get(self.doc_url(collection, id))
            .query(&self.key())
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = expect_success(response, "get").await?;

        Ok(Some(decode_document(&body)?))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let response = self
            .http
            .patch(self.doc_url(collection, id))
            .query(&self.key())
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        expect_success(response, "set").await?;

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut query: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("currentDocument.exists", "true".to_string()),
        ];
        for field in fields.keys() {
            query.push(("updateMask.fieldPaths", field.clone()));
        }

        let response = self
            .http
            .patch(self.doc_url(collection, id))
            .query(&query)
            .json(&json!({ "fields": encode_fields(&fields) }))
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        expect_success(response, "update").await?;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.doc_url(collection, id))
            .query(&self.key())
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        expect_success(response, "delete").await?;

        Ok(())
    }

    async fn add(
        &self,
        collection: &str,
        fields: Fields,
        server_time_field: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();

        let mut write = json!({
            "update": {
                "name": self.doc_name(collection, &id),
                "fields": encode_fields(&fields),
            }
        });
        if let Some(field) = server_time_field {
            write["updateTransforms"] = json!([
                { "fieldPath": field, "setToServerValue": "REQUEST_TIME" }
            ]);
        }

        let response = self
            .http
            .post(format!("{ENDPOINT}/{}:commit", self.root))
            .query(&self.key())
            .json(&json!({ "writes": [write] }))
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        expect_success(response, "add").await?;

        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<(&str, Value)>,
        descending: Option<&str>,
    ) -> Result<Vec<Document>, StoreError> {
        let (parent, leaf) = self.split_collection(collection);

        let mut structured = json!({ "from": [{ "collectionId": leaf }] });
        if let Some((field, value)) = filter {
            structured["where"] = if value.is_null() {
                json!({ "unaryFilter": { "op": "IS_NULL", "field": { "fieldPath": field } } })
            } else {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(&value),
                    }
                })
            };
        }
        if let Some(field) = descending {
            structured["orderBy"] =
                json!([{ "field": { "fieldPath": field }, "direction": "DESCENDING" }]);
        }

        let response = self
            .http
            .post(format!("{ENDPOINT}/{parent}:runQuery"))
            .query(&self.key())
            .json(&json!({ "structuredQuery": structured }))
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        let body = expect_success(response, "query").await?;
        let rows = body.as_array().cloned().unwrap_or_default();

        let mut documents = Vec::new();
        for row in &rows {
            // trailing rows may carry only a readTime
            if let Some(doc) = row.get("document") {
                documents.push(decode_document(doc)?);
            }
        }

        Ok(documents)
    }
}

async fn expect_success(response: Response, context: &str) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(anyhow!("firestore {context} failed with {status}: {body}"));
    }

    Ok(serde_json::from_str(&body).unwrap_or(Value::Null))
}

fn decode_document(doc: &Value) -> Result<Document> {
    let name = doc["name"]
        .as_str()
        .ok_or_else(|| anyhow!("document without a name: {doc}"))?;
    let id = name.rsplit('/').next().unwrap_or_default().to_string();

    let mut fields = Fields::new();
    if let Some(typed) = doc["fields"].as_object() {
        for (key, value) in typed {
            fields.insert(key.clone(), decode_value(value));
        }
    }

    Ok(Document { id, fields })
}

fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect(),
    )
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => match number.as_i64() {
            Some(int) => json!({ "integerValue": int.to_string() }),
            None => json!({ "doubleValue": number.as_f64() }),
        },
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": {
                "fields": Value::Object(
                    map.iter()
                        .map(|(key, value)| (key.clone(), encode_value(value)))
                        .collect(),
                )
            }
        }),
    }
}

fn decode_value(value: &Value) -> Value {
    let Some(typed) = value.as_object() else {
        return Value::Null;
    };

    if typed.contains_key("nullValue") {
        Value::Null
    } else if let Some(flag) = typed.get("booleanValue") {
        flag.clone()
    } else if let Some(int) = typed.get("integerValue") {
        match int {
            Value::String(text) => text
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or(Value::Null),
            other => other.clone(),
        }
    } else if let Some(double) = typed.get("doubleValue") {
        double.clone()
    } else if let Some(text) = typed.get("stringValue") {
        text.clone()
    } else if let Some(stamp) = typed.get("timestampValue") {
        stamp.clone()
    } else if let Some(array) = typed.get("arrayValue") {
        let items = array["values"].as_array().cloned().unwrap_or_default();
        Value::Array(items.iter().map(decode_value).collect())
    } else if let Some(map) = typed.get("mapValue") {
        let fields = map["fields"].as_object().cloned().unwrap_or_default();
        Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), decode_value(value)))
                .collect(),
        )
    } else {
        Value::Null
    }
}
