//! # Identity provider
//!
//! Thin client for the hosted Identity Toolkit REST API. The provider owns
//! accounts and sessions; this module only exchanges credentials for a
//! session and resolves bearer tokens back to `{id, email}`.

use anyhow::anyhow;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::error::LibraryError;

const ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum IdentityError {
    /// The provider rejected the credentials or token; the message is its
    /// user-facing reason.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(anyhow::Error),
}

/// A fresh session returned by sign-up/sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    #[serde(rename = "localId")]
    pub user_id: String,
    pub email: String,
    #[serde(rename = "idToken")]
    pub id_token: String,
}

/// The identity behind a verified bearer token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: String,
    pub email: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: String,
}

pub struct IdentityClient {
    http: Client,
    api_key: String,
}

impl IdentityClient {
    pub fn new(http: Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.call(
            "accounts:signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.call(
            "accounts:signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    pub async fn lookup(&self, id_token: &str) -> Result<Caller, IdentityError> {
        let response: LookupResponse = self
            .call("accounts:lookup", json!({ "idToken": id_token }))
            .await?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::Rejected("Unknown session".into()))?;

        Ok(Caller {
            id: user.local_id,
            email: user.email,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
    ) -> Result<T, IdentityError> {
        let response = self
            .http
            .post(format!("{ENDPOINT}/{method}"))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.into()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|err| IdentityError::Transport(err.into()));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(IdentityError::Rejected(provider_message(&body)))
        } else {
            Err(IdentityError::Transport(anyhow!(
                "identity provider {status}: {body}"
            )))
        }
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| "Request rejected by identity provider".to_string())
}

/// Registration password rules, checked before the provider is called so the
/// first failing rule's message is the one shown.
pub fn validate_password(password: &str) -> Result<(), LibraryError> {
    let uppercase = Regex::new("[A-Z]").unwrap();
    let alphanumeric = Regex::new("[a-zA-Z0-9]").unwrap();

    if !uppercase.is_match(password) {
        return Err(LibraryError::Validation(
            "Password must contain at least one uppercase letter".into(),
        ));
    }
    if !alphanumeric.is_match(password) {
        return Err(LibraryError::Validation(
            "Password must be alphanumeric".into(),
        ));
    }
    if password.len() < 8 {
        return Err(LibraryError::Validation(
            "Password must be at least 8 characters long".into(),
        ));
    }

    Ok(())
}
