//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rusqlite::Connection;

use crate::{Error, auth::AuthError, db::initialize};

#[derive(Clone)]
struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection shared by all request handlers.
    pub db_connection: Arc<Mutex<Connection>>,
    token_keys: TokenKeys,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models and seeding the static bank list.
    ///
    /// `token_secret` is the HMAC key used to sign and verify bearer tokens.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection, token_secret: &str) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            token_keys: TokenKeys {
                encoding_key: EncodingKey::from_secret(token_secret.as_ref()),
                decoding_key: DecodingKey::from_secret(token_secret.as_ref()),
            },
        })
    }

    /// The encoding key for bearer tokens.
    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.token_keys.encoding_key
    }

    /// The decoding key for bearer tokens.
    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.token_keys.decoding_key
    }
}

impl<S> FromRequestParts<S> for AppState
where
    Self: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(_: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_ref(state))
    }
}
