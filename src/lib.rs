//! Debtor is a web app for tracking personal debts owed to banks.
//!
//! This library provides a JSON REST API for registering users, recording
//! debts, applying payments against them and reading aggregate statistics.
//! The payment path is transactional: a payment row and its debt's balance
//! and status always change together or not at all.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod bank;
mod db;
mod debt;
mod endpoints;
mod ledger;
mod notification;
mod password;
mod payment;
mod routing;
mod statistics;
mod urgency;
mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use password::PasswordHash;
pub use routing::build_router;
pub use user::{User, UserID};

/// An alias for the integer row IDs used by the database.
pub type DatabaseID = i64;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing, empty or malformed in the request.
    ///
    /// The message names the offending field and is safe to show to clients.
    #[error("{0}")]
    Validation(&'static str),

    /// The user provided an email/password combination that did not match a
    /// registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    /// Resources owned by another user are reported as not found as well, so
    /// callers cannot probe for other users' data.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The email used to register already belongs to another user.
    #[error("a user with that email already exists")]
    DuplicateEmail,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The bearer token for a signed-in user could not be created.
    #[error("could not create the auth token")]
    TokenCreation,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("users.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::Validation(message) => (StatusCode::BAD_REQUEST, message.to_owned()),
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::DuplicateEmail => (StatusCode::CONFLICT, self.to_string()),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Unwrap a required text field, treating an empty or whitespace-only string
/// the same as a missing one.
pub(crate) fn require_text(value: Option<String>, message: &'static str) -> Result<String, Error> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::Validation(message)),
    }
}

/// Unwrap a required amount field.
///
/// A zero amount is rejected the same as a missing one. Negative amounts are
/// accepted and land on the ledger as corrections.
pub(crate) fn require_amount(value: Option<i64>, message: &'static str) -> Result<i64, Error> {
    match value {
        Some(amount) if amount != 0 => Ok(amount),
        _ => Err(Error::Validation(message)),
    }
}
