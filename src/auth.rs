//! This file defines bearer-token authentication: the token claims, the
//! extractor that request handlers use to identify the caller, and the
//! registration and log-in route handlers.

use axum::{
    Json,
    RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use email_address::EmailAddress;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error, UserID,
    password::PasswordHash,
    require_text,
    user::{User, get_user_by_email, insert_user},
};

/// How long a bearer token stays valid after being issued.
const TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// The data encoded into a signed bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated user's ID.
    pub id: UserID,
    /// The authenticated user's email address.
    pub email: EmailAddress,
    /// The expiry as a unix timestamp in seconds.
    pub exp: usize,
}

impl Claims {
    /// The ID of the user the token was issued to.
    pub fn user_id(&self) -> UserID {
        self.id
    }
}

impl<S> FromRequestParts<S> for Claims
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingToken)?;

        let state = parts
            .extract_with_state::<AppState, _>(state)
            .await?;

        decode_token(bearer.token(), state.decoding_key())
    }
}

/// The ways token authentication can fail.
///
/// Every variant renders as a 401 with a JSON error message so clients can
/// redirect to the log-in page.
#[derive(Debug, PartialEq)]
pub enum AuthError {
    /// The request carried no bearer token.
    MissingToken,
    /// The token was malformed or its signature did not verify.
    InvalidToken,
    /// The token was valid but has expired.
    ExpiredToken,
    /// The email/password combination did not match a registered user.
    WrongCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "missing bearer token",
            AuthError::InvalidToken => "invalid token",
            AuthError::ExpiredToken => "token has expired",
            AuthError::WrongCredentials => "invalid email or password",
        };

        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

/// Create a signed bearer token for `user`, expiring after
/// [TOKEN_TTL_SECONDS].
pub(crate) fn encode_token(user: &User, encoding_key: &EncodingKey) -> Result<String, Error> {
    let exp = (Utc::now().timestamp() + TOKEN_TTL_SECONDS) as usize;
    let claims = Claims {
        id: user.id(),
        email: user.email().clone(),
        exp,
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|_| Error::TokenCreation)
}

/// Verify `token`'s signature and expiry and return its claims.
pub(crate) fn decode_token(token: &str, decoding_key: &DecodingKey) -> Result<Claims, AuthError> {
    decode::<Claims>(token, decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|error| match error.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        })
}

/// The request body for registering a new user.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

/// The request body for logging in.
#[derive(Debug, Default, Deserialize)]
pub struct LogInForm {
    email: Option<String>,
    password: Option<String>,
}

/// The response body for a successful registration or log-in.
#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user: User,
}

/// A route handler for registering a new user.
///
/// On success the new user is returned together with a bearer token, so
/// clients can sign the user in without a second request.
pub async fn register_endpoint(
    State(state): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> Result<Response, Error> {
    let name = require_text(form.name, "name is required")?;
    let raw_email = require_text(form.email, "email is required")?;
    let raw_password = require_text(form.password, "password is required")?;

    let email: EmailAddress = raw_email
        .parse()
        .map_err(|_| Error::Validation("email must be a valid email address"))?;

    let password_hash = PasswordHash::new(&raw_password, PasswordHash::DEFAULT_COST)?;

    let user = {
        let connection = state.db_connection.lock().unwrap();
        insert_user(&name, email, password_hash, &connection)?
    };

    let token = encode_token(&user, state.encoding_key())?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })).into_response())
}

/// A route handler for logging in a registered user.
///
/// An unknown email and a wrong password both produce the same 401 response,
/// so callers cannot tell which one was wrong.
pub async fn log_in_endpoint(
    State(state): State<AppState>,
    Json(form): Json<LogInForm>,
) -> Result<Response, Error> {
    let email = require_text(form.email, "email is required")?;
    let password = require_text(form.password, "password is required")?;

    let user = {
        let connection = state.db_connection.lock().unwrap();
        get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            other => other,
        })?
    };

    let password_matches = user
        .password_hash()
        .verify(&password)
        .map_err(|e| Error::HashingError(e.to_string()))?;

    if !password_matches {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(&user, state.encoding_key())?;

    Ok(Json(AuthResponse { token, user }).into_response())
}
