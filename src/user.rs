//! This file defines a user of the application and its database operations.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw database value of the ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
///
/// The password hash is never serialized into API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    id: UserID,
    name: String,
    email: EmailAddress,
    #[serde(skip_serializing)]
    password_hash: PasswordHash,
    avatar: String,
}

impl User {
    /// The user's ID in the database.
    pub fn id(&self) -> UserID {
        self.id
    }

    /// The user's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email address associated with the user.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// The user's password hash.
    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// The single-glyph avatar shown next to the user's name.
    pub fn avatar(&self) -> &str {
        &self.avatar
    }
}

/// Create the table for storing users.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            avatar TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The avatar is derived from the first letter of `name`, uppercased, falling
/// back to `"U"` for an empty name.
///
/// # Errors
/// Returns [Error::DuplicateEmail] if a user with `email` already exists.
pub fn insert_user(
    name: &str,
    email: EmailAddress,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let avatar = name
        .chars()
        .next()
        .map(|first_letter| first_letter.to_uppercase().to_string())
        .unwrap_or_else(|| "U".to_owned());

    connection.execute(
        "INSERT INTO users (name, email, password_hash, avatar) VALUES (?1, ?2, ?3, ?4)",
        (
            name,
            email.to_string(),
            password_hash.to_string(),
            &avatar,
        ),
    )?;

    Ok(User {
        id: UserID::new(connection.last_insert_rowid()),
        name: name.to_owned(),
        email,
        password_hash,
        avatar,
    })
}

/// Get the user that has the specified `email` address.
///
/// # Errors
/// Returns [Error::NotFound] if no user with the given email exists.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name, email, password_hash, avatar FROM users WHERE email = :email")?
        .query_row(&[(":email", email)], map_user_row)
        .map_err(|e| e.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: EmailAddress::new_unchecked(raw_email),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        avatar: row.get(4)?,
    })
}
