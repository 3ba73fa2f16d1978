//! This file defines per-user notifications, their storage and route
//! handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, named_params, params};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, DatabaseID, Error, UserID, auth::Claims};

/// A message shown to a user, e.g. a due-date reminder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// The notification's ID in the database.
    pub id: DatabaseID,
    /// The debt the notification is about, if any.
    pub debt_id: Option<DatabaseID>,
    /// A short category tag such as "reminder" or "payment".
    #[serde(rename = "type")]
    pub kind: String,
    /// A one-line headline.
    pub title: String,
    /// The message shown to the user.
    pub message: String,
    /// Whether the user has read the notification.
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

/// Create the table for storing notifications.
pub fn create_notification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            debt_id INTEGER REFERENCES debts(id),
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

const NOTIFICATION_COLUMNS: &str = "id, debt_id, type, title, message, is_read, created_at";

fn map_notification_row(row: &Row) -> Result<Notification, rusqlite::Error> {
    Ok(Notification {
        id: row.get(0)?,
        debt_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a new unread notification for `user_id`.
pub fn insert_notification(
    user_id: UserID,
    debt_id: Option<DatabaseID>,
    kind: &str,
    title: &str,
    message: &str,
    connection: &Connection,
) -> Result<Notification, Error> {
    let created_at = Utc::now();

    connection.execute(
        "INSERT INTO notifications (user_id, debt_id, type, title, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![user_id.as_i64(), debt_id, kind, title, message, created_at],
    )?;

    Ok(Notification {
        id: connection.last_insert_rowid(),
        debt_id,
        kind: kind.to_owned(),
        title: title.to_owned(),
        message: message.to_owned(),
        is_read: false,
        created_at,
    })
}

/// List `user_id`'s notifications, newest first, optionally restricted to
/// unread ones.
pub fn query_notifications(
    user_id: UserID,
    only_unread: bool,
    connection: &Connection,
) -> Result<Vec<Notification>, Error> {
    let sql = if only_unread {
        format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = :user_id AND is_read = 0
             ORDER BY created_at DESC"
        )
    } else {
        format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = :user_id
             ORDER BY created_at DESC"
        )
    };

    let notifications = connection
        .prepare(&sql)?
        .query_map(
            named_params! {":user_id": user_id.as_i64()},
            map_notification_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(notifications)
}

/// Mark one of `user_id`'s notifications as read.
///
/// Marking an already-read notification again is a no-op that still succeeds.
///
/// # Errors
/// Returns [Error::NotFound] if the notification does not exist or belongs
/// to a different user.
pub fn mark_notification_read(
    id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_i64()],
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The filters accepted by the notification listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// Pass `is_read=false` to list only unread notifications. Any other
    /// value lists everything.
    pub is_read: Option<String>,
}

/// A route handler for listing the caller's notifications, newest first.
pub async fn list_notifications_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Query(filter): Query<NotificationQuery>,
) -> Result<Response, Error> {
    let only_unread = filter.is_read.as_deref() == Some("false");
    let connection = state.db_connection.lock().unwrap();

    let notifications = query_notifications(claims.user_id(), only_unread, &connection)?;

    Ok(Json(notifications).into_response())
}

/// A route handler for marking one of the caller's notifications as read.
pub async fn mark_notification_read_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(notification_id): Path<DatabaseID>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    mark_notification_read(notification_id, claims.user_id(), &connection)?;

    Ok(Json(json!({"success": true})).into_response())
}
