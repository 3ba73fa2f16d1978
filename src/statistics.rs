//! Aggregate statistics across a user's debts.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, named_params};
use serde::Serialize;

use crate::{AppState, Error, UserID, auth::Claims};

/// A summary of a user's debts, computed from all of their debts regardless
/// of due date. All monetary figures are in cents.
#[derive(Debug, PartialEq, Serialize)]
pub struct DebtStatistics {
    /// How many debts the user has.
    pub total_debts: i64,
    /// How many are stored as pending.
    pub pending_count: i64,
    /// How many are stored as paid.
    pub paid_count: i64,
    /// How many are stored as overdue.
    pub overdue_count: i64,
    /// The sum of all principals.
    pub total_amount: i64,
    /// The sum of all paid amounts.
    pub total_paid: i64,
    /// The sum of all outstanding balances.
    pub total_remaining: i64,
}

/// Compute the debt statistics for `user_id` in a single aggregate query.
///
/// A user with no debts gets all-zero statistics.
pub fn get_statistics(user_id: UserID, connection: &Connection) -> Result<DebtStatistics, Error> {
    connection
        .query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(status = 'pending'), 0),
                COALESCE(SUM(status = 'paid'), 0),
                COALESCE(SUM(status = 'overdue'), 0),
                COALESCE(SUM(amount), 0),
                COALESCE(SUM(paid_amount), 0),
                COALESCE(SUM(amount - paid_amount), 0)
             FROM debts WHERE user_id = :user_id",
            named_params! {":user_id": user_id.as_i64()},
            |row| {
                Ok(DebtStatistics {
                    total_debts: row.get(0)?,
                    pending_count: row.get(1)?,
                    paid_count: row.get(2)?,
                    overdue_count: row.get(3)?,
                    total_amount: row.get(4)?,
                    total_paid: row.get(5)?,
                    total_remaining: row.get(6)?,
                })
            },
        )
        .map_err(|e| e.into())
}

/// A route handler for the caller's debt statistics.
pub async fn get_statistics_endpoint(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let statistics = get_statistics(claims.user_id(), &connection)?;

    Ok(Json(statistics).into_response())
}
