//! This file defines the payment history model, its storage and the payment
//! route handlers.
//!
//! Inserting a payment is never done directly through this module from a
//! handler; the `ledger` module owns the insert so the owning debt's paid
//! amount is updated in the same transaction.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Row, named_params};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, DatabaseID, Error, UserID,
    auth::Claims,
    ledger::{PaymentRequest, apply_payment},
    require_amount,
};

/// A single payment made towards a debt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    /// The payment's ID in the database.
    pub id: DatabaseID,
    /// The debt the payment was made towards.
    pub debt_id: DatabaseID,
    /// The amount paid, in cents.
    pub amount: i64,
    /// The date the payment was made.
    pub payment_date: NaiveDate,
    /// How the payment was made, e.g. "transfer" or "cash".
    pub payment_method: String,
    /// An optional external reference such as a transfer number.
    pub reference: Option<String>,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// When the payment row was recorded.
    pub created_at: DateTime<Utc>,
}

/// Create the table for storing the payment history.
pub fn create_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS payment_history (
            id INTEGER PRIMARY KEY,
            debt_id INTEGER NOT NULL REFERENCES debts(id),
            amount INTEGER NOT NULL,
            payment_date TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            reference TEXT,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub(crate) const PAYMENT_COLUMNS: &str =
    "id, debt_id, amount, payment_date, payment_method, reference, notes, created_at";

pub(crate) fn map_payment_row(row: &Row) -> Result<Payment, rusqlite::Error> {
    Ok(Payment {
        id: row.get(0)?,
        debt_id: row.get(1)?,
        amount: row.get(2)?,
        payment_date: row.get(3)?,
        payment_method: row.get(4)?,
        reference: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// List the payments made towards `debt_id`, newest first.
///
/// The listing is scoped through the debt's owner: payments towards another
/// user's debt are never returned.
///
/// # Errors
/// Returns [Error::NotFound] if the debt does not exist or belongs to a
/// different user.
pub fn list_payments_for_debt(
    debt_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Payment>, Error> {
    let debt_exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM debts WHERE id = :debt_id AND user_id = :user_id)",
        named_params! {":debt_id": debt_id, ":user_id": user_id.as_i64()},
        |row| row.get(0),
    )?;

    if !debt_exists {
        return Err(Error::NotFound);
    }

    let payments = connection
        .prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history
             WHERE debt_id = :debt_id
             ORDER BY payment_date DESC, id DESC"
        ))?
        .query_map(named_params! {":debt_id": debt_id}, map_payment_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(payments)
}

/// The request body for recording a payment.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentForm {
    debt_id: Option<DatabaseID>,
    amount: Option<i64>,
    payment_date: Option<NaiveDate>,
    payment_method: Option<String>,
    reference: Option<String>,
    notes: Option<String>,
}

/// A route handler for recording a payment towards one of the caller's debts.
pub async fn create_payment_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Json(form): Json<PaymentForm>,
) -> Result<Response, Error> {
    let request = PaymentRequest {
        debt_id: form.debt_id.ok_or(Error::Validation("debt_id is required"))?,
        amount: require_amount(form.amount, "amount is required and must be non-zero")?,
        payment_date: form
            .payment_date
            .ok_or(Error::Validation("payment_date is required"))?,
        payment_method: form.payment_method.unwrap_or_else(|| "transfer".to_owned()),
        reference: form.reference,
        notes: form.notes,
    };

    let mut connection = state.db_connection.lock().unwrap();

    let receipt = apply_payment(&mut connection, claims.user_id(), request)?;

    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

/// A route handler for listing the payment history of one of the caller's
/// debts, newest first.
pub async fn get_payment_history_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(debt_id): Path<DatabaseID>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let payments = list_payments_for_debt(debt_id, claims.user_id(), &connection)?;

    Ok(Json(payments).into_response())
}
