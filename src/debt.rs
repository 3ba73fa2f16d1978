//! This file defines debts, their owner-scoped database operations and the
//! route handlers for debt CRUD.
//!
//! The paid amount and status of a debt are only ever mutated through the
//! payment ledger (see the `ledger` module) or an explicit edit; listing and
//! detail reads decorate each debt with its remaining amount and urgency.

use std::{fmt::Display, str::FromStr};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{Connection, Row, named_params, params};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, DatabaseID, Error, UserID,
    auth::Claims,
    require_amount, require_text,
    urgency::{Urgency, classify},
};

/// The lifecycle status of a debt.
///
/// `overdue` is usually derived at read time (see [crate::urgency]) but may
/// also be stored by an explicit edit, and the default listing view includes
/// debts stored as overdue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    /// The debt still has an outstanding balance.
    Pending,
    /// The paid amount has reached the principal.
    Paid,
    /// The debt was explicitly marked overdue.
    Overdue,
}

impl Display for DebtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DebtStatus::Pending => "pending",
            DebtStatus::Paid => "paid",
            DebtStatus::Overdue => "overdue",
        };

        write!(f, "{text}")
    }
}

impl FromStr for DebtStatus {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "pending" => Ok(DebtStatus::Pending),
            "paid" => Ok(DebtStatus::Paid),
            "overdue" => Ok(DebtStatus::Overdue),
            _ => Err(Error::Validation(
                "status must be one of pending, paid or overdue",
            )),
        }
    }
}

/// A debt owed by a user to a bank.
///
/// All monetary amounts are fixed-point cents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Debt {
    /// The debt's ID in the database.
    pub id: DatabaseID,
    /// The owning user. Not serialized; ownership is implied by the token.
    #[serde(skip_serializing)]
    pub user_id: UserID,
    /// The bank the debt is owed to.
    pub bank_name: String,
    /// A short description of what the debt is for.
    pub description: String,
    /// The principal in cents.
    pub amount: i64,
    /// The cents paid so far. Monotonically non-decreasing under the ledger.
    pub paid_amount: i64,
    /// When the next installment is due.
    pub due_date: NaiveDate,
    /// How often the debt recurs. Descriptive only, not enforced.
    pub frequency: String,
    /// The stored lifecycle status.
    pub status: DebtStatus,
    /// The date the debt was recorded.
    pub created_date: NaiveDate,
}

/// A debt decorated with the read-time fields sent to clients.
#[derive(Debug, Serialize)]
pub struct DecoratedDebt {
    #[serde(flatten)]
    debt: Debt,
    remaining_amount: i64,
    urgency: Urgency,
}

impl DecoratedDebt {
    /// Decorate `debt` with its remaining amount and urgency as of `today`.
    pub fn new(debt: Debt, today: NaiveDate) -> Self {
        let remaining_amount = debt.amount - debt.paid_amount;
        let urgency = classify(debt.due_date, debt.status, today);

        Self {
            debt,
            remaining_amount,
            urgency,
        }
    }
}

/// Create the table for storing debts.
///
/// Payments reference debts by ID but the reference is not enforced with a
/// cascade: deleting a debt keeps its payment rows.
pub fn create_debt_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS debts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            bank_name TEXT NOT NULL,
            description TEXT NOT NULL,
            amount INTEGER NOT NULL,
            paid_amount INTEGER NOT NULL DEFAULT 0,
            due_date TEXT NOT NULL,
            frequency TEXT NOT NULL,
            status TEXT NOT NULL,
            created_date TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

const DEBT_COLUMNS: &str =
    "id, user_id, bank_name, description, amount, paid_amount, due_date, frequency, status, created_date";

pub(crate) fn map_debt_row(row: &Row) -> Result<Debt, rusqlite::Error> {
    let raw_status: String = row.get(8)?;
    let status = raw_status.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Debt {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        bank_name: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        paid_amount: row.get(5)?,
        due_date: row.get(6)?,
        frequency: row.get(7)?,
        status,
        created_date: row.get(9)?,
    })
}

/// The fields for creating a new debt.
#[derive(Debug, Clone)]
pub struct NewDebt {
    /// The bank the debt is owed to.
    pub bank_name: String,
    /// A short description of what the debt is for.
    pub description: String,
    /// The principal in cents.
    pub amount: i64,
    /// When the next installment is due.
    pub due_date: NaiveDate,
    /// How often the debt recurs.
    pub frequency: String,
}

/// Insert a new debt for `user_id` with a zero paid amount and pending status.
pub fn create_debt(
    new_debt: NewDebt,
    user_id: UserID,
    today: NaiveDate,
    connection: &Connection,
) -> Result<Debt, Error> {
    connection.execute(
        "INSERT INTO debts (user_id, bank_name, description, amount, paid_amount, due_date, frequency, status, created_date)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, 'pending', ?7)",
        params![
            user_id.as_i64(),
            new_debt.bank_name,
            new_debt.description,
            new_debt.amount,
            new_debt.due_date,
            new_debt.frequency,
            today
        ],
    )?;

    Ok(Debt {
        id: connection.last_insert_rowid(),
        user_id,
        bank_name: new_debt.bank_name,
        description: new_debt.description,
        amount: new_debt.amount,
        paid_amount: 0,
        due_date: new_debt.due_date,
        frequency: new_debt.frequency,
        status: DebtStatus::Pending,
        created_date: today,
    })
}

/// Get the debt with `id`, scoped to its owner.
///
/// # Errors
/// Returns [Error::NotFound] if the debt does not exist or belongs to a
/// different user.
pub fn get_debt(id: DatabaseID, user_id: UserID, connection: &Connection) -> Result<Debt, Error> {
    connection
        .prepare(&format!(
            "SELECT {DEBT_COLUMNS} FROM debts WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            named_params! {":id": id, ":user_id": user_id.as_i64()},
            map_debt_row,
        )
        .map_err(|e| e.into())
}

/// The filters accepted by the debt listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DebtQuery {
    /// Restrict the listing to one stored status.
    pub status: Option<String>,
    /// The month to list, 1-12. Only applied together with `year`.
    pub month: Option<u32>,
    /// The year to list. Only applied together with `month`.
    pub year: Option<i32>,
}

fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), Error> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(Error::Validation("month and year must form a valid date"))?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or(Error::Validation("month and year must form a valid date"))?;

    Ok((start, end))
}

/// Query `user_id`'s debts, ordered by due date ascending.
///
/// With an explicit `month` and `year` the listing is restricted to that
/// calendar month. Otherwise the default view applies: debts due in the
/// month containing `today`, plus any debt stored as overdue.
pub fn query_debts(
    filter: &DebtQuery,
    user_id: UserID,
    today: NaiveDate,
    connection: &Connection,
) -> Result<Vec<Debt>, Error> {
    let status: Option<DebtStatus> = filter
        .status
        .as_deref()
        .map(DebtStatus::from_str)
        .transpose()?;

    let explicit_month = filter.month.is_some() && filter.year.is_some();
    let (start, end) = match (filter.year, filter.month) {
        (Some(year), Some(month)) => month_range(year, month)?,
        _ => month_range(today.year(), today.month())?,
    };

    let month_condition = if explicit_month {
        "due_date >= :start AND due_date < :end"
    } else {
        "(due_date >= :start AND due_date < :end OR status = 'overdue')"
    };

    let sql = match status {
        Some(_) => format!(
            "SELECT {DEBT_COLUMNS} FROM debts
             WHERE user_id = :user_id AND status = :status AND {month_condition}
             ORDER BY due_date ASC"
        ),
        None => format!(
            "SELECT {DEBT_COLUMNS} FROM debts
             WHERE user_id = :user_id AND {month_condition}
             ORDER BY due_date ASC"
        ),
    };

    let mut statement = connection.prepare(&sql)?;

    let debts = match status {
        Some(status) => statement
            .query_map(
                named_params! {
                    ":user_id": user_id.as_i64(),
                    ":status": status.to_string(),
                    ":start": start,
                    ":end": end,
                },
                map_debt_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => statement
            .query_map(
                named_params! {
                    ":user_id": user_id.as_i64(),
                    ":start": start,
                    ":end": end,
                },
                map_debt_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(debts)
}

/// The optional fields of a partial debt update.
///
/// Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct DebtUpdate {
    /// Replace the bank name.
    pub bank_name: Option<String>,
    /// Replace the description.
    pub description: Option<String>,
    /// Replace the principal, in cents.
    pub amount: Option<i64>,
    /// Replace the due date.
    pub due_date: Option<NaiveDate>,
    /// Replace the recurrence frequency.
    pub frequency: Option<String>,
    /// Replace the stored status.
    pub status: Option<DebtStatus>,
    /// Replace the paid amount, in cents.
    pub paid_amount: Option<i64>,
}

/// Apply a partial update to the debt with `id`, scoped to its owner, and
/// return the updated debt.
///
/// # Errors
/// Returns [Error::NotFound] if the debt does not exist or belongs to a
/// different user. No fields are written in that case.
pub fn update_debt(
    id: DatabaseID,
    user_id: UserID,
    update: &DebtUpdate,
    connection: &Connection,
) -> Result<Debt, Error> {
    let rows_updated = connection.execute(
        "UPDATE debts SET
            bank_name = COALESCE(:bank_name, bank_name),
            description = COALESCE(:description, description),
            amount = COALESCE(:amount, amount),
            due_date = COALESCE(:due_date, due_date),
            frequency = COALESCE(:frequency, frequency),
            status = COALESCE(:status, status),
            paid_amount = COALESCE(:paid_amount, paid_amount)
         WHERE id = :id AND user_id = :user_id",
        named_params! {
            ":bank_name": update.bank_name,
            ":description": update.description,
            ":amount": update.amount,
            ":due_date": update.due_date,
            ":frequency": update.frequency,
            ":status": update.status.map(|status| status.to_string()),
            ":paid_amount": update.paid_amount,
            ":id": id,
            ":user_id": user_id.as_i64(),
        },
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    get_debt(id, user_id, connection)
}

/// Delete the debt with `id`, scoped to its owner.
///
/// Payment rows referencing the debt are kept as-is.
///
/// # Errors
/// Returns [Error::NotFound] if the debt does not exist or belongs to a
/// different user.
pub fn delete_debt(id: DatabaseID, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM debts WHERE id = ?1 AND user_id = ?2",
        params![id, user_id.as_i64()],
    )?;

    if rows_deleted == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The request body for creating a debt.
///
/// Required fields are unwrapped by hand so a missing field produces a 400
/// with a message naming the field, rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct DebtForm {
    bank_name: Option<String>,
    description: Option<String>,
    amount: Option<i64>,
    due_date: Option<NaiveDate>,
    frequency: Option<String>,
}

/// A route handler for listing the caller's debts, decorated with urgency.
pub async fn list_debts_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Query(filter): Query<DebtQuery>,
) -> Result<Response, Error> {
    let today = Utc::now().date_naive();
    let connection = state.db_connection.lock().unwrap();

    let debts = query_debts(&filter, claims.user_id(), today, &connection)?;
    let decorated: Vec<_> = debts
        .into_iter()
        .map(|debt| DecoratedDebt::new(debt, today))
        .collect();

    Ok(Json(decorated).into_response())
}

/// A route handler for getting one of the caller's debts by its database ID.
pub async fn get_debt_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(debt_id): Path<DatabaseID>,
) -> Result<Response, Error> {
    let today = Utc::now().date_naive();
    let connection = state.db_connection.lock().unwrap();

    let debt = get_debt(debt_id, claims.user_id(), &connection)?;

    Ok(Json(DecoratedDebt::new(debt, today)).into_response())
}

/// A route handler for creating a new debt owned by the caller.
pub async fn create_debt_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Json(form): Json<DebtForm>,
) -> Result<Response, Error> {
    let new_debt = NewDebt {
        bank_name: require_text(form.bank_name, "bank_name is required")?,
        description: require_text(form.description, "description is required")?,
        amount: require_amount(form.amount, "amount is required and must be non-zero")?,
        due_date: form
            .due_date
            .ok_or(Error::Validation("due_date is required"))?,
        frequency: form.frequency.unwrap_or_else(|| "monthly".to_owned()),
    };

    let today = Utc::now().date_naive();
    let connection = state.db_connection.lock().unwrap();

    let debt = create_debt(new_debt, claims.user_id(), today, &connection)?;

    Ok((StatusCode::CREATED, Json(DecoratedDebt::new(debt, today))).into_response())
}

/// A route handler for partially updating one of the caller's debts.
pub async fn update_debt_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(debt_id): Path<DatabaseID>,
    Json(update): Json<DebtUpdate>,
) -> Result<Response, Error> {
    let today = Utc::now().date_naive();
    let connection = state.db_connection.lock().unwrap();

    let debt = update_debt(debt_id, claims.user_id(), &update, &connection)?;

    Ok(Json(DecoratedDebt::new(debt, today)).into_response())
}

/// A route handler for deleting one of the caller's debts.
pub async fn delete_debt_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(debt_id): Path<DatabaseID>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    delete_debt(debt_id, claims.user_id(), &connection)?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
