//! The static list of banks that debts can be owed to.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row, params};
use serde::Serialize;

use crate::{AppState, DatabaseID, Error};

/// A bank that debts can be associated with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bank {
    /// The bank's ID in the database.
    pub id: DatabaseID,
    /// The bank's display name.
    pub name: String,
    /// A short unique code such as "bcp".
    pub code: String,
    /// An optional URL for the bank's logo.
    pub logo_url: Option<String>,
}

/// Create the table for storing banks.
pub fn create_bank_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS banks (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT UNIQUE NOT NULL,
            logo_url TEXT,
            active INTEGER NOT NULL DEFAULT 1
        )",
        (),
    )?;

    Ok(())
}

/// Seed the bank table with the default bank list.
///
/// Only runs when the table is empty, so existing rows (including edits to
/// them) survive restarts.
pub fn seed_banks(connection: &Connection) -> Result<(), rusqlite::Error> {
    let count: i64 = connection.query_row("SELECT COUNT(*) FROM banks", [], |row| row.get(0))?;

    if count > 0 {
        return Ok(());
    }

    let default_banks = [
        ("Banco de Crédito del Perú", "bcp"),
        ("BBVA", "bbva"),
        ("Interbank", "interbank"),
        ("Scotiabank", "scotiabank"),
        ("Banco de la Nación", "banco-nacion"),
    ];

    for (name, code) in default_banks {
        connection.execute(
            "INSERT INTO banks (name, code, active) VALUES (?1, ?2, 1)",
            params![name, code],
        )?;
    }

    Ok(())
}

fn map_bank_row(row: &Row) -> Result<Bank, rusqlite::Error> {
    Ok(Bank {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        logo_url: row.get(3)?,
    })
}

/// List the active banks, ordered by name.
pub fn list_active_banks(connection: &Connection) -> Result<Vec<Bank>, Error> {
    let banks = connection
        .prepare(
            "SELECT id, name, code, logo_url FROM banks
             WHERE active = 1
             ORDER BY name ASC",
        )?
        .query_map([], map_bank_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(banks)
}

/// A route handler for listing the active banks.
///
/// This is the one listing that does not require a token, so registration
/// forms can show the bank list before the user has an account.
pub async fn list_banks_endpoint(State(state): State<AppState>) -> Result<Response, Error> {
    let connection = state.db_connection.lock().unwrap();

    let banks = list_active_banks(&connection)?;

    Ok(Json(banks).into_response())
}

#[cfg(test)]
mod bank_tests {
    use rusqlite::Connection;

    use crate::db::initialize;

    use super::{list_active_banks, seed_banks};

    fn get_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        connection
    }

    #[test]
    fn seeding_populates_the_default_banks() {
        let connection = get_connection();

        let banks = list_active_banks(&connection).unwrap();

        assert_eq!(banks.len(), 5);
        assert!(banks.iter().any(|bank| bank.code == "bcp"));
    }

    #[test]
    fn seeding_twice_does_not_duplicate_rows() {
        let connection = get_connection();

        seed_banks(&connection).unwrap();

        let banks = list_active_banks(&connection).unwrap();
        assert_eq!(banks.len(), 5);
    }

    #[test]
    fn listing_is_ordered_by_name_and_skips_inactive_banks() {
        let connection = get_connection();

        connection
            .execute("UPDATE banks SET active = 0 WHERE code = 'bbva'", [])
            .unwrap();

        let banks = list_active_banks(&connection).unwrap();

        assert_eq!(banks.len(), 4);
        assert!(banks.windows(2).all(|pair| pair[0].name <= pair[1].name));
        assert!(banks.iter().all(|bank| bank.code != "bbva"));
    }
}
