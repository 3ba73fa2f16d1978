//! Creates and initializes the application database.

use rusqlite::Connection;

use crate::{Error, bank, debt, notification, payment, user};

/// Create the tables for the domain models and seed the static bank list.
///
/// Existing tables and seed data are left untouched, so this is safe to call
/// on every startup.
///
/// # Errors
/// Returns an error if the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    user::create_user_table(connection)?;
    debt::create_debt_table(connection)?;
    payment::create_payment_table(connection)?;
    bank::create_bank_table(connection)?;
    notification::create_notification_table(connection)?;

    bank::seed_banks(connection)?;

    Ok(())
}
