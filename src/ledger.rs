//! The payment ledger: records a payment and settles the owning debt's paid
//! amount and status as one atomic step.
//!
//! Every balance change goes through [apply_payment]. The paid amount stored
//! on a debt is never computed by re-summing the payment history at read
//! time; instead this module keeps the running total and the history in sync
//! inside a single write transaction, so the invariant
//! `debts.paid_amount == SUM(payment_history.amount)` holds after every
//! committed payment.

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior, named_params};
use serde::Serialize;

use crate::{
    DatabaseID, Error, UserID,
    debt::DebtStatus,
    payment::{PAYMENT_COLUMNS, Payment, map_payment_row},
};

/// The fields needed to record a payment towards a debt.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// The debt to pay towards.
    pub debt_id: DatabaseID,
    /// The amount paid, in cents.
    pub amount: i64,
    /// The date the payment was made.
    pub payment_date: NaiveDate,
    /// How the payment was made.
    pub payment_method: String,
    /// An optional external reference such as a transfer number.
    pub reference: Option<String>,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

/// The result of a recorded payment: the inserted payment row plus the
/// debt's balance after the payment settled.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    #[serde(flatten)]
    payment: Payment,
    paid_amount: i64,
    status: DebtStatus,
}

impl PaymentReceipt {
    /// The ID of the inserted payment row.
    pub fn payment_id(&self) -> DatabaseID {
        self.payment.id
    }

    /// The debt's paid amount after the payment settled, in cents.
    pub fn paid_amount(&self) -> i64 {
        self.paid_amount
    }

    /// The debt's status after the payment settled.
    pub fn status(&self) -> DebtStatus {
        self.status
    }
}

/// The balance fields read under the write lock.
struct DebtBalance {
    amount: i64,
    paid_amount: i64,
}

/// Record a payment towards one of `owner`'s debts and update the debt's
/// balance, atomically.
///
/// The transaction takes the write lock up front so the debt's balance
/// cannot change between the read and the update. If any step fails the
/// whole payment rolls back: no payment row without a balance update and
/// vice versa.
///
/// The new status is recomputed from the updated balance: `paid` once the
/// paid amount reaches the principal, `pending` otherwise. An explicit
/// `overdue` status is cleared by the recomputation.
///
/// # Errors
/// Returns [Error::NotFound] if the debt does not exist or belongs to a
/// different user.
pub fn apply_payment(
    connection: &mut Connection,
    owner: UserID,
    request: PaymentRequest,
) -> Result<PaymentReceipt, Error> {
    let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let balance = find_owned_debt_for_update(&transaction, request.debt_id, owner)?;

    let payment = insert_payment(&transaction, &request)?;

    let new_paid_amount = balance.paid_amount + request.amount;
    let new_status = if new_paid_amount >= balance.amount {
        DebtStatus::Paid
    } else {
        DebtStatus::Pending
    };

    update_debt_paid_state(&transaction, request.debt_id, new_paid_amount, new_status)?;

    transaction.commit()?;

    Ok(PaymentReceipt {
        payment,
        paid_amount: new_paid_amount,
        status: new_status,
    })
}

fn find_owned_debt_for_update(
    transaction: &Transaction,
    debt_id: DatabaseID,
    owner: UserID,
) -> Result<DebtBalance, Error> {
    transaction
        .query_row(
            "SELECT amount, paid_amount FROM debts WHERE id = :debt_id AND user_id = :user_id",
            named_params! {":debt_id": debt_id, ":user_id": owner.as_i64()},
            |row| {
                Ok(DebtBalance {
                    amount: row.get(0)?,
                    paid_amount: row.get(1)?,
                })
            },
        )
        .map_err(|e| e.into())
}

fn insert_payment(
    transaction: &Transaction,
    request: &PaymentRequest,
) -> Result<Payment, Error> {
    let created_at = Utc::now();

    transaction.execute(
        "INSERT INTO payment_history (debt_id, amount, payment_date, payment_method, reference, notes, created_at)
         VALUES (:debt_id, :amount, :payment_date, :payment_method, :reference, :notes, :created_at)",
        named_params! {
            ":debt_id": request.debt_id,
            ":amount": request.amount,
            ":payment_date": request.payment_date,
            ":payment_method": request.payment_method,
            ":reference": request.reference,
            ":notes": request.notes,
            ":created_at": created_at,
        },
    )?;

    let payment = transaction.query_row(
        &format!("SELECT {PAYMENT_COLUMNS} FROM payment_history WHERE id = last_insert_rowid()"),
        [],
        map_payment_row,
    )?;

    Ok(payment)
}

fn update_debt_paid_state(
    transaction: &Transaction,
    debt_id: DatabaseID,
    paid_amount: i64,
    status: DebtStatus,
) -> Result<(), Error> {
    transaction.execute(
        "UPDATE debts SET paid_amount = :paid_amount, status = :status WHERE id = :debt_id",
        named_params! {
            ":paid_amount": paid_amount,
            ":status": status.to_string(),
            ":debt_id": debt_id,
        },
    )?;

    Ok(())
}
