//! Read-time classification of a debt's due-date proximity.

use chrono::NaiveDate;
use serde::Serialize;

use crate::debt::DebtStatus;

/// How urgently a debt needs attention, derived from its due date.
///
/// This is recomputed on every listing or detail read and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    /// Nothing due soon, or the debt is already paid.
    Normal,
    /// The due date is today.
    DueToday,
    /// The due date falls within the next seven days.
    DueSoon,
    /// The due date has passed.
    Overdue,
}

/// Classify how urgent a debt is as of `today`.
///
/// Paid debts are always [Urgency::Normal], regardless of their due date.
pub fn classify(due_date: NaiveDate, status: DebtStatus, today: NaiveDate) -> Urgency {
    if status == DebtStatus::Paid {
        return Urgency::Normal;
    }

    let days_until_due = (due_date - today).num_days();

    if days_until_due == 0 {
        Urgency::DueToday
    } else if (0..=7).contains(&days_until_due) {
        Urgency::DueSoon
    } else if days_until_due < 0 {
        Urgency::Overdue
    } else {
        Urgency::Normal
    }
}
