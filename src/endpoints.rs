//! The URIs for the API endpoints.

/// Liveness check.
pub const ROOT: &str = "/";
/// Create a user account and issue a token.
pub const REGISTER: &str = "/api/auth/register";
/// Exchange credentials for a token.
pub const LOG_IN: &str = "/api/auth/login";
/// List (GET) or create (POST) the caller's debts.
pub const DEBTS: &str = "/api/debts";
/// Fetch, update or delete a single debt.
pub const DEBT: &str = "/api/debts/{debt_id}";
/// Record a payment against a debt.
pub const PAYMENTS: &str = "/api/payments";
/// The payment history of one debt, newest first.
pub const DEBT_PAYMENTS: &str = "/api/payments/debt/{debt_id}";
/// Aggregate counts and sums over the caller's debts.
pub const STATISTICS: &str = "/api/statistics";
/// List the caller's notifications.
pub const NOTIFICATIONS: &str = "/api/notifications";
/// Mark one notification as read.
pub const NOTIFICATION_READ: &str = "/api/notifications/{notification_id}/read";
/// The static list of active banks.
pub const BANKS: &str = "/api/banks";
