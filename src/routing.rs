//! This file defines the router for the REST API.

use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    AppState, auth, bank, debt, endpoints, notification, payment, statistics,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_index))
        .route(endpoints::REGISTER, post(auth::register_endpoint))
        .route(endpoints::LOG_IN, post(auth::log_in_endpoint))
        .route(
            endpoints::DEBTS,
            get(debt::list_debts_endpoint).post(debt::create_debt_endpoint),
        )
        .route(
            endpoints::DEBT,
            get(debt::get_debt_endpoint)
                .put(debt::update_debt_endpoint)
                .delete(debt::delete_debt_endpoint),
        )
        .route(endpoints::PAYMENTS, post(payment::create_payment_endpoint))
        .route(
            endpoints::DEBT_PAYMENTS,
            get(payment::get_payment_history_endpoint),
        )
        .route(
            endpoints::STATISTICS,
            get(statistics::get_statistics_endpoint),
        )
        .route(
            endpoints::NOTIFICATIONS,
            get(notification::list_notifications_endpoint),
        )
        .route(
            endpoints::NOTIFICATION_READ,
            put(notification::mark_notification_read_endpoint),
        )
        .route(endpoints::BANKS, get(bank::list_banks_endpoint))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A route handler that reports the server is up.
async fn get_index() -> Response {
    Json(json!({"message": "debt tracking API is running"})).into_response()
}

#[cfg(test)]
mod route_tests {
    use axum_test::TestServer;
    use chrono::{Duration, Utc};
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, UserID, endpoints, notification::insert_notification};

    use super::build_router;

    fn new_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "test-secret").unwrap();

        TestServer::new(build_router(state))
    }

    fn new_test_server_with_state() -> (TestServer, AppState) {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection, "test-secret").unwrap();
        let server = TestServer::new(build_router(state.clone()));

        (server, state)
    }

    async fn register_test_user(server: &TestServer, email: &str) -> String {
        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Carlos",
                "email": email,
                "password": "averystrongpassword",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        response.json::<Value>()["token"].as_str().unwrap().to_owned()
    }

    async fn create_test_debt(server: &TestServer, token: &str, amount: i64) -> i64 {
        let response = server
            .post(endpoints::DEBTS)
            .authorization_bearer(token)
            .json(&json!({
                "bank_name": "BCP",
                "description": "Car loan",
                "amount": amount,
                "due_date": Utc::now().date_naive(),
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn index_reports_ok() {
        let server = new_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_ok();
        assert!(response.json::<Value>()["message"].as_str().is_some());
    }

    #[tokio::test]
    async fn register_returns_token_and_user() {
        let server = new_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Carlos",
                "email": "carlos@example.com",
                "password": "averystrongpassword",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        let body = response.json::<Value>();
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["name"], "Carlos");
        assert_eq!(body["user"]["avatar"], "C");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_with_duplicate_email_is_a_conflict() {
        let server = new_test_server();
        register_test_user(&server, "carlos@example.com").await;

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Impostor",
                "email": "carlos@example.com",
                "password": "anotherpassword",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_with_missing_field_is_a_bad_request() {
        let server = new_test_server();

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "name": "Carlos",
                "email": "",
                "password": "averystrongpassword",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "email is required");
    }

    #[tokio::test]
    async fn log_in_with_correct_credentials_succeeds() {
        let server = new_test_server();
        register_test_user(&server, "carlos@example.com").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({
                "email": "carlos@example.com",
                "password": "averystrongpassword",
            }))
            .await;

        response.assert_status_ok();
        assert!(response.json::<Value>()["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_is_unauthorized() {
        let server = new_test_server();
        register_test_user(&server, "carlos@example.com").await;

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({
                "email": "carlos@example.com",
                "password": "thewrongpassword",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn log_in_with_unknown_email_is_unauthorized() {
        let server = new_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({
                "email": "nobody@example.com",
                "password": "whatever",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let server = new_test_server();

        let response = server.get(endpoints::DEBTS).await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_with_garbage_token_is_unauthorized() {
        let server = new_test_server();

        let response = server
            .get(endpoints::DEBTS)
            .authorization_bearer("not-a-token")
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn debt_crud_flow() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;

        let debt_id = create_test_debt(&server, &token, 100_000).await;

        let detail = server
            .get(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&token)
            .await;
        detail.assert_status_ok();
        let body = detail.json::<Value>();
        assert_eq!(body["amount"], 100_000);
        assert_eq!(body["paid_amount"], 0);
        assert_eq!(body["remaining_amount"], 100_000);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["urgency"], "due_today");

        let update = server
            .put(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&token)
            .json(&json!({"description": "Refinanced car loan"}))
            .await;
        update.assert_status_ok();
        assert_eq!(
            update.json::<Value>()["description"],
            "Refinanced car loan"
        );

        let listing = server
            .get(endpoints::DEBTS)
            .authorization_bearer(&token)
            .await;
        listing.assert_status_ok();
        assert_eq!(listing.json::<Value>().as_array().unwrap().len(), 1);

        let deletion = server
            .delete(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&token)
            .await;
        deletion.assert_status(axum::http::StatusCode::NO_CONTENT);

        let after_deletion = server
            .get(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&token)
            .await;
        after_deletion.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn debts_are_hidden_from_other_users() {
        let server = new_test_server();
        let owner_token = register_test_user(&server, "owner@example.com").await;
        let other_token = register_test_user(&server, "other@example.com").await;

        let debt_id = create_test_debt(&server, &owner_token, 100_000).await;

        let response = server
            .get(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&other_token)
            .await;

        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_debt_with_missing_amount_is_a_bad_request() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;

        let response = server
            .post(endpoints::DEBTS)
            .authorization_bearer(&token)
            .json(&json!({
                "bank_name": "BCP",
                "description": "Car loan",
                "due_date": Utc::now().date_naive(),
            }))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payment_flow_updates_the_debt() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;
        let debt_id = create_test_debt(&server, &token, 100_000).await;

        let partial = server
            .post(endpoints::PAYMENTS)
            .authorization_bearer(&token)
            .json(&json!({
                "debt_id": debt_id,
                "amount": 40_000,
                "payment_date": Utc::now().date_naive(),
            }))
            .await;
        partial.assert_status(axum::http::StatusCode::CREATED);
        let body = partial.json::<Value>();
        assert_eq!(body["paid_amount"], 40_000);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["payment_method"], "transfer");

        let settling = server
            .post(endpoints::PAYMENTS)
            .authorization_bearer(&token)
            .json(&json!({
                "debt_id": debt_id,
                "amount": 60_000,
                "payment_date": Utc::now().date_naive(),
                "payment_method": "cash",
            }))
            .await;
        settling.assert_status(axum::http::StatusCode::CREATED);
        assert_eq!(settling.json::<Value>()["status"], "paid");

        let history = server
            .get(&format!("/api/payments/debt/{debt_id}"))
            .authorization_bearer(&token)
            .await;
        history.assert_status_ok();
        let payments = history.json::<Value>();
        assert_eq!(payments.as_array().unwrap().len(), 2);
        assert_eq!(payments[0]["amount"], 60_000);
        assert_eq!(payments[1]["amount"], 40_000);

        let debt = server
            .get(&format!("/api/debts/{debt_id}"))
            .authorization_bearer(&token)
            .await;
        let body = debt.json::<Value>();
        assert_eq!(body["paid_amount"], 100_000);
        assert_eq!(body["remaining_amount"], 0);
        assert_eq!(body["urgency"], "normal");
    }

    #[tokio::test]
    async fn payment_towards_missing_debt_is_not_found() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;

        let response = server
            .post(endpoints::PAYMENTS)
            .authorization_bearer(&token)
            .json(&json!({
                "debt_id": 999,
                "amount": 10_000,
                "payment_date": Utc::now().date_naive(),
            }))
            .await;

        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payment_with_zero_amount_is_a_bad_request() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;
        let debt_id = create_test_debt(&server, &token, 100_000).await;

        let response = server
            .post(endpoints::PAYMENTS)
            .authorization_bearer(&token)
            .json(&json!({
                "debt_id": debt_id,
                "amount": 0,
            }))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn payment_history_of_another_users_debt_is_not_found() {
        let server = new_test_server();
        let owner_token = register_test_user(&server, "owner@example.com").await;
        let other_token = register_test_user(&server, "other@example.com").await;
        let debt_id = create_test_debt(&server, &owner_token, 100_000).await;

        let response = server
            .get(&format!("/api/payments/debt/{debt_id}"))
            .authorization_bearer(&other_token)
            .await;

        response.assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn statistics_reflect_recorded_debts() {
        let server = new_test_server();
        let token = register_test_user(&server, "carlos@example.com").await;

        let debt_id = create_test_debt(&server, &token, 100_000).await;
        create_test_debt(&server, &token, 50_000).await;

        server
            .post(endpoints::PAYMENTS)
            .authorization_bearer(&token)
            .json(&json!({
                "debt_id": debt_id,
                "amount": 100_000,
                "payment_date": Utc::now().date_naive(),
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let response = server
            .get(endpoints::STATISTICS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["total_debts"], 2);
        assert_eq!(body["pending_count"], 1);
        assert_eq!(body["paid_count"], 1);
        assert_eq!(body["total_amount"], 150_000);
        assert_eq!(body["total_paid"], 100_000);
        assert_eq!(body["total_remaining"], 50_000);
    }

    #[tokio::test]
    async fn notification_listing_and_read_flow() {
        let (server, state) = new_test_server_with_state();
        let token = register_test_user(&server, "carlos@example.com").await;

        let notification_id = {
            let connection = state.db_connection.lock().unwrap();
            insert_notification(
                UserID::new(1),
                None,
                "reminder",
                "Due soon",
                "Car loan due soon",
                &connection,
            )
            .unwrap()
            .id
        };

        let listing = server
            .get(endpoints::NOTIFICATIONS)
            .authorization_bearer(&token)
            .await;
        listing.assert_status_ok();
        let body = listing.json::<Value>();
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["type"], "reminder");
        assert_eq!(body[0]["is_read"], false);

        let mark_read = server
            .put(&format!("/api/notifications/{notification_id}/read"))
            .authorization_bearer(&token)
            .await;
        mark_read.assert_status_ok();
        assert_eq!(mark_read.json::<Value>()["success"], true);

        let unread = server
            .get(&format!("{}?is_read=false", endpoints::NOTIFICATIONS))
            .authorization_bearer(&token)
            .await;
        unread.assert_status_ok();
        assert!(unread.json::<Value>().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn banks_are_listed_without_a_token() {
        let server = new_test_server();

        let response = server.get(endpoints::BANKS).await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert!(body[0]["name"].as_str().is_some());
    }

    #[tokio::test]
    async fn expired_token_is_rejected_with_unauthorized() {
        let (server, _) = new_test_server_with_state();
        register_test_user(&server, "carlos@example.com").await;

        let expired_claims = crate::auth::Claims {
            id: UserID::new(1),
            email: email_address::EmailAddress::new_unchecked("carlos@example.com"),
            exp: ((Utc::now() - Duration::minutes(5)).timestamp()) as usize,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &expired_claims,
            &jsonwebtoken::EncodingKey::from_secret("test-secret".as_ref()),
        )
        .unwrap();

        let response = server
            .get(endpoints::DEBTS)
            .authorization_bearer(&token)
            .await;

        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "token has expired");
    }
}
