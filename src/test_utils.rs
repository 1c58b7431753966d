#![allow(missing_docs)]

use axum::http::HeaderValue;
use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{AppState, auth::COOKIE_SESSION, build_router, endpoints};

/// The lowest cost bcrypt accepts, keeps the tests fast.
pub(crate) const TEST_PASSWORD_COST: u32 = 4;

pub(crate) const TEST_PASSWORD: &str = "hunter2";

pub(crate) fn get_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");

    AppState::new(connection, "foobar")
        .expect("Could not initialize app state")
        .password_cost(TEST_PASSWORD_COST)
}

pub(crate) fn get_test_server_with_state(state: AppState) -> TestServer {
    let app = build_router(state, HeaderValue::from_static("http://localhost:3000"));

    TestServer::try_new(app).expect("Could not create test server.")
}

pub(crate) fn get_test_server() -> TestServer {
    get_test_server_with_state(get_test_state())
}

/// Register `username` with the email "{username}@example.com" and return the session cookie.
pub(crate) async fn register_test_user(server: &TestServer, username: &str) -> Cookie<'static> {
    let response = server
        .post(endpoints::REGISTER)
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
        }))
        .await;

    assert_success(&response);

    response.cookie(COOKIE_SESSION)
}

/// Assert the response is a 200 with a success envelope and return the body.
#[track_caller]
pub(crate) fn assert_success(response: &TestResponse) -> Value {
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(
        body["error"], false,
        "want success envelope, got {body:#}"
    );

    body
}

/// Assert the response is a 200 with an error envelope carrying `message`.
#[track_caller]
pub(crate) fn assert_error(response: &TestResponse, message: &str) {
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["error"], true, "want error envelope, got {body:#}");
    assert_eq!(body["message"], message);
}
