//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    auth::{auth_guard, get_is_authenticated, get_log_out, post_log_in, register_user},
    endpoints,
    summary::get_summary,
    transaction::{
        add_expense_endpoint, add_income_endpoint, delete_expense_endpoint,
        delete_income_endpoint, edit_expense_endpoint, edit_income_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Cross-origin requests with credentials are only accepted from `allowed_origin`.
pub fn build_router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::IS_AUTHENTICATED, get(get_is_authenticated));

    let protected_routes = Router::new()
        .route(endpoints::ADD_EXPENSE, post(add_expense_endpoint))
        .route(endpoints::EDIT_EXPENSE, put(edit_expense_endpoint))
        .route(endpoints::DELETE_EXPENSE, delete(delete_expense_endpoint))
        .route(endpoints::ADD_INCOME, post(add_income_endpoint))
        .route(endpoints::EDIT_INCOME, put(edit_income_endpoint))
        .route(endpoints::DELETE_INCOME, delete(delete_income_endpoint))
        .route(endpoints::SUMMARY, get(get_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(cors)
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}

#[cfg(test)]
mod routing_tests {
    use axum::http::{HeaderValue, header};
    use serde_json::json;

    use crate::{
        auth::COOKIE_SESSION,
        endpoints,
        test_utils::{assert_error, assert_success, get_test_server, register_test_user},
    };

    #[tokio::test]
    async fn unknown_route_is_not_found_envelope() {
        let server = get_test_server();

        let response = server.get("/does-not-exist").await;

        assert_error(&response, "The requested resource could not be found.");
    }

    #[tokio::test]
    async fn cors_allows_configured_origin_with_credentials() {
        let server = get_test_server();

        let response = server
            .get(endpoints::LOG_OUT)
            .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:3000"))
            .await;

        assert_success(&response);
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "http://localhost:3000"
        );
        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS),
            "true"
        );
    }

    #[tokio::test]
    async fn cors_ignores_other_origins() {
        let server = get_test_server();

        let response = server
            .get(endpoints::LOG_OUT)
            .add_header(header::ORIGIN, HeaderValue::from_static("http://evil.example"))
            .await;

        assert!(
            response
                .maybe_header(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn every_protected_route_requires_a_session() {
        let server = get_test_server();
        let body = json!({"title": "Coffee", "amount": 4, "category": "Food/Groceries"});

        assert_error(
            &server.post(endpoints::ADD_EXPENSE).json(&body).await,
            "Unauthorized access",
        );
        assert_error(
            &server.post(endpoints::ADD_INCOME).json(&body).await,
            "Unauthorized access",
        );
        assert_error(
            &server.put("/edit-expense/1").json(&body).await,
            "Unauthorized access",
        );
        assert_error(
            &server.put("/edit-income/1").json(&body).await,
            "Unauthorized access",
        );
        assert_error(
            &server.delete("/delete-expense/1").await,
            "Unauthorized access",
        );
        assert_error(
            &server.delete("/delete-income/1").await,
            "Unauthorized access",
        );
        assert_error(&server.get(endpoints::SUMMARY).await, "Unauthorized access");
    }

    #[tokio::test]
    async fn ref_lists_stay_consistent_through_add_edit_delete() {
        let server = get_test_server();
        let cookie = register_test_user(&server, "alice").await;
        let mut ids = Vec::new();
        for title in ["Rent", "Coffee", "Bus"] {
            let body = assert_success(
                &server
                    .post(endpoints::ADD_EXPENSE)
                    .add_cookie(cookie.clone())
                    .json(&json!({"title": title, "amount": 1, "category": "Miscellaneous"}))
                    .await,
            );
            ids.push(body["expense"]["id"].as_i64().unwrap());
        }
        assert_success(
            &server
                .put(&format!("/edit-expense/{}", ids[0]))
                .add_cookie(cookie.clone())
                .json(&json!({"title": "Rent", "amount": 900, "category": "Housing"}))
                .await,
        );
        assert_success(
            &server
                .delete(&format!("/delete-expense/{}", ids[1]))
                .add_cookie(cookie.clone())
                .await,
        );

        let profile = assert_success(
            &server
                .get(endpoints::IS_AUTHENTICATED)
                .add_cookie(cookie.clone())
                .await,
        );
        let mut listed: Vec<i64> = profile["user"]["expenses"]
            .as_array()
            .unwrap()
            .iter()
            .map(|expense| expense["id"].as_i64().unwrap())
            .collect();
        listed.sort();
        assert_eq!(listed, vec![ids[0], ids[2]]);

        let summary = assert_success(&server.get(endpoints::SUMMARY).add_cookie(cookie).await);
        assert_eq!(summary["summary"]["total_expenses"], 901.0);
    }

    #[tokio::test]
    async fn register_add_list_delete_scenario() {
        let server = get_test_server();
        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "secret1",
            }))
            .await;
        assert_success(&response);
        let cookie = response.cookie(COOKIE_SESSION);

        let body = assert_success(
            &server
                .post(endpoints::ADD_EXPENSE)
                .add_cookie(cookie.clone())
                .json(&json!({"title": "Coffee", "amount": 4, "category": "Food/Groceries"}))
                .await,
        );
        let id = body["expense"]["id"].as_i64().unwrap();

        let profile = assert_success(
            &server
                .get(endpoints::IS_AUTHENTICATED)
                .add_cookie(cookie.clone())
                .await,
        );
        let expenses = profile["user"]["expenses"].as_array().unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0]["amount"], 4.0);

        assert_success(
            &server
                .delete(&format!("/delete-expense/{id}"))
                .add_cookie(cookie.clone())
                .await,
        );

        let profile = assert_success(
            &server
                .get(endpoints::IS_AUTHENTICATED)
                .add_cookie(cookie)
                .await,
        );
        assert_eq!(profile["user"]["expenses"], json!([]));
    }
}
