//! The uniform JSON response envelope used by every endpoint.

use axum::{
    Json,
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Error;

/// A response of the form `{"error": bool, "message": string, ...data}`.
///
/// Business rule violations are reported with `error: true` and the status
/// code 200, so clients only need to inspect the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    error: bool,
    message: String,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl Envelope {
    /// Create a successful envelope with no data.
    pub fn success(message: &str) -> Self {
        Self {
            error: false,
            message: message.to_owned(),
            data: Map::new(),
        }
    }

    /// Create an error envelope.
    pub fn error(message: &str) -> Self {
        Self {
            error: true,
            message: message.to_owned(),
            data: Map::new(),
        }
    }

    /// Add `value` to the envelope under `key`.
    ///
    /// The keys `error` and `message` are reserved and will be ignored.
    ///
    /// # Errors
    ///
    /// Returns an [Error::JSONSerializationError] if `value` cannot be serialized.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Result<Self, Error> {
        if key == "error" || key == "message" {
            tracing::warn!("Ignoring reserved envelope key \"{key}\"");
            return Ok(self);
        }

        let value = serde_json::to_value(value)
            .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
        self.data.insert(key.to_owned(), value);

        Ok(self)
    }

    /// Whether the envelope reports an error.
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// The human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A JSON body extractor that reports malformed bodies as an error envelope.
///
/// Axum's [Json] extractor rejects a missing field or a wrong type with a 4xx
/// plain text response. This wrapper turns the rejection into
/// [Error::InvalidRequest] instead.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod envelope_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::json;

    use crate::{Envelope, Error};

    #[test]
    fn success_serializes_with_data_at_top_level() {
        let envelope = Envelope::success("Expense added successfully")
            .with("expense", json!({"title": "Coffee"}))
            .unwrap();

        let got = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            got,
            json!({
                "error": false,
                "message": "Expense added successfully",
                "expense": {"title": "Coffee"},
            })
        );
    }

    #[test]
    fn reserved_keys_are_not_overwritten() {
        let envelope = Envelope::success("ok").with("error", true).unwrap();

        assert!(!envelope.is_error());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"error": false, "message": "ok"})
        );
    }

    #[tokio::test]
    async fn malformed_json_is_an_error_envelope() {
        use axum::{Router, routing::post};
        use axum_test::TestServer;
        use serde::Deserialize;

        use crate::envelope::ApiJson;

        #[derive(Deserialize)]
        struct Body {
            #[allow(dead_code)]
            title: String,
        }

        async fn handler(ApiJson(_): ApiJson<Body>) -> Envelope {
            Envelope::success("ok")
        }

        let server = TestServer::try_new(Router::new().route("/", post(handler))).unwrap();

        let response = server.post("/").json(&json!({"amount": 1})).await;

        response.assert_status_ok();
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["error"], true);
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request:")
        );
    }

    #[test]
    fn errors_use_status_ok() {
        let response = Error::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
