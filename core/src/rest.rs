// Tratos
// Copyright 2026 The Tratos Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Generic code for REST handlers.
//!
//! All services should implement an `app` function in their `rest` module that returns the
//! `Router` for the application.
//!
//! Every API should be put in its own `.rs` file, using a name like `<entity>_<method>.rs`.  This
//! may seem overkill, but putting every API in its own file makes it easy to ensure all the
//! integration tests for the given API truly belong to that API.
//!
//! More specifically, the `tests` module within an API should define a `route` method that
//! returns the HTTP method and the API path under test.  All integration tests within the module
//! then rely on `route` to obtain this information, ensuring that they all test the desired API.

use crate::driver::DriverError;
use crate::model::{FieldError, ModelError, ValidationError};
use async_trait::async_trait;
use axum::Json;
use axum::body::{Bytes, HttpBody};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::response::IntoResponse;
use http::request::Parts;
use log::error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Frontend errors.  These are the errors that are visible to the user on failed requests.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RestError {
    /// Catch-all error type for all unexpected errors.
    #[error("{0}")]
    InternalError(String),

    /// Indicates an error in the contents of the request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Indicates that a requested entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that a request that should have empty content did not.
    #[error("Content should be empty")]
    PayloadNotEmpty,

    /// Indicates that the request was well-formed but some of its fields hold unacceptable values.
    #[error("{0}")]
    UnprocessableEntity(ValidationError),

    /// Indicates that the request carried a payload that is not JSON.
    #[error("Expected request with `Content-Type: application/json`")]
    UnsupportedMediaType,
}

impl From<DriverError> for RestError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::BackendError(_) => RestError::InternalError(e.to_string()),
            DriverError::InvalidInput(errors) => RestError::UnprocessableEntity(errors),
            DriverError::NotFound(_) => RestError::NotFound(e.to_string()),
        }
    }
}

impl From<ValidationError> for RestError {
    fn from(e: ValidationError) -> Self {
        RestError::UnprocessableEntity(e)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            RestError::InternalError(_) => {
                error!("Request failed: {}", self);
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
            RestError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RestError::NotFound(_) => http::StatusCode::NOT_FOUND,
            RestError::PayloadNotEmpty => http::StatusCode::PAYLOAD_TOO_LARGE,
            RestError::UnprocessableEntity(_) => http::StatusCode::UNPROCESSABLE_ENTITY,
            RestError::UnsupportedMediaType => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };

        let fields = match &self {
            RestError::UnprocessableEntity(errors) => errors.fields().to_vec(),
            _ => vec![],
        };
        let response = ErrorResponse { message: self.to_string(), fields };

        (status, Json(response)).into_response()
    }
}

/// Result type for this module.
pub type RestResult<T> = Result<T, RestError>;

/// Representation of the details of an error response.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// Textual representation of the error message.
    pub(crate) message: String,

    /// Fields that caused the request to be rejected, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) fields: Vec<FieldError>,
}

/// A request body extractor that forbids any content.
///
/// Any API that doesn't expect a body should use this to ensure we don't get garbage data that we
/// don't care about.  This future-proofs the service.
pub struct EmptyBody {}

#[async_trait]
impl<S> FromRequest<S> for EmptyBody
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if req.into_body().is_end_stream() {
            Ok(EmptyBody {})
        } else {
            Err(RestError::PayloadNotEmpty)
        }
    }
}

/// Returns true if the `headers` declare a JSON payload.
fn has_json_content_type(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|ct| {
            ct.type_() == mime::APPLICATION
                && (ct.subtype() == mime::JSON || ct.suffix().is_some_and(|s| s == mime::JSON))
        })
}

/// Converts a failure to deserialize a JSON payload into a `RestError`.
///
/// Values of the wrong type are blamed on the field that holds them, using the dotted path to the
/// field as its name, or `body` when the payload as a whole has the wrong shape.
fn map_json_error(e: serde_path_to_error::Error<serde_json::Error>) -> RestError {
    match e.inner().classify() {
        serde_json::error::Category::Data => {
            let field = match e.path().to_string() {
                path if path == "." => "body".to_owned(),
                path => path,
            };
            let message = ModelError(e.into_inner().to_string());
            RestError::UnprocessableEntity(ValidationError::single(field, message))
        }
        serde_json::error::Category::Syntax
        | serde_json::error::Category::Eof
        | serde_json::error::Category::Io => {
            RestError::InvalidRequest(format!("Malformed JSON payload: {}", e.inner()))
        }
    }
}

/// A request body extractor for JSON payloads that reports problems as `RestError`s.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(RestError::UnsupportedMediaType);
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| RestError::InvalidRequest(e.body_text()))?;
        let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
        serde_path_to_error::deserialize(deserializer).map(JsonBody).map_err(map_json_error)
    }
}

/// A path parameters extractor that reports problems as `RestError`s.
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParams(value)),
            Err(e) if e.status().is_client_error() => Err(RestError::InvalidRequest(e.body_text())),
            Err(e) => Err(RestError::InternalError(e.body_text())),
        }
    }
}

/// A query string extractor that reports problems as `RestError`s.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(e) => Err(RestError::InvalidRequest(e.body_text())),
        }
    }
}

/// Common test code for the REST server.
#[cfg(feature = "testutils")]
pub mod testutils {
    use super::*;
    use axum::Router;
    use axum::http::{self, HeaderName, HeaderValue};
    use tower::util::ServiceExt;

    /// Maximum body size for testing purposes.
    const MAX_BODY_SIZE: usize = 64 * 1024;

    /// Builder for a single request to the API server.
    #[must_use]
    pub struct OneShotBuilder {
        /// The router for the app being tested.
        app: Router,

        /// Builder for the request that will be sent to the app.
        builder: axum::http::request::Builder,
    }

    impl OneShotBuilder {
        /// Creates a new request against a given `method`/`uri` pair served by an `app` router.
        pub fn new<U: AsRef<str>>(app: Router, (method, uri): (http::Method, U)) -> Self {
            let builder = http::Request::builder().method(method).uri(uri.as_ref());
            Self { app, builder }
        }

        /// Extends the URI in the request with a `query`.
        pub fn with_query<Q: Serialize>(mut self, query: Q) -> Self {
            let uri = self.builder.uri_ref().unwrap().to_string();
            assert!(!uri.contains('?'), "URI already contains a query: {}", uri);
            self.builder = self.builder.uri(format!(
                "{}?{}",
                uri,
                serde_urlencoded::to_string(query).unwrap()
            ));
            self
        }

        /// Sets the header `name` to `value` in the outgoing request.
        pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
        where
            HeaderName: TryFrom<K>,
            <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
            HeaderValue: TryFrom<V>,
            <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
        {
            self.builder = self.builder.header(name, value);
            self
        }

        /// Finishes building the request and sends it with an empty payload.
        pub async fn send_empty(self) -> ResponseChecker {
            let request = self.builder.body(axum::body::Body::empty()).unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a text payload.
        pub async fn send_text<T: Into<String>>(self, text: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::TEXT_PLAIN.as_ref())
                .body(axum::body::Body::from(text.into()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }

        /// Finishes building the request and sends it with a JSON payload.
        pub async fn send_json<T: Serialize>(self, request: T) -> ResponseChecker {
            let request = self
                .builder
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(axum::body::Body::from(serde_json::to_vec(&request).unwrap()))
                .unwrap();
            ResponseChecker::from(self.app.oneshot(request).await.unwrap())
        }
    }

    /// Type alias for the complex type returned by the `oneshot` function.
    type HttpResponse = http::Response<axum::body::Body>;

    /// Validator for the outcome of a request sent by a `OneShotBuilder`.
    #[must_use]
    pub struct ResponseChecker {
        /// Actual response that we received from the app.
        response: HttpResponse,

        /// Expected HTTP status code in the response above.
        exp_status: http::StatusCode,
    }

    impl From<HttpResponse> for ResponseChecker {
        fn from(response: HttpResponse) -> Self {
            Self { response, exp_status: http::StatusCode::OK }
        }
    }

    impl ResponseChecker {
        /// Sets the expected exit HTTP status to `status`.
        pub fn expect_status(mut self, status: http::StatusCode) -> Self {
            self.exp_status = status;
            self
        }

        /// Performs common validation operations on the response.
        pub fn verify(&self) {
            assert_eq!(self.exp_status, self.response.status());
        }

        /// Consumes the response and returns its body.
        async fn take_body(self) -> Vec<u8> {
            self.verify();
            axum::body::to_bytes(self.response.into_body(), MAX_BODY_SIZE).await.unwrap().to_vec()
        }

        /// Consumes the response and parses its body as an `ErrorResponse`.
        async fn take_error(self) -> ErrorResponse {
            let body = self.take_body().await;
            match serde_json::from_slice(&body) {
                Ok(response) => response,
                Err(e) => {
                    let body = String::from_utf8(body).unwrap();
                    panic!("Invalid error response due to {}; content was {}", e, body);
                }
            }
        }

        /// Finishes checking the response and expects it to contain an empty body.
        pub async fn expect_empty(self) {
            let body = String::from_utf8(self.take_body().await).unwrap();
            assert!(body.is_empty(), "Body not empty; got {}", body);
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` that
        /// matches `exp_re`.
        pub async fn expect_error(self, exp_re: &str) {
            let response = self.take_error().await;
            let re = regex::Regex::new(exp_re).unwrap();
            assert!(
                re.is_match(&response.message),
                "Response content '{:?}' does not match re '{}'",
                response,
                exp_re
            );
        }

        /// Finishes checking the response and expects its body to be an `ErrorResponse` that
        /// blames exactly the `exp_fields`, in order.
        pub async fn expect_field_errors(self, exp_fields: &[&str]) {
            let response = self.take_error().await;
            let fields = response.fields.iter().map(|f| f.field.as_str()).collect::<Vec<&str>>();
            assert_eq!(exp_fields, fields.as_slice(), "Unexpected fields in {:?}", response);
        }

        /// Finishes checking the response and expects it to contain a valid JSON object of
        /// type `T`.
        pub async fn expect_json<T: DeserializeOwned>(self) -> T {
            let body = self.take_body().await;
            serde_json::from_slice::<T>(&body).unwrap()
        }

        /// Finishes checking the response and returns the response itself for out of band
        /// validation of properties not supported by the `ResponseChecker`.
        pub async fn take_response(self) -> HttpResponse {
            self.verify();
            self.response
        }
    }

    /// Generates a test to verify that an API that expects JSON fails when it gets something else.
    #[macro_export]
    macro_rules! test_payload_must_be_json {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_json() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE)
                    .expect_error("Content-Type")
                    .await;

                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .with_header(axum::http::header::CONTENT_TYPE, "application/json")
                    .send_text("this is not json")
                    .await
                    .expect_status(axum::http::StatusCode::BAD_REQUEST)
                    .expect_error("Malformed JSON payload: expected ident")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_json;

    /// Generates a test to verify that an API that does not expect a payload fails as necessary.
    #[macro_export]
    macro_rules! test_payload_must_be_empty {
        ( $app:expr, $route:expr ) => {
            #[tokio::test]
            async fn test_payload_must_be_empty() {
                $crate::rest::testutils::OneShotBuilder::new($app, $route)
                    .send_text("should not be here")
                    .await
                    .expect_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE)
                    .expect_error("should be empty")
                    .await;
            }
        };
    }

    pub use test_payload_must_be_empty;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Converts `error` into a response and returns its status code and decoded body.
    async fn into_parts(error: RestError) -> (http::StatusCode, ErrorResponse) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let (status, body) = into_parts(RestError::NotFound("Thing 3 not found".to_owned())).await;
        assert_eq!(http::StatusCode::NOT_FOUND, status);
        assert_eq!("Thing 3 not found", body.message);
        assert!(body.fields.is_empty());
    }

    #[tokio::test]
    async fn test_unprocessable_entity_response_lists_fields() {
        let mut errors = ValidationError::default();
        errors.add("first", ModelError("Too short".to_owned()));
        errors.add("second", ModelError("Too long".to_owned()));
        let (status, body) = into_parts(RestError::UnprocessableEntity(errors.clone())).await;
        assert_eq!(http::StatusCode::UNPROCESSABLE_ENTITY, status);
        assert_eq!("Invalid request: first: Too short; second: Too long", body.message);
        assert_eq!(errors.fields(), body.fields.as_slice());
    }

    #[tokio::test]
    async fn test_internal_error_response() {
        let (status, body) = into_parts(RestError::InternalError("Boom".to_owned())).await;
        assert_eq!(http::StatusCode::INTERNAL_SERVER_ERROR, status);
        assert_eq!("Boom", body.message);
    }

    #[test]
    fn test_from_driver_error() {
        assert_eq!(
            RestError::NotFound("Thing 3 not found".to_owned()),
            DriverError::NotFound("Thing 3 not found".to_owned()).into()
        );
        assert_eq!(
            RestError::InternalError("Boom".to_owned()),
            DriverError::BackendError("Boom".to_owned()).into()
        );
        let errors = ValidationError::single("field", ModelError("Bad".to_owned()));
        assert_eq!(
            RestError::UnprocessableEntity(errors.clone()),
            DriverError::InvalidInput(errors).into()
        );
    }

    #[tokio::test]
    async fn test_unsupported_media_type_response() {
        let (status, body) = into_parts(RestError::UnsupportedMediaType).await;
        assert_eq!(http::StatusCode::UNSUPPORTED_MEDIA_TYPE, status);
        assert!(body.message.contains("Content-Type"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        weight: f64,
    }

    /// Extracts a `Sample` from a request carrying `body` with the given `content_type`.
    async fn extract_json(content_type: &str, body: &str) -> Result<Sample, RestError> {
        let request = http::Request::builder()
            .header(http::header::CONTENT_TYPE, content_type)
            .body(axum::body::Body::from(body.to_owned()))
            .unwrap();
        JsonBody::<Sample>::from_request(request, &()).await.map(|JsonBody(sample)| sample)
    }

    #[tokio::test]
    async fn test_json_body_ok() {
        let exp = Sample { name: "abc".to_owned(), weight: 2.5 };
        let body = r#"{"name": "abc", "weight": 2.5}"#;
        assert_eq!(exp, extract_json("application/json", body).await.unwrap());
        assert_eq!(exp, extract_json("application/merge-patch+json", body).await.unwrap());
    }

    #[tokio::test]
    async fn test_json_body_wrong_type_blames_field() {
        let body = r#"{"name": "abc", "weight": "heavy"}"#;
        match extract_json("application/json", body).await {
            Err(RestError::UnprocessableEntity(errors)) => {
                assert_eq!(1, errors.fields().len());
                assert_eq!("weight", errors.fields()[0].field);
                assert!(errors.fields()[0].message.contains("invalid type"));
            }
            e => panic!("Expected a validation error but got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_json_body_wrong_shape_blames_body() {
        match extract_json("application/json", r#""abc""#).await {
            Err(RestError::UnprocessableEntity(errors)) => {
                assert_eq!(1, errors.fields().len());
                assert_eq!("body", errors.fields()[0].field);
            }
            e => panic!("Expected a validation error but got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_json_body_syntax_error() {
        match extract_json("application/json", r#"{"name": "#).await {
            Err(RestError::InvalidRequest(message)) => {
                assert!(message.starts_with("Malformed JSON payload: "), "{}", message);
            }
            e => panic!("Expected an invalid request error but got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_json_body_bad_content_type() {
        let body = r#"{"name": "abc", "weight": 2.5}"#;
        assert_eq!(Err(RestError::UnsupportedMediaType), extract_json("text/plain", body).await);
        assert_eq!(Err(RestError::UnsupportedMediaType), extract_json("not a mime", body).await);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        limit: Option<i64>,
    }

    /// Extracts a `Page` from the query string of `uri`.
    async fn extract_query(uri: &str) -> Result<Page, RestError> {
        let (mut parts, _body) = http::Request::builder().uri(uri).body(()).unwrap().into_parts();
        QueryParams::<Page>::from_request_parts(&mut parts, &()).await.map(|QueryParams(p)| p)
    }

    #[tokio::test]
    async fn test_query_params_ok() {
        assert_eq!(Page { limit: Some(3) }, extract_query("/things?limit=3").await.unwrap());
        assert_eq!(Page { limit: None }, extract_query("/things").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_params_invalid() {
        match extract_query("/things?limit=abc").await {
            Err(RestError::InvalidRequest(message)) => {
                assert!(message.starts_with("Failed to deserialize query string"), "{}", message);
            }
            e => panic!("Expected an invalid request error but got {:?}", e),
        }
    }
}
