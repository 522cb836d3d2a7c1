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

//! REST interface for the feeding event service.

use crate::driver::Driver;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

mod feeding_delete;
mod feeding_get;
mod feeding_put;
mod feedings_get;
mod feedings_post;
#[cfg(test)]
mod testutils;

/// Creates the router for the application.
///
/// Cross-origin requests are accepted from any origin with any method and headers.
pub(crate) fn app(driver: Driver) -> Router {
    use axum::routing::get;

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/tratos", get(feedings_get::handler).post(feedings_post::handler))
        .route("/tratos/", get(feedings_get::handler).post(feedings_post::handler))
        .route(
            "/tratos/:id",
            get(feeding_get::handler).put(feeding_put::handler).delete(feeding_delete::handler),
        )
        .layer(cors)
        .with_state(driver)
}

#[cfg(test)]
mod tests {
    use super::feedings_post::CreateRequest;
    use super::testutils::*;
    use crate::model::FeedingEvent;
    use axum::http::{self, Method, StatusCode};
    use tratos_core::rest::testutils::*;

    #[tokio::test]
    async fn test_e2e_feeding_lifecycle() {
        let context = TestContext::setup().await;

        let request = serde_json::json!({
            "batch_id": "Lote 05A",
            "feed_type": "Engorda",
            "silo_weight_before": 500.0,
            "silo_weight_after": 120.0,
        });
        let created = OneShotBuilder::new(context.app(), (Method::POST, "/tratos/"))
            .send_json(request)
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<FeedingEvent>()
            .await;
        assert_eq!("Lote 05A", created.animal_batch().as_str());
        assert_eq!(380.0, *created.weight_supplied());
        let path = format!("/tratos/{}", created.id());

        let fetched = OneShotBuilder::new(context.app(), (Method::GET, &path))
            .send_empty()
            .await
            .expect_json::<FeedingEvent>()
            .await;
        assert_eq!(created, fetched);

        let updated = OneShotBuilder::new(context.app(), (Method::PUT, &path))
            .send_json(serde_json::json!({"silo_weight_after": 200.0}))
            .await
            .expect_json::<FeedingEvent>()
            .await;
        assert_eq!(300.0, *updated.weight_supplied());
        assert_eq!(created.feeding_datetime(), updated.feeding_datetime());

        OneShotBuilder::new(context.app(), (Method::PUT, &path))
            .send_json(serde_json::json!({"silo_weight_after": 900.0}))
            .await
            .expect_status(StatusCode::UNPROCESSABLE_ENTITY)
            .expect_field_errors(&["silo_weight_after"])
            .await;

        let listed = OneShotBuilder::new(context.app(), (Method::GET, "/tratos"))
            .send_empty()
            .await
            .expect_json::<Vec<FeedingEvent>>()
            .await;
        assert_eq!(vec![updated], listed);

        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, &path))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("Feeding event [0-9]+ not found")
            .await;

        OneShotBuilder::new(context.app(), (Method::DELETE, &path))
            .send_empty()
            .await
            .expect_status(StatusCode::NOT_FOUND)
            .expect_error("not found")
            .await;
    }

    #[tokio::test]
    async fn test_create_rejected_before_persistence() {
        let context = TestContext::setup().await;

        let request = CreateRequest {
            animal_batch: Some("Lote 05A".to_owned()),
            feed_type: Some("Engorda".to_owned()),
            silo_weight_before: Some(100.0),
            silo_weight_after: Some(150.0),
        };
        OneShotBuilder::new(context.app(), (Method::POST, "/tratos"))
            .send_json(request)
            .await
            .expect_status(StatusCode::UNPROCESSABLE_ENTITY)
            .expect_field_errors(&["silo_weight_after"])
            .await;

        assert_eq!(0, context.count().await);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.into_app(), (Method::GET, "/tratos"))
            .with_header(http::header::ORIGIN, "http://frontend.example.com")
            .send_empty()
            .await
            .take_response()
            .await;
        assert_eq!(
            "*",
            response.headers().get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap()
        );
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.into_app(), (Method::OPTIONS, "/tratos/1"))
            .with_header(http::header::ORIGIN, "http://frontend.example.com")
            .with_header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
            .send_empty()
            .await
            .take_response()
            .await;
        assert_eq!(
            "*",
            response.headers().get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap()
        );
    }
}
