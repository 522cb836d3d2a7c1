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

//! API to record a new feeding event.

use crate::driver::Driver;
use crate::model::{
    BatchId, FeedType, NewFeeding, required, validate_weight_after, validate_weight_before,
    validate_weight_order,
};
use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tratos_core::model::ValidationError;
use tratos_core::rest::{JsonBody, RestResult};

/// Message sent to the server to record a feeding event.
///
/// All fields are optional at the wire level so that missing values are reported together with
/// any other invalid field.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct CreateRequest {
    /// Identifier of the batch that received the feed.
    #[serde(alias = "batch_id", skip_serializing_if = "Option::is_none")]
    pub(crate) animal_batch: Option<String>,

    /// Type of ration given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) feed_type: Option<String>,

    /// Silo weight before dispensing, in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) silo_weight_before: Option<f64>,

    /// Silo weight after dispensing, in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) silo_weight_after: Option<f64>,
}

impl TryFrom<CreateRequest> for NewFeeding {
    type Error = ValidationError;

    fn try_from(request: CreateRequest) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();

        let animal_batch =
            errors.check("animal_batch", required(request.animal_batch).and_then(BatchId::new));
        let feed_type =
            errors.check("feed_type", required(request.feed_type).and_then(FeedType::new));
        let before = errors.check(
            "silo_weight_before",
            required(request.silo_weight_before).and_then(validate_weight_before),
        );
        let after = errors.check(
            "silo_weight_after",
            required(request.silo_weight_after).and_then(validate_weight_after),
        );

        if let (Some(before), Some(after)) = (before, after) {
            errors.check("silo_weight_after", validate_weight_order(before, after));
        }

        match (animal_batch, feed_type, before, after) {
            (Some(animal_batch), Some(feed_type), Some(before), Some(after))
                if errors.is_empty() =>
            {
                NewFeeding::new(animal_batch, feed_type, before, after)
            }
            _ => Err(errors),
        }
    }
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    JsonBody(request): JsonBody<CreateRequest>,
) -> RestResult<impl IntoResponse> {
    let new = NewFeeding::try_from(request)?;
    let event = driver.create_feeding(new).await?;
    Ok((http::StatusCode::CREATED, Json(event)))
}
