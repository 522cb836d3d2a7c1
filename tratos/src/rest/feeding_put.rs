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

//! API to update one feeding event.

use crate::driver::Driver;
use crate::model::{
    BatchId, FeedType, FeedingEvent, FeedingId, FeedingUpdate, validate_weight_after,
    validate_weight_before, validate_weight_order,
};
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tratos_core::model::ValidationError;
use tratos_core::rest::{JsonBody, PathParams, RestResult};

/// Message sent to the server to modify a feeding event.
///
/// Absent and `null` fields leave the stored values untouched.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct UpdateRequest {
    /// New identifier of the batch that received the feed.
    #[serde(alias = "batch_id", skip_serializing_if = "Option::is_none")]
    pub(crate) animal_batch: Option<String>,

    /// New type of ration given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) feed_type: Option<String>,

    /// New silo weight before dispensing, in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) silo_weight_before: Option<f64>,

    /// New silo weight after dispensing, in kilograms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) silo_weight_after: Option<f64>,
}

impl TryFrom<UpdateRequest> for FeedingUpdate {
    type Error = ValidationError;

    fn try_from(request: UpdateRequest) -> Result<Self, Self::Error> {
        let mut errors = ValidationError::default();

        let animal_batch =
            request.animal_batch.and_then(|s| errors.check("animal_batch", BatchId::new(s)));
        let feed_type = request.feed_type.and_then(|s| errors.check("feed_type", FeedType::new(s)));
        let silo_weight_before = request
            .silo_weight_before
            .and_then(|w| errors.check("silo_weight_before", validate_weight_before(w)));
        let silo_weight_after = request
            .silo_weight_after
            .and_then(|w| errors.check("silo_weight_after", validate_weight_after(w)));

        // Weights supplied in isolation are checked against the stored ones once merged.
        if let (Some(before), Some(after)) = (silo_weight_before, silo_weight_after) {
            errors.check("silo_weight_after", validate_weight_order(before, after));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(FeedingUpdate { animal_batch, feed_type, silo_weight_before, silo_weight_after })
    }
}

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParams(id): PathParams<i64>,
    JsonBody(request): JsonBody<UpdateRequest>,
) -> RestResult<Json<FeedingEvent>> {
    let update = FeedingUpdate::try_from(request)?;
    let event = driver.update_feeding(FeedingId::new(id), update).await?;
    Ok(Json(event))
}
