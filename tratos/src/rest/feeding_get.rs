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

//! API to get one feeding event.

use crate::driver::Driver;
use crate::model::{FeedingEvent, FeedingId};
use axum::Json;
use axum::extract::State;
use tratos_core::rest::{EmptyBody, PathParams, RestResult};

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    PathParams(id): PathParams<i64>,
    _: EmptyBody,
) -> RestResult<Json<FeedingEvent>> {
    let event = driver.get_feeding(FeedingId::new(id)).await?;
    Ok(Json(event))
}
