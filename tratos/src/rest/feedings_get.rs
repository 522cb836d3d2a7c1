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

//! API to list the recorded feeding events.

use crate::driver::Driver;
use crate::model::{FeedingEvent, Pagination};
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tratos_core::rest::{EmptyBody, QueryParams, RestResult};

/// Query parameters that select the window of events to return.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct ListQuery {
    /// Number of events to skip, starting from the most recent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) skip: Option<i64>,

    /// Maximum number of events to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<i64>,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    QueryParams(query): QueryParams<ListQuery>,
    _: EmptyBody,
) -> RestResult<Json<Vec<FeedingEvent>>> {
    let pagination = Pagination::new(query.skip, query.limit)?;
    let events = driver.list_feedings(pagination).await?;
    Ok(Json(events))
}
