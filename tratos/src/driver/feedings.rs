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

//! Operations on the collection of feeding events.

use crate::db;
use crate::driver::Driver;
use crate::model::{FeedingEvent, NewFeeding, Pagination};
use log::info;
use tratos_core::driver::DriverResult;

impl Driver {
    /// Records a `new` feeding event that happens now.
    pub(crate) async fn create_feeding(self, new: NewFeeding) -> DriverResult<FeedingEvent> {
        let now = self.clock.now_utc();

        let mut tx = self.db.begin().await?;
        let event = db::create_feeding(tx.ex(), new, now).await?;
        tx.commit().await?;

        info!("Recorded feeding event {} for batch {}", event.id(), event.animal_batch());
        Ok(event)
    }

    /// Gets the feeding events within the `pagination` window, most recent first.
    pub(crate) async fn list_feedings(
        self,
        pagination: Pagination,
    ) -> DriverResult<Vec<FeedingEvent>> {
        let events = db::list_feedings(&mut self.db.ex().await?, pagination).await?;
        Ok(events)
    }
}
