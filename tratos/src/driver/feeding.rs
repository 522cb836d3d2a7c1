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

//! Operations on one feeding event.

use crate::db;
use crate::driver::{Driver, map_feeding_error};
use crate::model::{FeedingEvent, FeedingId, FeedingUpdate};
use log::info;
use tratos_core::driver::DriverResult;

impl Driver {
    /// Deletes the feeding event identified by `id`.
    pub(crate) async fn delete_feeding(self, id: FeedingId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::delete_feeding(tx.ex(), id).await.map_err(|e| map_feeding_error(e, id))?;
        tx.commit().await?;

        info!("Deleted feeding event {}", id);
        Ok(())
    }

    /// Gets the feeding event identified by `id`.
    pub(crate) async fn get_feeding(self, id: FeedingId) -> DriverResult<FeedingEvent> {
        let event = db::get_feeding(&mut self.db.ex().await?, id)
            .await
            .map_err(|e| map_feeding_error(e, id))?;
        Ok(event)
    }

    /// Applies `update` to the feeding event identified by `id` and returns the merged event.
    ///
    /// The dispensed weight is recomputed from the merged silo weights, which must remain
    /// properly ordered.  Nothing is persisted if they are not.
    pub(crate) async fn update_feeding(
        self,
        id: FeedingId,
        update: FeedingUpdate,
    ) -> DriverResult<FeedingEvent> {
        let mut tx = self.db.begin().await?;
        let event = db::get_feeding(tx.ex(), id).await.map_err(|e| map_feeding_error(e, id))?;
        let event = event.apply(update)?;
        db::update_feeding(tx.ex(), &event).await.map_err(|e| map_feeding_error(e, id))?;
        tx.commit().await?;

        info!("Updated feeding event {}", id);
        Ok(event)
    }
}
