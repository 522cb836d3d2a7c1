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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::Driver;
use crate::model::{FeedingEvent, FeedingId, NewFeeding, Pagination};
use crate::rest::app;
use axum::Router;
use std::sync::Arc;
use time::OffsetDateTime;
use tratos_core::clocks::testutils::MonotonicClock;
use tratos_core::db::{Db, DbError};

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the app.
    db: Arc<dyn Db + Send + Sync>,

    /// The router for the app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app using an in-memory database and a monotonic clock.
    pub(crate) async fn setup() -> Self {
        let db = Arc::from(tratos_core::db::sqlite::testutils::setup().await);
        let clock = Arc::from(MonotonicClock::new(100000));
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let app = app(Driver::new(db.clone(), clock));
        Self { db, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Stores a feeding event at `now` by directly modifying the backing database.
    pub(crate) async fn insert(
        &self,
        animal_batch: &'static str,
        before: f64,
        after: f64,
        now: OffsetDateTime,
    ) -> FeedingEvent {
        let new = NewFeeding::new(animal_batch.into(), "Engorda".into(), before, after).unwrap();
        db::create_feeding(&mut self.db.ex().await.unwrap(), new, now).await.unwrap()
    }

    /// Fetches a feeding event by directly querying the backing database.
    pub(crate) async fn get(&self, id: FeedingId) -> Option<FeedingEvent> {
        match db::get_feeding(&mut self.db.ex().await.unwrap(), id).await {
            Ok(event) => Some(event),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("{:?}", e),
        }
    }

    /// Counts the feeding events stored in the backing database.
    pub(crate) async fn count(&self) -> usize {
        let all = Pagination::new(None, Some(i64::MAX)).unwrap();
        db::list_feedings(&mut self.db.ex().await.unwrap(), all).await.unwrap().len()
    }
}
