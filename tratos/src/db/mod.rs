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

//! Database abstraction to persist feeding events.

use crate::model::{BatchId, FeedType, FeedingEvent, FeedingId, NewFeeding, Pagination};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use time::OffsetDateTime;
#[cfg(feature = "postgres")]
use tratos_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use tratos_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use tratos_core::db::{DbError, DbResult, Executor};


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for FeedingEvent {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let animal_batch: String = row.try_get("animal_batch").map_err(postgres::map_sqlx_error)?;
        let feed_type: String = row.try_get("feed_type").map_err(postgres::map_sqlx_error)?;
        let silo_weight_before: f64 =
            row.try_get("silo_weight_before").map_err(postgres::map_sqlx_error)?;
        let silo_weight_after: f64 =
            row.try_get("silo_weight_after").map_err(postgres::map_sqlx_error)?;
        let weight_supplied: f64 =
            row.try_get("weight_supplied").map_err(postgres::map_sqlx_error)?;
        let feeding_datetime: OffsetDateTime =
            row.try_get("feeding_datetime").map_err(postgres::map_sqlx_error)?;

        Ok(FeedingEvent::new(
            FeedingId::new(id),
            BatchId::new(animal_batch)?,
            FeedType::new(feed_type)?,
            silo_weight_before,
            silo_weight_after,
            weight_supplied,
            feeding_datetime,
        ))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for FeedingEvent {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let animal_batch: String = row.try_get("animal_batch").map_err(sqlite::map_sqlx_error)?;
        let feed_type: String = row.try_get("feed_type").map_err(sqlite::map_sqlx_error)?;
        let silo_weight_before: f64 =
            row.try_get("silo_weight_before").map_err(sqlite::map_sqlx_error)?;
        let silo_weight_after: f64 =
            row.try_get("silo_weight_after").map_err(sqlite::map_sqlx_error)?;
        let weight_supplied: f64 =
            row.try_get("weight_supplied").map_err(sqlite::map_sqlx_error)?;
        let feeding_datetime_secs: i64 =
            row.try_get("feeding_datetime_secs").map_err(sqlite::map_sqlx_error)?;
        let feeding_datetime_nsecs: i64 =
            row.try_get("feeding_datetime_nsecs").map_err(sqlite::map_sqlx_error)?;

        Ok(FeedingEvent::new(
            FeedingId::new(id),
            BatchId::new(animal_batch)?,
            FeedType::new(feed_type)?,
            silo_weight_before,
            silo_weight_after,
            weight_supplied,
            build_timestamp(feeding_datetime_secs, feeding_datetime_nsecs)?,
        ))
    }
}

/// Stores a `new` feeding event that happened at `now` and returns it with its assigned id.
pub async fn create_feeding(
    ex: &mut Executor,
    new: NewFeeding,
    now: OffsetDateTime,
) -> DbResult<FeedingEvent> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO tratos (
                    animal_batch, feed_type,
                    silo_weight_before, silo_weight_after, weight_supplied,
                    feeding_datetime)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(new.animal_batch().as_str())
                .bind(new.feed_type().as_str())
                .bind(*new.silo_weight_before())
                .bind(*new.silo_weight_after())
                .bind(new.weight_supplied())
                .bind(now)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (now_secs, now_nsecs) = unpack_timestamp(now)?;

            let query_str = "
                INSERT INTO tratos (
                    animal_batch, feed_type,
                    silo_weight_before, silo_weight_after, weight_supplied,
                    feeding_datetime_secs, feeding_datetime_nsecs)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(new.animal_batch().as_str())
                .bind(new.feed_type().as_str())
                .bind(*new.silo_weight_before())
                .bind(*new.silo_weight_after())
                .bind(new.weight_supplied())
                .bind(now_secs)
                .bind(now_nsecs)
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(FeedingEvent::from_new(FeedingId::new(id), new, now))
}

/// Gets the feeding event identified by `id`.
pub async fn get_feeding(ex: &mut Executor, id: FeedingId) -> DbResult<FeedingEvent> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM tratos WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            FeedingEvent::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM tratos WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            FeedingEvent::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the feeding events within the `pagination` window, most recent first.
pub async fn list_feedings(
    ex: &mut Executor,
    pagination: Pagination,
) -> DbResult<Vec<FeedingEvent>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT * FROM tratos
                ORDER BY feeding_datetime DESC, id DESC
                LIMIT $1 OFFSET $2";
            let rows = sqlx::query(query_str)
                .bind(*pagination.limit())
                .bind(*pagination.skip())
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(FeedingEvent::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT * FROM tratos
                ORDER BY feeding_datetime_secs DESC, feeding_datetime_nsecs DESC, id DESC
                LIMIT ? OFFSET ?";
            let rows = sqlx::query(query_str)
                .bind(*pagination.limit())
                .bind(*pagination.skip())
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(FeedingEvent::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Overwrites the mutable fields of the stored feeding event that matches the id of `event`.
///
/// The recording time is never modified.
pub async fn update_feeding(ex: &mut Executor, event: &FeedingEvent) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE tratos
                SET animal_batch = $1, feed_type = $2,
                    silo_weight_before = $3, silo_weight_after = $4, weight_supplied = $5
                WHERE id = $6";
            let done = sqlx::query(query_str)
                .bind(event.animal_batch().as_str())
                .bind(event.feed_type().as_str())
                .bind(*event.silo_weight_before())
                .bind(*event.silo_weight_after())
                .bind(*event.weight_supplied())
                .bind(event.id().as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE tratos
                SET animal_batch = ?, feed_type = ?,
                    silo_weight_before = ?, silo_weight_after = ?, weight_supplied = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(event.animal_batch().as_str())
                .bind(event.feed_type().as_str())
                .bind(*event.silo_weight_before())
                .bind(*event.silo_weight_after())
                .bind(*event.weight_supplied())
                .bind(event.id().as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the feeding event identified by `id`.
pub async fn delete_feeding(ex: &mut Executor, id: FeedingId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM tratos WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM tratos WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}
