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

//! High-level data types for feeding events.

use derive_getters::Getters;
use derive_more::Display;
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use tratos_core::model::{ModelError, ModelResult, ValidationError};

/// Maximum number of characters allowed in the textual fields of a feeding event.
const MAX_TEXT_LENGTH: usize = 100;

/// Validates that `value` is a non-empty text of at most `MAX_TEXT_LENGTH` characters.
fn validate_text(value: String) -> ModelResult<String> {
    let length = value.chars().count();
    if length == 0 || length > MAX_TEXT_LENGTH {
        return Err(ModelError(format!(
            "Must be between 1 and {} characters long",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(value)
}

/// Identifier of a feeding event, as assigned by the database.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct FeedingId(i64);

impl FeedingId {
    /// Creates a new identifier from its raw database representation.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the identifier as an integer suitable for database queries.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Identifier of the batch or pen of animals that received the feed.
#[derive(Clone, Debug, Display, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct BatchId(String);

impl BatchId {
    /// Creates a new batch identifier after validating its length.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        validate_text(s.into()).map(Self)
    }

    /// Returns a string view of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&'static str> for BatchId {
    fn from(s: &'static str) -> Self {
        Self::new(s).expect("Hardcoded batch ids must be valid")
    }
}

/// Name of the ration type given to a batch.
#[derive(Clone, Debug, Display, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct FeedType(String);

impl FeedType {
    /// Creates a new feed type after validating its length.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        validate_text(s.into()).map(Self)
    }

    /// Returns a string view of the feed type.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&'static str> for FeedType {
    fn from(s: &'static str) -> Self {
        Self::new(s).expect("Hardcoded feed types must be valid")
    }
}

/// Unwraps a field that clients must always supply.
pub fn required<T>(value: Option<T>) -> ModelResult<T> {
    value.ok_or_else(|| ModelError("Field is required".to_owned()))
}

/// Validates the silo weight measured before dispensing, in kilograms.
pub fn validate_weight_before(weight: f64) -> ModelResult<f64> {
    if !weight.is_finite() {
        return Err(ModelError("Must be a finite number".to_owned()));
    }
    if weight <= 0.0 {
        return Err(ModelError("Must be greater than 0".to_owned()));
    }
    Ok(weight)
}

/// Validates the silo weight measured after dispensing, in kilograms.
pub fn validate_weight_after(weight: f64) -> ModelResult<f64> {
    if !weight.is_finite() {
        return Err(ModelError("Must be a finite number".to_owned()));
    }
    if weight < 0.0 {
        return Err(ModelError("Must be greater than or equal to 0".to_owned()));
    }
    Ok(weight)
}

/// Checks that the silo did not gain weight while dispensing.
///
/// Violations are reported against the `silo_weight_after` field.
pub fn validate_weight_order(before: f64, after: f64) -> ModelResult<()> {
    if after > before {
        return Err(ModelError("Must not be greater than silo_weight_before".to_owned()));
    }
    Ok(())
}

/// Computes the weight of feed dispensed given the silo weights around the dispensing.
pub fn weight_supplied(before: f64, after: f64) -> f64 {
    before - after
}

/// A validated request to record a new feeding event.
#[derive(Debug, Getters, PartialEq)]
pub struct NewFeeding {
    /// The batch that received the feed.
    animal_batch: BatchId,

    /// The type of ration given.
    feed_type: FeedType,

    /// Silo weight before dispensing.
    silo_weight_before: f64,

    /// Silo weight after dispensing.
    silo_weight_after: f64,
}

impl NewFeeding {
    /// Creates a new feeding request, checking that the weights are properly ordered.
    pub fn new(
        animal_batch: BatchId,
        feed_type: FeedType,
        silo_weight_before: f64,
        silo_weight_after: f64,
    ) -> Result<Self, ValidationError> {
        validate_weight_order(silo_weight_before, silo_weight_after)
            .map_err(|e| ValidationError::single("silo_weight_after", e))?;
        Ok(Self { animal_batch, feed_type, silo_weight_before, silo_weight_after })
    }

    /// Returns the weight of feed dispensed according to the measured silo weights.
    pub fn weight_supplied(&self) -> f64 {
        weight_supplied(self.silo_weight_before, self.silo_weight_after)
    }
}

/// A validated set of changes to apply to an existing feeding event.
///
/// Fields set to `None` are left untouched.
#[derive(Debug, Default, PartialEq)]
pub struct FeedingUpdate {
    /// New batch for the event, if any.
    pub animal_batch: Option<BatchId>,

    /// New feed type for the event, if any.
    pub feed_type: Option<FeedType>,

    /// New silo weight before dispensing, if any.
    pub silo_weight_before: Option<f64>,

    /// New silo weight after dispensing, if any.
    pub silo_weight_after: Option<f64>,
}

/// A recorded feeding event.
#[derive(Clone, Debug, Getters, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct FeedingEvent {
    /// Identifier of the event.
    id: FeedingId,

    /// The batch that received the feed.
    animal_batch: BatchId,

    /// The type of ration given.
    feed_type: FeedType,

    /// Silo weight before dispensing.
    silo_weight_before: f64,

    /// Silo weight after dispensing.
    silo_weight_after: f64,

    /// Weight of feed dispensed.  Always derived from the two silo weights.
    weight_supplied: f64,

    /// Moment in which the event was recorded.
    #[serde(with = "time::serde::rfc3339")]
    feeding_datetime: OffsetDateTime,
}

impl FeedingEvent {
    /// Creates a feeding event from its stored representation.
    pub fn new(
        id: FeedingId,
        animal_batch: BatchId,
        feed_type: FeedType,
        silo_weight_before: f64,
        silo_weight_after: f64,
        weight_supplied: f64,
        feeding_datetime: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            animal_batch,
            feed_type,
            silo_weight_before,
            silo_weight_after,
            weight_supplied,
            feeding_datetime,
        }
    }

    /// Creates a feeding event for a `new` request that was assigned `id` at `feeding_datetime`.
    pub fn from_new(id: FeedingId, new: NewFeeding, feeding_datetime: OffsetDateTime) -> Self {
        let weight_supplied = new.weight_supplied();
        Self {
            id,
            animal_batch: new.animal_batch,
            feed_type: new.feed_type,
            silo_weight_before: new.silo_weight_before,
            silo_weight_after: new.silo_weight_after,
            weight_supplied,
            feeding_datetime,
        }
    }

    /// Merges `update` onto this event and recomputes the dispensed weight.
    ///
    /// The weight ordering is checked against the merged values so that partial updates cannot
    /// leave the event with more feed in the silo after dispensing than before.
    pub fn apply(self, update: FeedingUpdate) -> Result<Self, ValidationError> {
        let silo_weight_before = update.silo_weight_before.unwrap_or(self.silo_weight_before);
        let silo_weight_after = update.silo_weight_after.unwrap_or(self.silo_weight_after);
        validate_weight_order(silo_weight_before, silo_weight_after)
            .map_err(|e| ValidationError::single("silo_weight_after", e))?;

        Ok(Self {
            id: self.id,
            animal_batch: update.animal_batch.unwrap_or(self.animal_batch),
            feed_type: update.feed_type.unwrap_or(self.feed_type),
            silo_weight_before,
            silo_weight_after,
            weight_supplied: weight_supplied(silo_weight_before, silo_weight_after),
            feeding_datetime: self.feeding_datetime,
        })
    }
}

/// Default number of events returned by a listing when the client does not ask for a limit.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Window over the ordered list of feeding events.
#[derive(Clone, Copy, Debug, Getters, PartialEq)]
pub struct Pagination {
    /// Number of events to skip from the most recent one.
    skip: i64,

    /// Maximum number of events to return.
    limit: i64,
}

impl Pagination {
    /// Creates a pagination window, applying defaults to the unspecified values.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        let skip = errors.check(
            "skip",
            match skip.unwrap_or(0) {
                skip if skip < 0 => Err(ModelError("Must be greater than or equal to 0".to_owned())),
                skip => Ok(skip),
            },
        );
        let limit = errors.check(
            "limit",
            match limit.unwrap_or(DEFAULT_LIST_LIMIT) {
                limit if limit <= 0 => Err(ModelError("Must be greater than 0".to_owned())),
                limit => Ok(limit),
            },
        );

        match (skip, limit) {
            (Some(skip), Some(limit)) => Ok(Self { skip, limit }),
            _ => Err(errors),
        }
    }
}
