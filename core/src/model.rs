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

//! Generic types to validate the data types of the domain model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for value validation problems.
///
/// Every value type in a service's model should validate its input at construction time and
/// return this error when the input is not acceptable.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Result type for this module.
pub type ModelResult<T> = Result<T, ModelError>;

/// Details about why the value of a single field was rejected.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as known to the client.
    pub field: String,

    /// Textual description of the problem.
    pub message: String,
}

/// Collection of all field-level problems found while validating a request.
///
/// Validation code should check every field and record every problem instead of stopping at the
/// first one so that clients can fix all of their mistakes at once.
#[derive(Clone, Debug, Default, PartialEq, thiserror::Error)]
pub struct ValidationError(Vec<FieldError>);

impl ValidationError {
    /// Creates a new validation error for a single `field` with the given `error`.
    pub fn single<F: Into<String>>(field: F, error: ModelError) -> Self {
        let mut errors = Self::default();
        errors.add(field, error);
        errors
    }

    /// Records that `field` failed validation with `error`.
    pub fn add<F: Into<String>>(&mut self, field: F, error: ModelError) {
        self.0.push(FieldError { field: field.into(), message: error.0 });
    }

    /// Records the failure of `result`, if any, against `field` and returns its value on success.
    pub fn check<F: Into<String>, T>(&mut self, field: F, result: ModelResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e);
                None
            }
        }
    }

    /// Returns true if no problems have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the recorded problems in the order in which they were found.
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid request")?;
        for (i, error) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, error.field, error.message)?;
        }
        Ok(())
    }
}
