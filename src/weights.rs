// SPDX-License-Identifier: AGPL-3.0-only

//! Weighted value lists for multi-branch distance corrections.
//!
//! A `WeightedList` is validated at construction: weights must be
//! finite, positive, and (for normalized lists) sum to 1 within
//! [`crate::tolerances::WEIGHT_SUM`]. Branch averaging downstream
//! relies on that normalization.

use crate::error::{HazardError, Result};
use crate::tolerances;

/// A value with its branch weight.
#[derive(Debug, Clone)]
pub struct WeightedValue<T> {
    pub value: T,
    pub weight: f64,
}

/// An immutable list of weighted values, normalized to total weight 1.
#[derive(Debug, Clone)]
pub struct WeightedList<T> {
    values: Vec<WeightedValue<T>>,
}

impl<T> WeightedList<T> {
    /// Build from explicit weighted values, validating the weights.
    ///
    /// # Errors
    ///
    /// [`HazardError::InvalidWeights`] if the list is empty, any weight
    /// is non-positive or non-finite, or the weights don't sum to 1
    /// within tolerance.
    pub fn of(values: Vec<WeightedValue<T>>) -> Result<Self> {
        if values.is_empty() {
            return Err(HazardError::InvalidWeights("empty list".into()));
        }
        let mut sum = 0.0;
        for wv in &values {
            if !wv.weight.is_finite() || wv.weight <= 0.0 {
                return Err(HazardError::InvalidWeights(format!(
                    "weight {} is not a positive finite value",
                    wv.weight
                )));
            }
            sum += wv.weight;
        }
        if (sum - 1.0).abs() > tolerances::WEIGHT_SUM {
            return Err(HazardError::InvalidWeights(format!(
                "weights sum to {sum}, expected 1"
            )));
        }
        Ok(Self { values })
    }

    /// Evenly weighted list (weight 1/n each). Panics on an empty input
    /// — an even split of nothing is a programming error.
    #[must_use]
    pub fn evenly_weighted(values: Vec<T>) -> Self {
        assert!(!values.is_empty(), "evenly weighted list needs values");
        let w = 1.0 / values.len() as f64;
        Self {
            values: values
                .into_iter()
                .map(|value| WeightedValue { value, weight: w })
                .collect(),
        }
    }

    /// Single value with full weight.
    #[must_use]
    pub fn single(value: T) -> Self {
        Self {
            values: vec![WeightedValue { value, weight: 1.0 }],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn value(&self, i: usize) -> &T {
        &self.values[i].value
    }

    #[must_use]
    pub fn weight(&self, i: usize) -> f64 {
        self.values[i].weight
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightedValue<T>> {
        self.values.iter()
    }
}
