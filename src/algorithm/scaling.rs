//! Feature standardisation
//!
//! Fitting produces an immutable scaler holding the column means and
//! standard deviations; transforming never changes it.

use crate::algorithm::features::FeatureMatrix;
use crate::models::{FEATURE_COUNT, FeatureVector};

/// Fitted zero-mean, unit-variance scaler
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: FeatureVector,
    scales: FeatureVector,
}

impl StandardScaler {
    /// Fit on the whole population.
    ///
    /// Uses the population standard deviation. Constant columns get a scale
    /// of 1 so they transform to 0 instead of NaN. An empty matrix yields
    /// the identity transform.
    #[must_use]
    pub fn fit(matrix: &FeatureMatrix) -> Self {
        let mut means = [0.0; FEATURE_COUNT];
        let mut scales = [1.0; FEATURE_COUNT];
        if matrix.is_empty() {
            return Self { means, scales };
        }

        let n = matrix.len() as f64;
        for feature in 0..FEATURE_COUNT {
            let mean = matrix.column(feature).sum::<f64>() / n;
            let variance = matrix
                .column(feature)
                .map(|v| (v - mean).powi(2))
                .sum::<f64>()
                / n;
            let std = variance.sqrt();

            means[feature] = mean;
            scales[feature] = if std > f64::EPSILON * mean.abs().max(1.0) {
                std
            } else {
                1.0
            };
        }

        Self { means, scales }
    }

    /// Standardise one row
    #[must_use]
    pub fn transform_row(&self, row: &FeatureVector) -> FeatureVector {
        std::array::from_fn(|i| (row[i] - self.means[i]) / self.scales[i])
    }

    /// Standardise every row
    #[must_use]
    pub fn transform(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        matrix
            .rows()
            .iter()
            .map(|row| self.transform_row(row))
            .collect::<Vec<_>>()
            .into()
    }

    /// Fit on `matrix` and return it standardised alongside the scaler
    #[must_use]
    pub fn fit_transform(matrix: &FeatureMatrix) -> (Self, FeatureMatrix) {
        let scaler = Self::fit(matrix);
        let scaled = scaler.transform(matrix);
        (scaler, scaled)
    }

    #[must_use]
    pub const fn means(&self) -> &FeatureVector {
        &self.means
    }

    #[must_use]
    pub const fn scales(&self) -> &FeatureVector {
        &self.scales
    }
}
