//! Feature Matrix Validator

use crate::error::ValidationError;
use crate::matrix::FeatureMatrix;
use tracing::warn;

/// Checks a feature matrix against a model's declared inputs
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// Declared feature count, if the model reports one
    expected_features: Option<usize>,
    /// Declared feature names in model column order
    expected_names: Option<Vec<String>>,
}

impl Validator {
    /// Create a validator for the given model metadata
    pub fn new(expected_features: Option<usize>, expected_names: Option<Vec<String>>) -> Self {
        Self {
            expected_features,
            expected_names,
        }
    }

    /// Declared feature count
    pub fn expected_features(&self) -> Option<usize> {
        self.expected_features
    }

    /// Validate a matrix before it reaches the model.
    ///
    /// A column count mismatch is an error. A keyed payload whose sorted names
    /// differ from the model's declared names is only logged, since the model
    /// still receives the right number of columns.
    pub fn validate(&self, matrix: &FeatureMatrix) -> Result<(), ValidationError> {
        self.check_feature_count(matrix)?;

        if let (Some(expected), Some(actual)) = (&self.expected_names, matrix.feature_names()) {
            if expected.as_slice() != actual {
                warn!(
                    "Keyed input columns {:?} do not match model feature order {:?}",
                    actual, expected
                );
            }
        }

        Ok(())
    }

    /// Reject a matrix whose width differs from the declared feature count
    pub fn check_feature_count(&self, matrix: &FeatureMatrix) -> Result<(), ValidationError> {
        match self.expected_features {
            Some(expected) if expected != matrix.ncols() => Err(ValidationError::FeatureCountMismatch {
                expected,
                actual: matrix.ncols(),
            }),
            _ => Ok(()),
        }
    }
}
