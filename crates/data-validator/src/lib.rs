//! Payload Normalization and Validation
//!
//! Turns the JSON request shapes accepted by the prediction endpoint into a
//! uniform feature matrix and checks it against the model's declared inputs.

mod error;
mod matrix;
mod normalizer;
mod validator;

pub use error::ValidationError;
pub use matrix::FeatureMatrix;
pub use normalizer::{detect_shape, normalize, PayloadShape};
pub use validator::Validator;
