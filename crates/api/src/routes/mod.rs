//! Route Handlers

pub mod metrics;
pub mod model_info;
pub mod predictions;
