//! Data preprocessing module
//!
//! Feature standardization with statistics that can be carried from the
//! training side of a split to the test side.

mod scaler;

pub use scaler::{standardize, ScalerStats, ScalingPolicy, StandardScaler};
