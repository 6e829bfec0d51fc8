//! Feature state carried between recursive forecast steps.

/// Next-day feature derivation.
pub mod updater;
pub mod vector;
/// Circular buffer of recent daily loads.
pub mod window;

pub use updater::FeatureUpdater;
pub use vector::{FeatureSchema, FeatureVector};
pub use window::{LAG_WINDOW_DAYS, LoadWindow};
