//! File formats: feature tables in, forecast trajectories out.

pub mod export;
pub mod table;
