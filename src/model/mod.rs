//! The model: one owned memory exposed as a classifier and a generator.

pub mod classifier;
pub mod generator;
pub mod hashed_ml;
