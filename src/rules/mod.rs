//! Safety classification: rule definitions, duplicate resolution, and the
//! deletability verdict engine.

pub mod duplicates;
pub mod engine;
pub mod rule;
