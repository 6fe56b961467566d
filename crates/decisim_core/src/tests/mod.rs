//! Scenario tests for the simulation engine
//!
//! Tests are organized by topic:
//! - `reproducibility` - Seeded runs, evaluation order and parallel evaluation
//! - `degenerate` - Zero-spread assumptions and zero-trial runs
//! - `scenarios` - Worked decision scenarios end to end
//! - `correlation` - Copula sampling and matrix rejection
//! - `properties` - Property-based checks on statistics and sensitivity

mod correlation;
mod properties;
