//! # Core Module
//!
//! Data structures and numerical building blocks shared by the evaluation engine.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Named tensors grouped into batches, and the property vocabulary
//! - **Normalization** ([`normalizer`]) - Per-channel standardization with persisted state
//! - **Numerics** ([`utils`]) - Periodic displacement under a unit cell and stress reconstruction

pub mod models;
pub mod normalizer;
pub mod utils;
