//! # Engine Module
//!
//! The evaluation engine: everything needed to turn a prediction/target batch pair into
//! accumulated metric records.
//!
//! ## Architecture
//!
//! - **Metric Functions** ([`metrics`]) - Reductions returning a `MetricRecord` per batch
//! - **Registry** ([`registry`]) - Metric names, lookup, and the naming rule for result keys
//! - **Tasks** ([`task`]) - Built-in tasks with default metric sets and primary metrics
//! - **Configuration** ([`config`]) - TOML evaluator settings resolved into a metric spec
//! - **Accumulation** ([`record`]) - Running weighted means keyed by metric name
//! - **Evaluation** ([`evaluator`]) - The stateless `Evaluator` and its atomic update
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Failures raised while evaluating a batch
//!
//! ## Key Capabilities
//!
//! - **Streaming accumulation** where merging per-batch sums equals evaluating the union
//! - **Periodic-aware distances** for relaxed-structure metrics
//! - **Name-addressable metrics** so evaluator sets can be declared in configuration files

pub mod config;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod progress;
pub mod record;
pub mod registry;
pub mod task;
