//! # OCP Eval Core Library
//!
//! Streaming evaluation of atomistic property predictions against reference targets, together
//! with the per-channel normalization used when training the predicting models.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that each concern can be tested in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Batch`, `Property`), periodic geometry
//!   (`min_diff`), stress reconstruction, and the `Normalizer` with its persisted state.
//!
//! - **[`engine`]: The Logic Core.** Metric functions, the name registry, task definitions, and the
//!   `Evaluator` that turns batch pairs into accumulated `MetricsTable` records.
//!
//! - **[`workflows`]: The Public API.** Drives an evaluator over a sequence of batch pairs with a
//!   policy for failing batches and progress reporting.
//!
//! ```
//! use ocpeval::core::models::{batch::Batch, property::Property};
//! use ocpeval::engine::{evaluator::Evaluator, record::MetricsTable, task::Task};
//!
//! let evaluator = Evaluator::for_task(Task::Is2re);
//! let prediction = Batch::new().with_column(Property::Energy, &[1.0, 2.0]);
//! let target = Batch::new().with_column(Property::Energy, &[1.5, 2.0]);
//!
//! let metrics = evaluator.eval(&prediction, &target, MetricsTable::new()).unwrap();
//! assert_eq!(metrics.metric("energy_mae"), Some(0.25));
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
