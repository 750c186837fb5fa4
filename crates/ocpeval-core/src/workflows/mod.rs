//! # Workflows Module
//!
//! Top-level entry points that drive an [`Evaluator`](crate::engine::evaluator::Evaluator)
//! over a whole dataset.
//!
//! - **Evaluation Workflow** ([`evaluate`]) - Ordered evaluation of batch pairs with an
//!   abort-or-skip policy for failing batches, progress events, and table merging for
//!   results produced by independent workers.

pub mod evaluate;
