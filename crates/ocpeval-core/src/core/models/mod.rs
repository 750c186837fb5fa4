//! # Core Models Module
//!
//! The data a metric function reads.
//!
//! - [`property`] - The closed set of property names a batch may carry
//! - [`batch`] - A mapping from property to row-major tensor, plus decoders for the
//!   per-structure layout tensors (`natoms`, `cell`, `pbc`)
//!
//! Per-structure properties have one row per structure, per-atom properties one row per atom,
//! with structures laid out contiguously in the order given by `natoms`.

pub mod batch;
pub mod property;
