pub mod geometry;
pub mod stress;
