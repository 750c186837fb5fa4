pub mod eval;
pub mod normalizer;
