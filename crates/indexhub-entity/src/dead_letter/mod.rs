//! Dead-letter entities.

pub mod model;

pub use model::DeadLetter;
