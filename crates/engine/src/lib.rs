pub mod config;

// Deadline engine
pub mod compliance;

pub use compliance::DeadlineEngine;
