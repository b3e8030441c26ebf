//! Deadline computation and rule-set resolution.

pub mod conflict;
pub mod deadline_engine;
pub mod engine;
pub mod holiday_calendar;
pub mod jurisdiction_graph;
pub mod selection;

pub use engine::DeadlineEngine;
